//! Streaming iCalendar ingestion
//!
//! Body chunks flow through the [`LineAssembler`] into the
//! [`EventExtractor`], which offers completed future events to the
//! [`EventStore`]. Nothing here knows about the transport.

pub mod extract;
pub mod line;

use hal_abstractions::{ChunkSink, UtcClock, UtcInstant};

use crate::config::{MAX_EVENTS, MAX_LINE_LEN};
use crate::datetime::UtcOffset;
use crate::store::EventStore;

pub use extract::{EventExtractor, ExtractStats};
pub use line::LineAssembler;

/// Line buffer, draft and store for one calendar
#[derive(Debug)]
pub struct CalendarIngest<const L: usize = MAX_LINE_LEN, const N: usize = MAX_EVENTS> {
    lines: LineAssembler<L>,
    extractor: EventExtractor,
    store: EventStore<N>,
}

impl<const L: usize, const N: usize> CalendarIngest<L, N> {
    pub const fn new(offset: UtcOffset) -> Self {
        Self {
            lines: LineAssembler::new(),
            extractor: EventExtractor::new(offset),
            store: EventStore::new(),
        }
    }

    /// Clear all state left by the previous fetch
    pub fn begin_fetch(&mut self) {
        self.lines.reset();
        self.extractor.reset();
        self.store.begin_fetch();
    }

    /// Consume a body chunk; `now` filters out past events
    pub fn feed(&mut self, chunk: &[u8], now: UtcInstant) {
        let Self {
            lines,
            extractor,
            store,
        } = self;
        lines.feed(chunk, |line| extractor.process_line(line, now, store));
    }

    /// End of a successful stream: flush the last line and sort the store
    pub fn finish(&mut self, now: UtcInstant) {
        let Self {
            lines,
            extractor,
            store,
        } = self;
        lines.finish(|line| extractor.process_line(line, now, store));
        if extractor.in_event() {
            warn!("Stream ended inside a VEVENT");
        }
        store.finalize();

        let stats = extractor.stats();
        info!(
            "Parsed {} events: {} stored, {} past, {} invalid, {} over capacity, {} long lines",
            stats.seen,
            stats.stored,
            stats.past,
            stats.invalid_start,
            stats.dropped_capacity,
            lines.overflowed_lines()
        );
    }

    pub fn store(&self) -> &EventStore<N> {
        &self.store
    }

    pub fn stats(&self) -> ExtractStats {
        self.extractor.stats()
    }

    /// Chunk sink timestamping each chunk with `clock`
    pub fn sink<'a, C: UtcClock>(&'a mut self, clock: &'a C) -> IngestSink<'a, L, N, C> {
        IngestSink {
            ingest: self,
            clock,
        }
    }
}

/// [`ChunkSink`] adapter handed to the transport during a fetch
pub struct IngestSink<'a, const L: usize, const N: usize, C> {
    ingest: &'a mut CalendarIngest<L, N>,
    clock: &'a C,
}

impl<const L: usize, const N: usize, C: UtcClock> ChunkSink for IngestSink<'_, L, N, C> {
    fn on_chunk(&mut self, chunk: &[u8]) {
        self.ingest.feed(chunk, self.clock.now());
    }
}
