//! VEVENT extraction from assembled lines

use hal_abstractions::UtcInstant;

use crate::datetime::{normalize, UtcOffset};
use crate::event::{summary_from_bytes, CalendarEvent, Summary};
use crate::store::EventStore;

const BEGIN_EVENT: &[u8] = b"BEGIN:VEVENT";
const END_EVENT: &[u8] = b"END:VEVENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ExtractState {
    OutsideEvent,
    InsideEvent,
}

/// DTSTART as seen so far in the current VEVENT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftStart {
    Unset,
    Invalid,
    At(UtcInstant),
}

#[derive(Debug)]
struct ParseDraft {
    start: DraftStart,
    summary: Summary,
}

impl ParseDraft {
    const fn new() -> Self {
        Self {
            start: DraftStart::Unset,
            summary: Summary::new(),
        }
    }
}

/// Per-fetch extraction counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtractStats {
    /// Completed VEVENT blocks
    pub seen: usize,
    pub stored: usize,
    /// Start at or before the current time
    pub past: usize,
    /// Missing or malformed DTSTART
    pub invalid_start: usize,
    pub dropped_capacity: usize,
}

/// Line-driven VEVENT state machine
#[derive(Debug)]
pub struct EventExtractor {
    state: ExtractState,
    draft: ParseDraft,
    offset: UtcOffset,
    stats: ExtractStats,
}

impl EventExtractor {
    /// Extractor resolving floating times at `offset`
    pub const fn new(offset: UtcOffset) -> Self {
        Self {
            state: ExtractState::OutsideEvent,
            draft: ParseDraft::new(),
            offset,
            stats: ExtractStats {
                seen: 0,
                stored: 0,
                past: 0,
                invalid_start: 0,
                dropped_capacity: 0,
            },
        }
    }

    /// Return to `OutsideEvent` and zero the counters
    pub fn reset(&mut self) {
        self.state = ExtractState::OutsideEvent;
        self.draft = ParseDraft::new();
        self.stats = ExtractStats::default();
    }

    pub fn stats(&self) -> ExtractStats {
        self.stats
    }

    /// Whether a VEVENT is currently open
    pub fn in_event(&self) -> bool {
        self.state == ExtractState::InsideEvent
    }

    /// Process one complete line; completed future events go to `store`
    pub fn process_line<const N: usize>(
        &mut self,
        line: &[u8],
        now: UtcInstant,
        store: &mut EventStore<N>,
    ) {
        let marker = line.trim_ascii_end();
        if marker.eq_ignore_ascii_case(BEGIN_EVENT) {
            if self.in_event() {
                debug!("BEGIN:VEVENT inside an open event, restarting draft");
            }
            self.state = ExtractState::InsideEvent;
            self.draft = ParseDraft::new();
            return;
        }

        if !self.in_event() {
            return;
        }

        if marker.eq_ignore_ascii_case(END_EVENT) {
            self.state = ExtractState::OutsideEvent;
            self.complete(now, store);
            return;
        }

        let name_end = line
            .iter()
            .position(|&b| b == b':' || b == b';')
            .unwrap_or(line.len());
        let name = &line[..name_end];
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return;
        };
        let value = &line[colon + 1..];

        if name.eq_ignore_ascii_case(b"SUMMARY") {
            self.draft.summary = summary_from_bytes(value);
        } else if name.eq_ignore_ascii_case(b"DTSTART") {
            self.draft.start = match core::str::from_utf8(value)
                .ok()
                .map(|raw| normalize(raw, self.offset))
            {
                Some(Ok(start)) => DraftStart::At(start),
                _ => {
                    warn!("Unparseable DTSTART value");
                    DraftStart::Invalid
                }
            };
        }
    }

    fn complete<const N: usize>(&mut self, now: UtcInstant, store: &mut EventStore<N>) {
        self.stats.seen += 1;
        let draft = core::mem::replace(&mut self.draft, ParseDraft::new());

        let start = match draft.start {
            DraftStart::At(start) => start,
            DraftStart::Unset | DraftStart::Invalid => {
                self.stats.invalid_start += 1;
                return;
            }
        };
        if start <= now {
            trace!("Skipping past event at {}", start.unix_secs());
            self.stats.past += 1;
            return;
        }

        match store.try_insert(CalendarEvent::new(start, draft.summary)) {
            Ok(()) => self.stats.stored += 1,
            Err(_) => {
                warn!("Event store full ({}), dropping event", N);
                self.stats.dropped_capacity += 1;
            }
        }
    }
}
