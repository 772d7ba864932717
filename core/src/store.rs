//! Bounded, time-ordered store of future events

use hal_abstractions::UtcInstant;
use heapless::Vec;

use crate::config::MAX_EVENTS;
use crate::error::CapacityExceeded;
use crate::event::CalendarEvent;

/// Fixed-capacity event store, refilled on every fetch
///
/// Events are kept in arrival order until [`EventStore::finalize`], which
/// orders them by start time. Events with equal starts keep arrival order.
#[derive(Debug, Clone)]
pub struct EventStore<const N: usize = MAX_EVENTS> {
    events: Vec<CalendarEvent, N>,
    overflowed: usize,
}

impl<const N: usize> Default for EventStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventStore<N> {
    pub const fn new() -> Self {
        Self {
            events: Vec::new(),
            overflowed: 0,
        }
    }

    /// Discard everything from the previous fetch
    pub fn begin_fetch(&mut self) {
        self.events.clear();
        self.overflowed = 0;
    }

    /// Append `event` if there is room
    pub fn try_insert(&mut self, event: CalendarEvent) -> Result<(), CapacityExceeded> {
        self.events.push(event).map_err(|_| {
            self.overflowed += 1;
            CapacityExceeded
        })
    }

    /// Sort by start time
    pub fn finalize(&mut self) {
        // Insertion sort: stable, in place, and N is small
        for i in 1..self.events.len() {
            let mut j = i;
            while j > 0 && self.events[j - 1].start() > self.events[j].start() {
                self.events.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    /// Events in store order (ascending after `finalize`)
    pub fn snapshot(&self) -> &[CalendarEvent] {
        &self.events
    }

    /// Earliest event starting strictly after `now`
    pub fn next_after(&self, now: UtcInstant) -> Option<&CalendarEvent> {
        self.events
            .iter()
            .filter(|event| event.start() > now)
            .min_by_key(|event| event.start())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Events rejected for capacity since the last `begin_fetch`
    pub fn overflowed(&self) -> usize {
        self.overflowed
    }
}
