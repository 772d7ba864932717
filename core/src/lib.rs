//! Platform-agnostic calendar ingestion and wake scheduling
//!
//! This crate contains the logic that decides when the device wakes next.
//! It has NO hardware dependencies beyond the `embedded-hal-async` traits
//! and the collaborator contracts in `hal-abstractions`.
//!
//! ## Architecture
//! - **`ics`**: streaming line assembly and VEVENT extraction
//! - **`datetime`**: DTSTART normalization and civil-calendar arithmetic
//! - **`store`**: bounded, sorted set of future events
//! - **`rtc`**: DS3231 register-level driver (BCD, alarm 1, status flags)
//! - **`alarm`**: next-wake computation
//! - **`http`**: URL splitting and HTTP/1.0 response framing
//! - **`cycle`**: the wake-cycle state machine
//!
//! The cycle owns every piece of mutable state (line buffer, draft event,
//! store, RTC bus); nothing is global.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod alarm;
pub mod config;
pub mod cycle;
pub mod datetime;
pub mod error;
pub mod event;
pub mod http;
pub mod ics;
pub mod rtc;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use hal_abstractions::UtcInstant;

pub use alarm::{next_wake, AlarmSpec};
pub use config::WakeConfig;
pub use cycle::{Collaborators, CycleOutcome, WakeCycle, WakeCycleState};
pub use datetime::{normalize, UtcOffset, WallClock};
pub use error::{
    CapacityExceeded, CycleError, HttpError, ParseError, RtcError, SyncError, TransportError,
};
pub use event::CalendarEvent;
pub use ics::CalendarIngest;
pub use rtc::Ds3231;
pub use store::EventStore;
