//! Hardware abstraction traits for the calendar firmware
//!
//! This crate defines the narrow contracts between the wake-cycle core and
//! the board support code. BSPs implement these traits; the core is generic
//! over them so it can be exercised on the host with fakes.
//!
//! The RTC bus and delays are not abstracted here: the core uses the
//! `embedded-hal-async` `I2c` and `DelayNs` traits directly.

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod indicator;
pub mod network;
pub mod power;
pub mod time;

pub use indicator::StatusIndicator;
pub use network::{CalendarTransport, ChunkSink, NetworkJoin};
pub use power::{PowerControl, WakeCause};
pub use time::{TimeSync, UtcClock, UtcInstant};
