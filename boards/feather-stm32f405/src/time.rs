#![deny(unsafe_code)]
#![deny(warnings)]
//! Wall-clock time for the awake period
//!
//! The DS3231 keeps time across standby; while awake, UTC is derived from the
//! TIM2 monotonic (1 MHz) anchored at the last `set`.

use defmt::Format;
use hal_abstractions::{UtcClock, UtcInstant};
use rtic_monotonics::Monotonic;

use crate::Mono;

/// NTP epoch offset (1900-01-01 to 1970-01-01 in seconds)
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

const TICKS_PER_SEC: u64 = 1_000_000;

/// Timestamp with microsecond precision
#[derive(Debug, Clone, Copy, Format)]
pub struct Timestamp {
    /// Unix timestamp in seconds since epoch (1970-01-01 00:00:00 UTC)
    pub unix_secs: u64,
    /// Microseconds component (0-999,999)
    pub micros: u32,
}

impl Timestamp {
    pub const fn new(unix_secs: u64, micros: u32) -> Self {
        Self { unix_secs, micros }
    }

    /// Convert from NTP timestamp (seconds since 1900-01-01)
    pub fn from_ntp(ntp_secs: u64, ntp_frac: u32) -> Self {
        let unix_secs = ntp_secs.saturating_sub(NTP_UNIX_OFFSET);
        // NTP fraction is in units of 2^-32 seconds
        let micros = ((ntp_frac as u64 * 1_000_000) >> 32) as u32;
        Self::new(unix_secs, micros)
    }

    /// Add a correction, carrying into seconds
    pub fn add_micros(self, micros: u64) -> Self {
        let total = self.micros as u64 + micros;
        Self::new(
            self.unix_secs.saturating_add(total / 1_000_000),
            (total % 1_000_000) as u32,
        )
    }

    /// Whole seconds, rounding the sub-second part to nearest
    pub fn to_instant(self) -> UtcInstant {
        let secs = self.unix_secs + u64::from(self.micros >= 500_000);
        UtcInstant::from_unix_secs(secs.min(i64::MAX as u64) as i64)
    }
}

/// UTC clock backed by the RTIC monotonic
pub struct MonoClock {
    anchor: UtcInstant,
    anchor_ticks: u64,
}

impl MonoClock {
    /// Clock that reads `UtcInstant::UNIX_EPOCH` until the first `set`
    pub fn new() -> Self {
        Self {
            anchor: UtcInstant::UNIX_EPOCH,
            anchor_ticks: Mono::now().ticks(),
        }
    }
}

impl Default for MonoClock {
    fn default() -> Self {
        Self::new()
    }
}

impl UtcClock for MonoClock {
    fn now(&self) -> UtcInstant {
        let elapsed = Mono::now().ticks().saturating_sub(self.anchor_ticks) / TICKS_PER_SEC;
        self.anchor.saturating_add_secs(elapsed as i64)
    }

    fn set(&mut self, now: UtcInstant) {
        self.anchor = now;
        self.anchor_ticks = Mono::now().ticks();
        defmt::debug!("Wall clock anchored at {} (mono={})", now.unix_secs(), self.anchor_ticks);
    }
}
