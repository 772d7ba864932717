//! Wake-cycle configuration

use hal_abstractions::UtcInstant;

use crate::datetime::UtcOffset;

/// Maximum number of future events retained per fetch
pub const MAX_EVENTS: usize = 50;

/// Maximum event summary length in bytes
pub const MAX_SUMMARY_LEN: usize = 100;

/// Maximum calendar line length in bytes, excluding the terminator
pub const MAX_LINE_LEN: usize = 256;

/// Offset applied to DTSTART values without a `Z` marker (China Standard Time)
pub const LOCAL_UTC_OFFSET: UtcOffset = UtcOffset::from_hours(8);

/// Wake-cycle configuration
#[derive(Debug, Clone)]
pub struct WakeConfig {
    /// Calendar resource, fetched over a secure transport
    pub calendar_url: &'static str,
    /// Offset for floating local times in the calendar
    pub local_offset: UtcOffset,
    /// Longest sleep when no event is due sooner, capped at 27 days
    pub fallback_interval_secs: u32,
    /// Shortest distance between "now" and the armed alarm
    pub min_alarm_lead_secs: u32,
    /// Bound on network join
    pub join_timeout_ms: u32,
    /// Bound on waiting for time sync
    pub sync_timeout_ms: u32,
    /// Interval between polls of the time-sync notification
    pub sync_poll_interval_ms: u32,
    /// Bound on the whole calendar fetch
    pub fetch_timeout_ms: u32,
    /// Minimum time spent in `Error` before retrying, capped at ten minutes
    pub error_backoff_ms: u32,
    /// Consecutive failed passes before giving up until the next wake
    pub max_consecutive_failures: u8,
    /// Time written to the RTC on cold boot, before sync
    pub cold_boot_time: UtcInstant,
    /// Number of upcoming events logged after each fetch
    pub upcoming_log_count: usize,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            calendar_url: "",
            local_offset: LOCAL_UTC_OFFSET,
            fallback_interval_secs: 60,
            min_alarm_lead_secs: 5,
            join_timeout_ms: 30_000,
            sync_timeout_ms: 30_000,
            sync_poll_interval_ms: 1_000,
            fetch_timeout_ms: 60_000,
            error_backoff_ms: 10_000,
            max_consecutive_failures: 3,
            // 2025-07-05 12:00:00 UTC
            cold_boot_time: UtcInstant::from_unix_secs(1_751_716_800),
            upcoming_log_count: 10,
        }
    }
}

impl WakeConfig {
    /// Default configuration fetching `calendar_url`
    pub fn with_url(calendar_url: &'static str) -> Self {
        Self {
            calendar_url,
            ..Self::default()
        }
    }
}
