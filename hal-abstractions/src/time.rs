//! Wall-clock time primitives and the time-sync contract

/// Absolute point in time, in seconds since 1970-01-01 00:00:00 UTC
///
/// Signed so that arithmetic on suspect calendar input can never wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcInstant(i64);

impl UtcInstant {
    /// 1970-01-01 00:00:00 UTC
    pub const UNIX_EPOCH: Self = Self(0);

    /// Create an instant from Unix seconds
    pub const fn from_unix_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Seconds since the Unix epoch
    pub const fn unix_secs(self) -> i64 {
        self.0
    }

    /// Offset this instant by `secs` seconds, saturating at the `i64` bounds
    pub const fn saturating_add_secs(self, secs: i64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds from `self` until `later` (negative if `later` is earlier)
    pub const fn secs_until(self, later: Self) -> i64 {
        later.0.saturating_sub(self.0)
    }
}

/// Source of the current UTC time while the device is awake
///
/// Boards usually back this with a monotonic timer calibrated at the last
/// successful time sync.
pub trait UtcClock {
    /// Current UTC time
    fn now(&self) -> UtcInstant;

    /// Calibrate the clock so that `now()` returns `now` at this moment
    fn set(&mut self, now: UtcInstant);
}

/// Network time synchronization (SNTP or similar)
///
/// The service runs in the background after [`TimeSync::start`] and
/// publishes its result through a one-shot notification that the caller
/// polls. A notification is consumed by the poll that returns it.
pub trait TimeSync {
    /// Begin a synchronization attempt in the background
    fn start(&mut self);

    /// Take the synchronized time, if the background attempt has finished
    fn poll_synced(&mut self) -> Option<UtcInstant>;

    /// Tear down the background attempt and its notification
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_ordering_and_offsets() {
        let a = UtcInstant::from_unix_secs(1_893_488_400);
        let b = a.saturating_add_secs(60);
        assert!(b > a);
        assert_eq!(a.secs_until(b), 60);
        assert_eq!(b.secs_until(a), -60);
        assert_eq!(UtcInstant::UNIX_EPOCH.unix_secs(), 0);
    }

    #[test]
    fn test_saturating_add_does_not_wrap() {
        let max = UtcInstant::from_unix_secs(i64::MAX);
        assert_eq!(max.saturating_add_secs(1), max);
    }
}
