//! Next-wake computation

use hal_abstractions::UtcInstant;

use crate::datetime::WallClock;

/// Furthest ahead an alarm may be armed
///
/// Alarm 1 matches day of month, so its pattern repeats after as little as
/// 28 days (February); anything at or beyond that could fire a month early.
pub const MAX_ALARM_HORIZON_SECS: u32 = 27 * 86_400;

/// Alarm 1 match fields (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmSpec {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    /// Day of month
    pub day: u8,
}

impl AlarmSpec {
    /// Alarm firing at `time`
    ///
    /// The match ignores month and year, so `time` must be less than a
    /// month away.
    pub fn from_wall_clock(time: &WallClock) -> Self {
        Self {
            second: time.second,
            minute: time.minute,
            hour: time.hour,
            day: time.day,
        }
    }

    pub fn at(instant: UtcInstant) -> Self {
        Self::from_wall_clock(&WallClock::from_instant(instant))
    }

    pub fn is_valid(&self) -> bool {
        self.second <= 59 && self.minute <= 59 && self.hour <= 23 && (1..=31).contains(&self.day)
    }
}

/// When the device should wake next
///
/// The earlier of `now + fallback_secs` and the first upcoming event, but
/// never sooner than `now + min_lead_secs` so the alarm cannot be missed
/// while the device is still going to sleep. Both intervals are capped at
/// [`MAX_ALARM_HORIZON_SECS`].
pub fn next_wake(
    now: UtcInstant,
    fallback_secs: u32,
    min_lead_secs: u32,
    upcoming: Option<UtcInstant>,
) -> UtcInstant {
    if fallback_secs > MAX_ALARM_HORIZON_SECS {
        warn!(
            "Fallback interval {} s exceeds alarm horizon, using {} s",
            fallback_secs, MAX_ALARM_HORIZON_SECS
        );
    }
    let fallback = now.saturating_add_secs(fallback_secs.min(MAX_ALARM_HORIZON_SECS) as i64);
    let earliest = now.saturating_add_secs(min_lead_secs.min(MAX_ALARM_HORIZON_SECS) as i64);

    let wake = match upcoming {
        Some(start) if start > now => start.min(fallback),
        _ => fallback,
    };
    wake.max(earliest)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2029-12-31 23:59:30 UTC
    const NOW: UtcInstant = UtcInstant::from_unix_secs(1_893_455_970);

    #[test]
    fn test_fallback_without_events() {
        assert_eq!(next_wake(NOW, 60, 5, None).unix_secs(), 1_893_456_030);
    }

    #[test]
    fn test_sooner_event_wins() {
        let event = NOW.saturating_add_secs(20);
        assert_eq!(next_wake(NOW, 60, 5, Some(event)), event);
    }

    #[test]
    fn test_later_event_falls_back() {
        let event = UtcInstant::from_unix_secs(1_893_488_400);
        assert_eq!(next_wake(NOW, 60, 5, Some(event)).unix_secs(), 1_893_456_030);
    }

    #[test]
    fn test_minimum_lead_is_enforced() {
        let event = NOW.saturating_add_secs(1);
        assert_eq!(next_wake(NOW, 60, 5, Some(event)), NOW.saturating_add_secs(5));
        let past = NOW.saturating_add_secs(-100);
        assert_eq!(next_wake(NOW, 60, 5, Some(past)).unix_secs(), 1_893_456_030);
    }

    #[test]
    fn test_long_fallback_is_capped_below_a_month() {
        // 2030-01-05 00:00:00 UTC, fallback of 40 days
        let now = UtcInstant::from_unix_secs(1_893_801_600);
        let wake = next_wake(now, 40 * 86_400, 5, None);
        assert_eq!(now.secs_until(wake), MAX_ALARM_HORIZON_SECS as i64);

        // 2030-02-01: the day-of-month match cannot recur before then
        let spec = AlarmSpec::at(wake);
        assert_eq!((spec.day, spec.hour, spec.minute, spec.second), (1, 0, 0, 0));
        assert_eq!(WallClock::from_instant(wake).month, 2);

        // A distant event does not extend the horizon either
        let event = now.saturating_add_secs(60 * 86_400);
        assert_eq!(next_wake(now, 40 * 86_400, 5, Some(event)), wake);
    }

    #[test]
    fn test_alarm_spec_crosses_year_boundary() {
        let spec = AlarmSpec::at(next_wake(NOW, 60, 5, None));
        // 2030-01-01 00:00:30
        assert_eq!(
            spec,
            AlarmSpec {
                second: 30,
                minute: 0,
                hour: 0,
                day: 1,
            }
        );
        assert!(spec.is_valid());
    }
}
