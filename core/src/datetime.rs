//! Calendar date/time conversions and DTSTART normalization
//!
//! Implements Howard Hinnant's `days_from_civil` and `civil_from_days`
//! algorithms (<http://howardhinnant.github.io/date_algorithms.html>) over
//! `i64`, so every input (including suspect out-of-range fields) converts
//! in O(1) without overflow or panics.
//!
//! Local calendar times are converted with a fixed [`UtcOffset`]; there is
//! no timezone database and no process-wide timezone state.

use hal_abstractions::UtcInstant;

use crate::error::ParseError;

const SECONDS_PER_DAY: i64 = 86_400;

/// Years accepted without a "suspect" warning
const SUPPORTED_YEARS: core::ops::RangeInclusive<i64> = 1970..=2099;

/// Fixed offset of local time from UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcOffset(i32);

impl UtcOffset {
    /// UTC itself
    pub const UTC: Self = Self(0);

    /// Offset east of UTC in whole hours (UTC+8 is `from_hours(8)`)
    pub const fn from_hours(hours: i8) -> Self {
        Self(hours as i32 * 3600)
    }

    /// Offset east of UTC in seconds
    pub const fn from_secs(secs: i32) -> Self {
        Self(secs)
    }

    /// Offset east of UTC in seconds
    pub const fn secs(self) -> i32 {
        self.0
    }
}

/// Broken-down UTC calendar time, as held by the RTC registers
///
/// `weekday` runs 1 (Sunday) to 7 (Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WallClock {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl WallClock {
    /// Break `instant` down into UTC calendar fields
    ///
    /// Years outside `0..=65535` are clamped.
    pub fn from_instant(instant: UtcInstant) -> Self {
        let secs = instant.unix_secs();
        let days = secs.div_euclid(SECONDS_PER_DAY);
        let secs_today = secs.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        Self {
            year: year.clamp(0, u16::MAX as i64) as u16,
            month,
            day,
            weekday: weekday_from_days(days),
            hour: (secs_today / 3600) as u8,
            minute: ((secs_today % 3600) / 60) as u8,
            second: (secs_today % 60) as u8,
        }
    }

    /// Convert to an absolute instant; `weekday` is ignored
    pub fn to_instant(&self) -> UtcInstant {
        UtcInstant::from_unix_secs(naive_to_secs(
            self.year as i64,
            self.month as i64,
            self.day as i64,
            self.hour as i64,
            self.minute as i64,
            self.second as i64,
        ))
    }

    /// Whether every field is within its calendar range
    ///
    /// Day 31 is accepted for every month; the RTC does the same.
    pub fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && (1..=7).contains(&self.weekday)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 59
    }
}

/// Check if year is a leap year (Gregorian calendar)
pub fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Convert civil date to days since the Unix epoch
///
/// Month and day are not range-checked: month 13 is January of the next
/// year and day 32 rolls into the following month, like `mktime`.
pub fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    // Fold months into [1, 12] first so the March-based year below is exact
    let year = year + (month - 1).div_euclid(12);
    let month = (month - 1).rem_euclid(12) + 1;

    // Make March month 0 and February month 11 so the leap day ends the year
    let (y, m) = if month <= 2 {
        (year - 1, month + 9)
    } else {
        (year, month - 3)
    };

    let era = y.div_euclid(400);
    let yoe = y - era * 400; // [0, 399]
    let doy = (153 * m + 2) / 5 + day - 1; // [0, 365] for in-range days
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]

    era * 146_097 + doe - 719_468 // 719468 = days from 0000-03-01 to 1970-01-01
}

/// Convert days since the Unix epoch to a civil date `(year, month, day)`
pub fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // [0, 399]
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11], 0 = March
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };

    (year, month, day)
}

/// Day of week for days since the Unix epoch, 1 = Sunday .. 7 = Saturday
fn weekday_from_days(days: i64) -> u8 {
    // 1970-01-01 was a Thursday
    ((days + 4).rem_euclid(7) + 1) as u8
}

fn naive_to_secs(year: i64, month: i64, day: i64, hour: i64, minute: i64, second: i64) -> i64 {
    days_from_civil(year, month, day) * SECONDS_PER_DAY + hour * 3600 + minute * 60 + second
}

/// Parse a DTSTART value into a UTC instant
///
/// Accepted shapes (after trimming whitespace): `YYYYMMDDThhmmssZ` (UTC),
/// `YYYYMMDDThhmmss` (local time at `offset`) and `YYYYMMDD` (local
/// midnight). Fields outside their calendar ranges are logged as suspect and
/// converted arithmetically rather than rejected.
pub fn normalize(raw: &str, offset: UtcOffset) -> Result<UtcInstant, ParseError> {
    let text = raw.trim().as_bytes();

    let (year, month, day) = match text.get(..8) {
        Some(date) => (
            digits(&date[0..4])?,
            digits(&date[4..6])?,
            digits(&date[6..8])?,
        ),
        None => return Err(ParseError::Malformed),
    };

    let (hour, minute, second, is_utc) = match &text[8..] {
        [] => (0, 0, 0, false),
        [b'T', time @ ..] => {
            let is_utc = match time {
                [_, _, _, _, _, _] => false,
                [_, _, _, _, _, _, b'Z'] => true,
                _ => return Err(ParseError::Malformed),
            };
            (
                digits(&time[0..2])?,
                digits(&time[2..4])?,
                digits(&time[4..6])?,
                is_utc,
            )
        }
        _ => return Err(ParseError::Malformed),
    };

    if !SUPPORTED_YEARS.contains(&year)
        || !(1..=12).contains(&month)
        || !(1..=31).contains(&day)
        || hour > 23
        || minute > 59
        || second > 59
    {
        warn!(
            "Suspect date/time components: {}-{}-{} {}:{}:{}",
            year, month, day, hour, minute, second
        );
    }

    let naive = naive_to_secs(year, month, day, hour, minute, second);
    let utc = if is_utc {
        naive
    } else {
        naive - offset.secs() as i64
    };
    Ok(UtcInstant::from_unix_secs(utc))
}

/// Fixed-width run of ASCII digits
fn digits(field: &[u8]) -> Result<i64, ParseError> {
    field.iter().try_fold(0i64, |acc, &b| {
        if b.is_ascii_digit() {
            Ok(acc * 10 + (b - b'0') as i64)
        } else {
            Err(ParseError::Malformed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CST: UtcOffset = UtcOffset::from_hours(8);

    fn secs(raw: &str) -> i64 {
        normalize(raw, CST).map(UtcInstant::unix_secs).unwrap()
    }

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2000)); // Divisible by 400
        assert!(is_leap_year(2024)); // Divisible by 4
        assert!(!is_leap_year(1900)); // Divisible by 100, not 400
        assert!(!is_leap_year(2023)); // Not divisible by 4
        assert!(!is_leap_year(2100)); // Divisible by 100, not 400
    }

    #[test]
    fn test_unix_epoch() {
        let dt = WallClock::from_instant(UtcInstant::UNIX_EPOCH);
        assert_eq!((dt.year, dt.month, dt.day), (1970, 1, 1));
        assert_eq!((dt.hour, dt.minute, dt.second), (0, 0, 0));
        assert_eq!(dt.weekday, 5); // Thursday
    }

    #[test]
    fn test_round_trip_conversion() {
        let test_dates = [
            0i64,       // 1970-01-01 00:00:00
            946684800,  // 2000-01-01 00:00:00
            1709164800, // 2024-02-29 00:00:00
            1751716800, // 2025-07-05 12:00:00
            2147483647, // 2038-01-19 03:14:07 (32-bit Unix time limit)
            4102444799, // 2099-12-31 23:59:59
            -86400,     // 1969-12-31 00:00:00
        ];

        for &unix_secs in &test_dates {
            let instant = UtcInstant::from_unix_secs(unix_secs);
            let dt = WallClock::from_instant(instant);
            assert_eq!(
                dt.to_instant(),
                instant,
                "Round trip failed for timestamp {}",
                unix_secs
            );
        }
    }

    #[test]
    fn test_weekday() {
        // 2025-07-05 was a Saturday, 2030-01-01 is a Tuesday
        assert_eq!(WallClock::from_instant(UtcInstant::from_unix_secs(1751716800)).weekday, 7);
        assert_eq!(WallClock::from_instant(UtcInstant::from_unix_secs(1893488400)).weekday, 3);
    }

    #[test]
    fn test_utc_marked_value() {
        assert_eq!(secs("20300101T090000Z"), 1893488400);
    }

    #[test]
    fn test_local_value_uses_fixed_offset() {
        // 09:00 at UTC+8 is 01:00 UTC
        assert_eq!(secs("20300101T090000"), 1893459600);
    }

    #[test]
    fn test_date_only_is_local_midnight() {
        assert_eq!(secs("20300101"), 1893427200);
        assert_eq!(
            normalize("20300101", UtcOffset::UTC).map(UtcInstant::unix_secs),
            Ok(1893456000)
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(secs("  20300101T090000Z \t"), 1893488400);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        for raw in [
            "",
            "2030",
            "2030-01-01",
            "20300101T0900",
            "20300101T090000X",
            "20300101T090000Zjunk",
            "2030010AT090000Z",
            "20300101 090000",
            "20300101T09000AZ",
        ] {
            assert_eq!(normalize(raw, CST), Err(ParseError::Malformed), "{raw:?}");
        }
    }

    #[test]
    fn test_out_of_range_fields_pass_through_normalized() {
        // Day 32 of January rolls over to February 1
        assert_eq!(secs("20300132T000000Z"), 1896134400);
        // Month 13 is January of the following year
        assert_eq!(secs("20301301T000000Z"), 1924992000);
    }

    #[test]
    fn test_wall_clock_validity() {
        let mut dt = WallClock::from_instant(UtcInstant::from_unix_secs(1893488400));
        assert!(dt.is_valid());
        dt.hour = 24;
        assert!(!dt.is_valid());
    }
}
