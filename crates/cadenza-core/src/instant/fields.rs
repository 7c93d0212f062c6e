//! Calendar field derivation and timestamp resolution.

use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};

use crate::error::{CoreError, CoreResult};
use crate::zone::Zone;

/// The calendar fields of an instant, as seen through its zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarFields {
    pub year: i32,
    /// 1-12.
    pub month: u32,
    /// 1-31.
    pub day: u32,
    /// 0-23.
    pub hour: u32,
    /// 0-59.
    pub minute: u32,
    /// 0-59.
    pub second: u32,
    /// 0-999.
    pub millisecond: u32,
}

/// Leap year per the Gregorian rule: divisible by 400, or divisible by
/// 4 and not by 100.
#[must_use]
pub const fn is_leap_year(year: i32) -> bool {
    year % 400 == 0 || (year % 4 == 0 && year % 100 != 0)
}

/// Number of days in a month. Callers pass a validated month (1-12).
#[must_use]
pub const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Derives the calendar fields of a timestamp through a zone.
///
/// The timestamp range is validated at `Instant` construction, so the
/// out-of-range branch never fires in practice.
pub(crate) fn fields_of(timestamp_ms: i64, zone: Zone) -> CalendarFields {
    let naive = match zone {
        Zone::Utc | Zone::Floating => {
            DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map(|dt| dt.naive_utc())
        }
        Zone::Named(tz) => tz
            .timestamp_millis_opt(timestamp_ms)
            .single()
            .map(|dt| dt.naive_local()),
    }
    .unwrap_or_default();

    CalendarFields {
        year: naive.year(),
        month: naive.month(),
        day: naive.day(),
        hour: naive.hour(),
        minute: naive.minute(),
        second: naive.second(),
        millisecond: (naive.nanosecond() / 1_000_000).min(999),
    }
}

/// ## Summary
/// Resolves calendar fields to an epoch timestamp through a zone.
///
/// For named zones a DST fold resolves to the earlier instant
/// (RFC 5545 §3.3.5 uses the occurrence before the shift); a DST gap
/// is an invalid date.
///
/// ## Errors
///
/// Returns `CoreError::InvalidDate` if the fields do not name a real
/// date-time in the zone.
pub(crate) fn timestamp_of(fields: &CalendarFields, zone: Zone) -> CoreResult<i64> {
    let date = NaiveDate::from_ymd_opt(fields.year, fields.month, fields.day).ok_or_else(|| {
        CoreError::InvalidDate(format!(
            "{:04}-{:02}-{:02}",
            fields.year, fields.month, fields.day
        ))
    })?;
    let time = NaiveTime::from_hms_milli_opt(
        fields.hour,
        fields.minute,
        fields.second,
        fields.millisecond,
    )
    .ok_or_else(|| {
        CoreError::InvalidDate(format!(
            "{:02}:{:02}:{:02}.{:03}",
            fields.hour, fields.minute, fields.second, fields.millisecond
        ))
    })?;
    let naive = NaiveDateTime::new(date, time);

    match zone {
        Zone::Utc | Zone::Floating => Ok(naive.and_utc().timestamp_millis()),
        Zone::Named(tz) => match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt.timestamp_millis()),
            // DST fold: the time occurs twice; use the first occurrence.
            LocalResult::Ambiguous(first, _second) => Ok(first.timestamp_millis()),
            // DST gap: the local time does not exist.
            LocalResult::None => Err(CoreError::InvalidDate(format!(
                "{naive} does not exist in {tz}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    #[test]
    fn test_leap_year_rule() {
        assert!(is_leap_year(2000)); // divisible by 400
        assert!(!is_leap_year(1900)); // divisible by 100, not 400
        assert!(is_leap_year(2016));
        assert!(!is_leap_year(2019));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2019, 1), 31);
        assert_eq!(days_in_month(2019, 2), 28);
        assert_eq!(days_in_month(2016, 2), 29);
        assert_eq!(days_in_month(2019, 4), 30);
    }

    #[test]
    fn test_round_trip_utc() {
        let fields = CalendarFields {
            year: 2019,
            month: 1,
            day: 1,
            hour: 2,
            minute: 3,
            second: 4,
            millisecond: 5,
        };
        let ts = timestamp_of(&fields, Zone::Utc).expect("valid fields");
        assert_eq!(fields_of(ts, Zone::Utc), fields);
    }

    #[test]
    fn test_invalid_date_rejected() {
        let fields = CalendarFields {
            year: 2019,
            month: 2,
            day: 30,
            hour: 0,
            minute: 0,
            second: 0,
            millisecond: 0,
        };
        assert!(timestamp_of(&fields, Zone::Utc).is_err());
    }

    #[test]
    fn test_dst_gap_is_invalid() {
        // 2026-03-08 02:30 does not exist in New York (spring forward).
        let fields = CalendarFields {
            year: 2026,
            month: 3,
            day: 8,
            hour: 2,
            minute: 30,
            second: 0,
            millisecond: 0,
        };
        let result = timestamp_of(&fields, Zone::Named(Tz::America__New_York));
        assert!(matches!(result, Err(CoreError::InvalidDate(_))));
    }

    #[test]
    fn test_dst_fold_uses_earlier_instant() {
        // 2026-11-01 01:30 occurs twice in New York; the earlier (EDT,
        // UTC-4) instant wins.
        let fields = CalendarFields {
            year: 2026,
            month: 11,
            day: 1,
            hour: 1,
            minute: 30,
            second: 0,
            millisecond: 0,
        };
        let ts = timestamp_of(&fields, Zone::Named(Tz::America__New_York)).expect("ambiguous ok");
        let utc = timestamp_of(
            &CalendarFields {
                year: 2026,
                month: 11,
                day: 1,
                hour: 5,
                minute: 30,
                second: 0,
                millisecond: 0,
            },
            Zone::Utc,
        )
        .expect("valid");
        assert_eq!(ts, utc);
    }
}
