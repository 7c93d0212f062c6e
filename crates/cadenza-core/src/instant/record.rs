//! The calendar-field JSON form exchanged with temporal backends.

use serde::{Deserialize, Serialize};

use super::{CalendarFields, Instant};
use crate::error::CoreResult;
use crate::zone::Zone;

/// Wire form of an [`Instant`]:
/// `{ timezone, year, month, day, hour, minute, second, millisecond, duration? }`.
///
/// `timezone` is `"UTC"`, an IANA name, or `null` for floating.
/// `duration` is omitted when the instant has none. Round-tripping
/// through this record is bit-exact for in-range values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantRecord {
    pub timezone: Option<String>,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub millisecond: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl Instant {
    /// Converts to the wire record.
    #[must_use]
    pub fn to_record(&self) -> InstantRecord {
        let f = self.fields();
        InstantRecord {
            timezone: self.zone().label().map(str::to_owned),
            year: f.year,
            month: f.month,
            day: f.day,
            hour: f.hour,
            minute: f.minute,
            second: f.second,
            millisecond: f.millisecond,
            duration: (self.duration_ms() > 0).then_some(self.duration_ms()),
        }
    }

    /// ## Summary
    /// Builds an instant from the wire record.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::UnknownZone` for an unresolvable timezone
    /// label, `CoreError::InvalidDate` for impossible field
    /// combinations, and `CoreError::InvalidDuration` for a negative
    /// duration.
    pub fn from_record(record: &InstantRecord) -> CoreResult<Self> {
        let zone = Zone::resolve(record.timezone.as_deref())?;
        let instant = Self::from_fields(
            CalendarFields {
                year: record.year,
                month: record.month,
                day: record.day,
                hour: record.hour,
                minute: record.minute,
                second: record.second,
                millisecond: record.millisecond,
            },
            zone,
        )?;
        match record.duration {
            Some(duration) => instant.with_duration(duration),
            None => Ok(instant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let instant = Instant::utc(2019, 1, 1, 2, 3, 4, 5)
            .and_then(|i| i.with_duration(90_000))
            .expect("valid instant");

        let json = serde_json::to_string(&instant.to_record()).expect("should serialize");
        let record: InstantRecord = serde_json::from_str(&json).expect("should deserialize");
        let back = Instant::from_record(&record).expect("should rebuild");

        assert_eq!(back, instant);
    }

    #[test]
    fn test_duration_omitted_when_zero() {
        let instant = Instant::utc(2019, 1, 1, 0, 0, 0, 0).expect("valid instant");
        let json = serde_json::to_value(instant.to_record()).expect("should serialize");
        assert!(json.get("duration").is_none());
        assert_eq!(json["timezone"], "UTC");
    }

    #[test]
    fn test_floating_timezone_is_null() {
        let instant = Instant::from_fields(
            Instant::utc(2019, 6, 1, 12, 0, 0, 0).expect("valid instant").fields(),
            Zone::Floating,
        )
        .expect("valid instant");
        let json = serde_json::to_value(instant.to_record()).expect("should serialize");
        assert!(json["timezone"].is_null());

        let record: InstantRecord =
            serde_json::from_value(json).expect("should deserialize");
        assert_eq!(
            Instant::from_record(&record).expect("should rebuild").zone(),
            Zone::Floating
        );
    }

    #[test]
    fn test_unknown_zone_rejected() {
        let record = InstantRecord {
            timezone: Some("Nowhere/Else".to_string()),
            year: 2019,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            millisecond: 0,
            duration: None,
        };
        assert!(Instant::from_record(&record).is_err());
    }
}
