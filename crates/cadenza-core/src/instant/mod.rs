//! The immutable, timezone-aware point in time with optional duration.

pub mod record;

mod fields;

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate, TimeDelta};

use crate::error::{CoreError, CoreResult};
use crate::unit::{Unit, Weekday};
use crate::zone::Zone;

pub use fields::{CalendarFields, days_in_month, is_leap_year};

/// Sort key for instants: timestamp first, then duration, so a
/// zero-duration instant orders before a longer interval starting at
/// the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderingKey {
    pub timestamp_ms: i64,
    pub duration_ms: i64,
}

/// An immutable, timezone-aware point in time with an optional
/// non-negative duration.
///
/// Every transformation returns a new instant. Instants with different
/// zone labels refuse comparison rather than silently coercing; see
/// [`Instant::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instant {
    timestamp_ms: i64,
    zone: Zone,
    duration_ms: i64,
}

impl Instant {
    /// ## Summary
    /// Creates an instant from epoch milliseconds with zero duration.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::InvalidDate` if the timestamp is outside the
    /// representable calendar range.
    pub fn from_timestamp(timestamp_ms: i64, zone: Zone) -> CoreResult<Self> {
        if chrono::DateTime::from_timestamp_millis(timestamp_ms).is_none() {
            return Err(CoreError::InvalidDate(format!(
                "timestamp {timestamp_ms} ms out of range"
            )));
        }
        Ok(Self {
            timestamp_ms,
            zone,
            duration_ms: 0,
        })
    }

    /// ## Summary
    /// Creates an instant from calendar fields interpreted in `zone`,
    /// with zero duration.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::InvalidDate` if the fields do not name a
    /// real date-time in the zone (including DST gaps for named zones).
    pub fn from_fields(fields: CalendarFields, zone: Zone) -> CoreResult<Self> {
        let timestamp_ms = fields::timestamp_of(&fields, zone)?;
        Ok(Self {
            timestamp_ms,
            zone,
            duration_ms: 0,
        })
    }

    /// Convenience constructor for UTC instants.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::InvalidDate` for impossible dates.
    #[expect(clippy::too_many_arguments)]
    pub fn utc(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        millisecond: u32,
    ) -> CoreResult<Self> {
        Self::from_fields(
            CalendarFields {
                year,
                month,
                day,
                hour,
                minute,
                second,
                millisecond,
            },
            Zone::Utc,
        )
    }

    /// Epoch milliseconds of the start of this instant.
    #[must_use]
    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// The zone label.
    #[must_use]
    pub const fn zone(&self) -> Zone {
        self.zone
    }

    /// Duration in milliseconds; 0 means no duration.
    #[must_use]
    pub const fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    /// End of the occupied interval, or `None` when duration is 0.
    #[must_use]
    pub const fn end_timestamp_ms(&self) -> Option<i64> {
        if self.duration_ms > 0 {
            Some(self.timestamp_ms + self.duration_ms)
        } else {
            None
        }
    }

    /// Calendar fields as seen through the zone.
    #[must_use]
    pub fn fields(&self) -> CalendarFields {
        fields::fields_of(self.timestamp_ms, self.zone)
    }

    /// The day of the week.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        let f = self.fields();
        NaiveDate::from_ymd_opt(f.year, f.month, f.day)
            .map(|d| Weekday::from_chrono(d.weekday()))
            .unwrap_or(Weekday::Monday)
    }

    /// The operator sort key: (timestamp, duration).
    #[must_use]
    pub const fn ordering_key(&self) -> OrderingKey {
        OrderingKey {
            timestamp_ms: self.timestamp_ms,
            duration_ms: self.duration_ms,
        }
    }

    /// ## Summary
    /// Compares two instants by ordering key.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::ZoneMismatch` when the zone labels differ;
    /// mixing timezone contexts is a caller bug, never coerced.
    pub fn compare(&self, other: &Self) -> CoreResult<Ordering> {
        if self.zone != other.zone {
            return Err(CoreError::ZoneMismatch {
                left: self.zone,
                right: other.zone,
            });
        }
        Ok(self.ordering_key().cmp(&other.ordering_key()))
    }

    /// Whether this instant orders before `other`.
    ///
    /// ## Errors
    /// See [`Instant::compare`].
    pub fn is_before(&self, other: &Self) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    /// Whether this instant orders after `other`.
    ///
    /// ## Errors
    /// See [`Instant::compare`].
    pub fn is_after(&self, other: &Self) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    /// Whether the ordering keys are equal.
    ///
    /// ## Errors
    /// See [`Instant::compare`].
    pub fn same_instant(&self, other: &Self) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Equal)
    }

    /// Returns a copy carrying the given duration.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::InvalidDuration` for negative values.
    pub fn with_duration(&self, duration_ms: i64) -> CoreResult<Self> {
        if duration_ms < 0 {
            return Err(CoreError::InvalidDuration(duration_ms));
        }
        Ok(Self {
            duration_ms,
            ..*self
        })
    }

    /// ## Summary
    /// Adds `amount` of `unit`, returning a new instant.
    ///
    /// Hour and finer units are absolute-time arithmetic; day, week,
    /// month and year are nominal calendar arithmetic that keeps the
    /// local clock time. Month and year arithmetic clamps a day
    /// overflow to the target month's last day (Jan 31 + 1 month =
    /// Feb 28/29).
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::InvalidDate` on range overflow or when the
    /// result lands on a nonexistent local time.
    pub fn add(&self, unit: Unit, amount: i64) -> CoreResult<Self> {
        match unit {
            Unit::Millisecond | Unit::Second | Unit::Minute | Unit::Hour => {
                let step = amount
                    .checked_mul(unit_millis(unit))
                    .and_then(|delta| self.timestamp_ms.checked_add(delta))
                    .ok_or_else(|| {
                        CoreError::InvalidDate(format!("{amount} x {unit:?} overflows"))
                    })?;
                self.with_timestamp(step)
            }
            Unit::Day | Unit::Week => {
                let days = if unit == Unit::Week {
                    amount.checked_mul(7).ok_or_else(|| {
                        CoreError::InvalidDate(format!("{amount} weeks overflows"))
                    })?
                } else {
                    amount
                };
                let f = self.fields();
                let date = NaiveDate::from_ymd_opt(f.year, f.month, f.day)
                    .and_then(|d| d.checked_add_signed(TimeDelta::days(days)))
                    .ok_or_else(|| CoreError::InvalidDate(format!("{days} days overflows")))?;
                self.rebuild(CalendarFields {
                    year: date.year(),
                    month: date.month(),
                    day: date.day(),
                    ..f
                })
            }
            Unit::Month => {
                let f = self.fields();
                let months = i64::from(f.year) * 12 + i64::from(f.month) - 1 + amount;
                let year = i32::try_from(months.div_euclid(12))
                    .map_err(|_e| CoreError::InvalidDate(format!("{amount} months overflows")))?;
                let month = u32::try_from(months.rem_euclid(12) + 1)
                    .map_err(|_e| CoreError::InvalidDate(format!("{amount} months overflows")))?;
                let day = f.day.min(days_in_month(year, month));
                self.rebuild(CalendarFields {
                    year,
                    month,
                    day,
                    ..f
                })
            }
            Unit::Year => {
                let months = amount
                    .checked_mul(12)
                    .ok_or_else(|| CoreError::InvalidDate(format!("{amount} years overflows")))?;
                self.add(Unit::Month, months)
            }
        }
    }

    /// Subtracts `amount` of `unit`; see [`Instant::add`].
    ///
    /// ## Errors
    /// See [`Instant::add`].
    pub fn subtract(&self, unit: Unit, amount: i64) -> CoreResult<Self> {
        let negated = amount
            .checked_neg()
            .ok_or_else(|| CoreError::InvalidDate(format!("-{amount} overflows")))?;
        self.add(unit, negated)
    }

    /// ## Summary
    /// Replaces one calendar field, returning a new instant.
    ///
    /// Setting the month clamps a day overflow to the new month's last
    /// day rather than rolling into the following month.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::InvalidDate` for out-of-range values, for
    /// `Unit::Week` (weeks are not a settable field), and for days past
    /// the end of the current month.
    pub fn set(&self, unit: Unit, value: i64) -> CoreResult<Self> {
        let mut f = self.fields();
        match unit {
            Unit::Year => {
                f.year = i32::try_from(value)
                    .map_err(|_e| CoreError::InvalidDate(format!("year {value}")))?;
                f.day = f.day.min(days_in_month(f.year, f.month));
            }
            Unit::Month => {
                f.month = in_range(value, 1, 12)
                    .ok_or_else(|| CoreError::InvalidDate(format!("month {value}")))?;
                f.day = f.day.min(days_in_month(f.year, f.month));
            }
            Unit::Week => {
                return Err(CoreError::InvalidDate("week is not a settable field".into()));
            }
            Unit::Day => {
                f.day = in_range(value, 1, i64::from(days_in_month(f.year, f.month)))
                    .ok_or_else(|| CoreError::InvalidDate(format!("day {value}")))?;
            }
            Unit::Hour => {
                f.hour = in_range(value, 0, 23)
                    .ok_or_else(|| CoreError::InvalidDate(format!("hour {value}")))?;
            }
            Unit::Minute => {
                f.minute = in_range(value, 0, 59)
                    .ok_or_else(|| CoreError::InvalidDate(format!("minute {value}")))?;
            }
            Unit::Second => {
                f.second = in_range(value, 0, 59)
                    .ok_or_else(|| CoreError::InvalidDate(format!("second {value}")))?;
            }
            Unit::Millisecond => {
                f.millisecond = in_range(value, 0, 999)
                    .ok_or_else(|| CoreError::InvalidDate(format!("millisecond {value}")))?;
            }
        }
        self.rebuild(f)
    }

    /// ## Summary
    /// Truncates to the start of the `unit` window.
    ///
    /// `Unit::Week` truncates to a Monday-anchored week; use
    /// [`Instant::start_of_week`] for an explicit week start.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::InvalidDate` if the truncated local time
    /// does not exist in the zone.
    pub fn start_of(&self, unit: Unit) -> CoreResult<Self> {
        let f = self.fields();
        let truncated = match unit {
            Unit::Year => CalendarFields {
                month: 1,
                day: 1,
                hour: 0,
                minute: 0,
                second: 0,
                millisecond: 0,
                ..f
            },
            Unit::Month => CalendarFields {
                day: 1,
                hour: 0,
                minute: 0,
                second: 0,
                millisecond: 0,
                ..f
            },
            Unit::Week => return self.start_of_week(Weekday::Monday),
            Unit::Day => CalendarFields {
                hour: 0,
                minute: 0,
                second: 0,
                millisecond: 0,
                ..f
            },
            Unit::Hour => CalendarFields {
                minute: 0,
                second: 0,
                millisecond: 0,
                ..f
            },
            Unit::Minute => CalendarFields {
                second: 0,
                millisecond: 0,
                ..f
            },
            Unit::Second => CalendarFields {
                millisecond: 0,
                ..f
            },
            Unit::Millisecond => return Ok(*self),
        };
        self.rebuild(truncated)
    }

    /// Truncates to the start of the week anchored at `week_start`.
    ///
    /// ## Errors
    /// See [`Instant::start_of`].
    pub fn start_of_week(&self, week_start: Weekday) -> CoreResult<Self> {
        let back = self.weekday().days_from(week_start);
        self.start_of(Unit::Day)?.subtract(Unit::Day, i64::from(back))
    }

    /// Last millisecond of the `unit` window containing this instant.
    ///
    /// ## Errors
    /// See [`Instant::start_of`].
    pub fn end_of(&self, unit: Unit) -> CoreResult<Self> {
        self.start_of(unit)?
            .add(unit, 1)?
            .subtract(Unit::Millisecond, 1)
    }

    /// Same zone and duration, new timestamp.
    pub(crate) fn with_timestamp(&self, timestamp_ms: i64) -> CoreResult<Self> {
        if chrono::DateTime::from_timestamp_millis(timestamp_ms).is_none() {
            return Err(CoreError::InvalidDate(format!(
                "timestamp {timestamp_ms} ms out of range"
            )));
        }
        Ok(Self {
            timestamp_ms,
            ..*self
        })
    }

    /// Same zone and duration, new calendar fields.
    fn rebuild(&self, fields: CalendarFields) -> CoreResult<Self> {
        let timestamp_ms = fields::timestamp_of(&fields, self.zone)?;
        Ok(Self {
            timestamp_ms,
            ..*self
        })
    }
}

const fn unit_millis(unit: Unit) -> i64 {
    match unit {
        Unit::Millisecond => 1,
        Unit::Second => 1_000,
        Unit::Minute => 60_000,
        Unit::Hour => 3_600_000,
        // Day and coarser use calendar arithmetic, not fixed spans.
        _ => 0,
    }
}

/// Validates a field value against an inclusive range.
fn in_range(value: i64, min: i64, max: i64) -> Option<u32> {
    if (min..=max).contains(&value) {
        u32::try_from(value).ok()
    } else {
        None
    }
}
