//! Recurrence rule options: the raw form, its validation, and the
//! normalized form the constraint pipeline evaluates against.

use std::fmt;

use cadenza_core::{Instant, Unit, Weekday};

use crate::error::{RecurError, RecurResult};

/// Recurrence frequency, one per calendar granularity down to seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    Minutely,
    Secondly,
}

impl Frequency {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yearly => "YEARLY",
            Self::Monthly => "MONTHLY",
            Self::Weekly => "WEEKLY",
            Self::Daily => "DAILY",
            Self::Hourly => "HOURLY",
            Self::Minutely => "MINUTELY",
            Self::Secondly => "SECONDLY",
        }
    }

    /// Parses a frequency from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "YEARLY" => Self::Yearly,
            "MONTHLY" => Self::Monthly,
            "WEEKLY" => Self::Weekly,
            "DAILY" => Self::Daily,
            "HOURLY" => Self::Hourly,
            "MINUTELY" => Self::Minutely,
            "SECONDLY" => Self::Secondly,
            _ => return None,
        })
    }

    /// The calendar granularity one interval step spans.
    #[must_use]
    pub const fn unit(self) -> Unit {
        match self {
            Self::Yearly => Unit::Year,
            Self::Monthly => Unit::Month,
            Self::Weekly => Unit::Week,
            Self::Daily => Unit::Day,
            Self::Hourly => Unit::Hour,
            Self::Minutely => Unit::Minute,
            Self::Secondly => Unit::Second,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weekday with optional occurrence number.
///
/// Examples: `MO` (every Monday), `3MO` (third Monday of the window),
/// `-1FR` (last Friday of the window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    /// The day of the week.
    pub weekday: Weekday,
    /// Optional occurrence number (-53 to 53, excluding 0).
    pub ordinal: Option<i8>,
}

impl WeekdayNum {
    /// Creates a weekday constraint without an ordinal.
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            weekday,
            ordinal: None,
        }
    }

    /// Creates a weekday constraint with an ordinal.
    ///
    /// ## Panics
    ///
    /// Panics if ordinal is 0 or outside the range -53..=53.
    #[must_use]
    pub fn nth(ordinal: i8, weekday: Weekday) -> Self {
        assert!(ordinal != 0 && (-53..=53).contains(&ordinal));
        Self {
            weekday,
            ordinal: Some(ordinal),
        }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

/// Raw recurrence rule options, as a parser or caller assembles them.
///
/// Nothing here is trusted: [`RuleOptions::validate`] is the only way
/// to obtain a [`NormalizedOptions`] the engine will evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOptions {
    /// First candidate instant; also the source of implicit constraints.
    pub start: Instant,
    /// Recurrence frequency (required).
    pub frequency: Frequency,
    /// Recurrence interval (default: 1).
    pub interval: Option<u32>,
    /// Inclusive end bound (mutually exclusive with count).
    pub until: Option<Instant>,
    /// Number of occurrences (mutually exclusive with until).
    pub count: Option<u32>,
    /// Week start day (default: Monday).
    pub week_start: Option<Weekday>,
    /// Month-of-year list (1-12).
    pub by_month_of_year: Vec<u32>,
    /// Day-of-month list (-31 to 31, excluding 0; negatives count from
    /// the end of the month).
    pub by_day_of_month: Vec<i8>,
    /// Day-of-week list with optional ordinals.
    pub by_day_of_week: Vec<WeekdayNum>,
    /// Hour list (0-23).
    pub by_hour_of_day: Vec<u32>,
    /// Minute list (0-59).
    pub by_minute_of_hour: Vec<u32>,
    /// Second list (0-59).
    pub by_second_of_minute: Vec<u32>,
    /// Millisecond list (0-999).
    pub by_millisecond_of_second: Vec<u32>,
}

impl RuleOptions {
    /// Creates options with only the required fields set.
    #[must_use]
    pub fn new(start: Instant, frequency: Frequency) -> Self {
        Self {
            start,
            frequency,
            interval: None,
            until: None,
            count: None,
            week_start: None,
            by_month_of_year: Vec::new(),
            by_day_of_month: Vec::new(),
            by_day_of_week: Vec::new(),
            by_hour_of_day: Vec::new(),
            by_minute_of_hour: Vec::new(),
            by_second_of_minute: Vec::new(),
            by_millisecond_of_second: Vec::new(),
        }
    }

    /// Sets the interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Sets the count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self.until = None; // Mutually exclusive
        self
    }

    /// Sets the until bound.
    #[must_use]
    pub fn with_until(mut self, until: Instant) -> Self {
        self.until = Some(until);
        self.count = None; // Mutually exclusive
        self
    }

    /// Sets the week start day.
    #[must_use]
    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = Some(week_start);
        self
    }

    /// Sets the month-of-year list.
    #[must_use]
    pub fn with_by_month_of_year(mut self, months: Vec<u32>) -> Self {
        self.by_month_of_year = months;
        self
    }

    /// Sets the day-of-month list.
    #[must_use]
    pub fn with_by_day_of_month(mut self, days: Vec<i8>) -> Self {
        self.by_day_of_month = days;
        self
    }

    /// Sets the day-of-week list.
    #[must_use]
    pub fn with_by_day_of_week(mut self, days: Vec<WeekdayNum>) -> Self {
        self.by_day_of_week = days;
        self
    }

    /// Sets the hour list.
    #[must_use]
    pub fn with_by_hour_of_day(mut self, hours: Vec<u32>) -> Self {
        self.by_hour_of_day = hours;
        self
    }

    /// Sets the minute list.
    #[must_use]
    pub fn with_by_minute_of_hour(mut self, minutes: Vec<u32>) -> Self {
        self.by_minute_of_hour = minutes;
        self
    }

    /// Sets the second list.
    #[must_use]
    pub fn with_by_second_of_minute(mut self, seconds: Vec<u32>) -> Self {
        self.by_second_of_minute = seconds;
        self
    }

    /// Sets the millisecond list.
    #[must_use]
    pub fn with_by_millisecond_of_second(mut self, milliseconds: Vec<u32>) -> Self {
        self.by_millisecond_of_second = milliseconds;
        self
    }

    /// ## Summary
    /// Validates and normalizes the options.
    ///
    /// Validation covers value ranges, the count/until exclusivity, the
    /// WEEKLY/by-day-of-month conflict, and the MONTHLY/YEARLY-only
    /// rule for ordinal weekdays. Normalization sorts every constraint
    /// list and fills the implicit constraints from the start instant
    /// (the start's hour becomes an hour constraint for a DAILY rule,
    /// and so on), so the pipeline never needs a default branch at
    /// evaluation time.
    ///
    /// ## Errors
    ///
    /// Returns `RecurError::InvalidOptions` describing the first
    /// violation found. Never raised later than construction.
    #[expect(clippy::too_many_lines)]
    pub fn validate(self) -> RecurResult<NormalizedOptions> {
        let interval = self.interval.unwrap_or(1);
        if interval == 0 {
            return Err(RecurError::InvalidOptions(
                "interval must be a positive integer".to_string(),
            ));
        }

        if self.count.is_some() && self.until.is_some() {
            return Err(RecurError::InvalidOptions(
                "count and until are mutually exclusive".to_string(),
            ));
        }

        if let Some(until) = &self.until
            && until.zone() != self.start.zone()
        {
            return Err(RecurError::InvalidOptions(format!(
                "until zone {} does not match start zone {}",
                until.zone(),
                self.start.zone()
            )));
        }

        for &month in &self.by_month_of_year {
            if !(1..=12).contains(&month) {
                return Err(RecurError::InvalidOptions(format!(
                    "byMonthOfYear value {month} out of range 1-12"
                )));
            }
        }

        if !self.by_day_of_month.is_empty() && self.frequency == Frequency::Weekly {
            return Err(RecurError::InvalidOptions(
                "byDayOfMonth cannot be used with WEEKLY frequency".to_string(),
            ));
        }
        for &day in &self.by_day_of_month {
            if day == 0 || !(-31..=31).contains(&day) {
                return Err(RecurError::InvalidOptions(format!(
                    "byDayOfMonth value {day} out of range (-31 to 31, non-zero)"
                )));
            }
        }

        for entry in &self.by_day_of_week {
            if let Some(ordinal) = entry.ordinal {
                if ordinal == 0 || !(-53..=53).contains(&ordinal) {
                    return Err(RecurError::InvalidOptions(format!(
                        "byDayOfWeek ordinal {ordinal} out of range (-53 to 53, non-zero)"
                    )));
                }
                if !matches!(self.frequency, Frequency::Monthly | Frequency::Yearly) {
                    return Err(RecurError::InvalidOptions(
                        "ordinal byDayOfWeek entries require MONTHLY or YEARLY frequency"
                            .to_string(),
                    ));
                }
            }
        }

        check_range(&self.by_hour_of_day, 23, "byHourOfDay")?;
        check_range(&self.by_minute_of_hour, 59, "byMinuteOfHour")?;
        check_range(&self.by_second_of_minute, 59, "bySecondOfMinute")?;
        check_range(&self.by_millisecond_of_second, 999, "byMillisecondOfSecond")?;

        let week_start = self.week_start.unwrap_or(Weekday::Monday);
        let start_fields = self.start.fields();
        let frequency_unit = self.frequency.unit();

        // Implicit constraints from the start instant. A yearly rule
        // with an explicit day-level constraint expands across the
        // whole year, so the month default only applies when no day
        // constraint is present.
        let day_constrained =
            !self.by_day_of_month.is_empty() || !self.by_day_of_week.is_empty();

        let mut by_month_of_year = sorted(self.by_month_of_year);
        if by_month_of_year.is_empty() && self.frequency == Frequency::Yearly && !day_constrained {
            by_month_of_year = vec![start_fields.month];
        }

        let mut by_day_of_month = self.by_day_of_month;
        if !day_constrained && matches!(self.frequency, Frequency::Yearly | Frequency::Monthly) {
            let day = i8::try_from(start_fields.day).map_err(|_e| {
                RecurError::InvalidOptions(format!("start day {} out of range", start_fields.day))
            })?;
            by_day_of_month = vec![day];
        }
        by_day_of_month.sort_unstable();
        by_day_of_month.dedup();

        let mut by_day_of_week = self.by_day_of_week;
        if by_day_of_week.is_empty() && self.frequency == Frequency::Weekly {
            by_day_of_week = vec![WeekdayNum::every(self.start.weekday())];
        }
        by_day_of_week.sort_by_key(|entry| {
            (
                entry.ordinal.is_some(),
                entry.weekday.days_from(week_start),
                entry.ordinal,
            )
        });
        by_day_of_week.dedup();

        let mut by_hour_of_day = sorted(self.by_hour_of_day);
        if by_hour_of_day.is_empty() && frequency_unit.is_coarser_than(Unit::Hour) {
            by_hour_of_day = vec![start_fields.hour];
        }
        let mut by_minute_of_hour = sorted(self.by_minute_of_hour);
        if by_minute_of_hour.is_empty() && frequency_unit.is_coarser_than(Unit::Minute) {
            by_minute_of_hour = vec![start_fields.minute];
        }
        let mut by_second_of_minute = sorted(self.by_second_of_minute);
        if by_second_of_minute.is_empty() && frequency_unit.is_coarser_than(Unit::Second) {
            by_second_of_minute = vec![start_fields.second];
        }
        let mut by_millisecond_of_second = sorted(self.by_millisecond_of_second);
        if by_millisecond_of_second.is_empty() {
            by_millisecond_of_second = vec![start_fields.millisecond];
        }

        Ok(NormalizedOptions {
            start: self.start,
            frequency: self.frequency,
            interval,
            until: self.until,
            count: self.count,
            week_start,
            by_month_of_year,
            by_day_of_month,
            by_day_of_week,
            by_hour_of_day,
            by_minute_of_hour,
            by_second_of_minute,
            by_millisecond_of_second,
        })
    }
}

/// Validated, defaulted recurrence options. Immutable once built; any
/// edit goes back through [`RuleOptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOptions {
    pub(crate) start: Instant,
    pub(crate) frequency: Frequency,
    pub(crate) interval: u32,
    pub(crate) until: Option<Instant>,
    pub(crate) count: Option<u32>,
    pub(crate) week_start: Weekday,
    pub(crate) by_month_of_year: Vec<u32>,
    pub(crate) by_day_of_month: Vec<i8>,
    pub(crate) by_day_of_week: Vec<WeekdayNum>,
    pub(crate) by_hour_of_day: Vec<u32>,
    pub(crate) by_minute_of_hour: Vec<u32>,
    pub(crate) by_second_of_minute: Vec<u32>,
    pub(crate) by_millisecond_of_second: Vec<u32>,
}

impl NormalizedOptions {
    /// The rule's start instant.
    #[must_use]
    pub const fn start(&self) -> &Instant {
        &self.start
    }

    /// The rule's frequency.
    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// The recurrence interval, always >= 1.
    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    /// The inclusive end bound, if any.
    #[must_use]
    pub const fn until(&self) -> Option<&Instant> {
        self.until.as_ref()
    }

    /// The occurrence count limit, if any.
    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        self.count
    }

    /// The week start day.
    #[must_use]
    pub const fn week_start(&self) -> Weekday {
        self.week_start
    }
}

fn sorted(mut values: Vec<u32>) -> Vec<u32> {
    values.sort_unstable();
    values.dedup();
    values
}

fn check_range(values: &[u32], max: u32, name: &str) -> RecurResult<()> {
    for &value in values {
        if value > max {
            return Err(RecurError::InvalidOptions(format!(
                "{name} value {value} out of range 0-{max}"
            )));
        }
    }
    Ok(())
}
