//! Interval alignment stage.
//!
//! Counts how many frequency periods separate the candidate from the
//! rule's start and rejects candidates whose period index is not a
//! multiple of the interval, repairing to the nearest aligned period
//! boundary in the traversal direction.

use cadenza_core::{Instant, Unit};
use chrono::NaiveDate;

use crate::{
    error::{RecurError, RecurResult},
    pipeline::{Pipeline, StageOutcome},
    rule::options::Frequency,
};

pub(crate) fn evaluate(pipeline: &Pipeline<'_>, candidate: &Instant) -> RecurResult<StageOutcome> {
    let options = pipeline.options();
    let interval = i64::from(options.interval());
    let periods = periods_between(options.start(), candidate, options.frequency(), pipeline)?;
    let remainder = periods.rem_euclid(interval);
    if remainder == 0 {
        return Ok(StageOutcome::Valid);
    }

    let unit = options.frequency().unit();
    let period_start = if unit == Unit::Week {
        candidate.start_of_week(options.week_start())?
    } else {
        candidate.start_of(unit)?
    };

    let repaired = if pipeline.direction().is_forward() {
        // Start of the next aligned period.
        period_start.add(unit, interval - remainder)?
    } else {
        // Last millisecond of the previous aligned period.
        period_start
            .subtract(unit, remainder)?
            .add(unit, 1)?
            .subtract(Unit::Millisecond, 1)?
    };
    Ok(StageOutcome::Repair(repaired))
}

/// Signed number of whole frequency periods from the start's period to
/// the candidate's period. Calendar units count calendar boundaries;
/// clock units count truncated timestamp differences.
fn periods_between(
    start: &Instant,
    candidate: &Instant,
    frequency: Frequency,
    pipeline: &Pipeline<'_>,
) -> RecurResult<i64> {
    let s = start.fields();
    let c = candidate.fields();
    Ok(match frequency {
        Frequency::Yearly => i64::from(c.year) - i64::from(s.year),
        Frequency::Monthly => {
            (i64::from(c.year) * 12 + i64::from(c.month))
                - (i64::from(s.year) * 12 + i64::from(s.month))
        }
        Frequency::Weekly => {
            let week_start = pipeline.options().week_start();
            let start_week = start.start_of_week(week_start)?;
            let candidate_week = candidate.start_of_week(week_start)?;
            days_between(&start_week, &candidate_week)? / 7
        }
        Frequency::Daily => days_between(start, candidate)?,
        Frequency::Hourly => truncated_diff(start, candidate, Unit::Hour)?,
        Frequency::Minutely => truncated_diff(start, candidate, Unit::Minute)?,
        Frequency::Secondly => truncated_diff(start, candidate, Unit::Second)?,
    })
}

fn days_between(start: &Instant, candidate: &Instant) -> RecurResult<i64> {
    let s = start.fields();
    let c = candidate.fields();
    let start_date = NaiveDate::from_ymd_opt(s.year, s.month, s.day)
        .ok_or_else(|| RecurError::InvalidOptions(format!("invalid date {s:?}")))?;
    let candidate_date = NaiveDate::from_ymd_opt(c.year, c.month, c.day)
        .ok_or_else(|| RecurError::InvalidOptions(format!("invalid date {c:?}")))?;
    Ok(candidate_date.signed_duration_since(start_date).num_days())
}

fn truncated_diff(start: &Instant, candidate: &Instant, unit: Unit) -> RecurResult<i64> {
    let millis = match unit {
        Unit::Hour => 3_600_000,
        Unit::Minute => 60_000,
        _ => 1_000,
    };
    let start_floor = start.start_of(unit)?.timestamp_ms();
    let candidate_floor = candidate.start_of(unit)?.timestamp_ms();
    Ok((candidate_floor - start_floor) / millis)
}
