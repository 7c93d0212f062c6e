//! Day-level stages: day of month and day of week.
//!
//! Both stages ascend when the current window holds no matching day,
//! since a month can lack a 30th or a fifth Monday. Negative day-of-
//! month entries and ordinal weekday entries resolve against the
//! candidate's window before anything is compared.

use cadenza_core::{days_in_month, Instant, Unit, Weekday};
use chrono::{Datelike, NaiveDate};

use crate::{
    error::{RecurError, RecurResult},
    pipeline::{Pipeline, StageOutcome},
    rule::options::Frequency,
};

pub(crate) fn evaluate_day_of_month(
    pipeline: &Pipeline<'_>,
    candidate: &Instant,
) -> RecurResult<StageOutcome> {
    let entries = &pipeline.options().by_day_of_month;
    if entries.is_empty() {
        return Ok(StageOutcome::Valid);
    }

    let fields = candidate.fields();
    let days = resolve_month_days(entries, fields.year, fields.month);
    if days.is_empty() {
        return Ok(StageOutcome::RejectAscend(Unit::Month));
    }
    if days.binary_search(&fields.day).is_ok() {
        return Ok(StageOutcome::Valid);
    }

    if pipeline.direction().is_forward() {
        match days.iter().find(|&&day| day > fields.day) {
            Some(&next) => {
                let moved = candidate
                    .add(Unit::Day, i64::from(next) - i64::from(fields.day))?
                    .start_of(Unit::Day)?;
                Ok(StageOutcome::Repair(moved))
            }
            None => Ok(StageOutcome::RejectAscend(Unit::Month)),
        }
    } else {
        match days.iter().rev().find(|&&day| day < fields.day) {
            Some(&previous) => {
                let moved = candidate
                    .subtract(Unit::Day, i64::from(fields.day) - i64::from(previous))?
                    .end_of(Unit::Day)?;
                Ok(StageOutcome::Repair(moved))
            }
            None => Ok(StageOutcome::RejectAscend(Unit::Month)),
        }
    }
}

/// Resolves signed day-of-month entries against a concrete month.
/// Entries that do not exist in the month (a 30th in February, a -31
/// in April) drop out.
fn resolve_month_days(entries: &[i8], year: i32, month: u32) -> Vec<u32> {
    let len = days_in_month(year, month);
    let mut days: Vec<u32> = entries
        .iter()
        .filter_map(|&entry| {
            let day = if entry > 0 {
                u32::try_from(entry).ok()?
            } else {
                let back = u32::try_from(-i32::from(entry)).ok()?;
                (len + 1).checked_sub(back)?
            };
            (1..=len).contains(&day).then_some(day)
        })
        .collect();
    days.sort_unstable();
    days.dedup();
    days
}

pub(crate) fn evaluate_day_of_week(
    pipeline: &Pipeline<'_>,
    candidate: &Instant,
) -> RecurResult<StageOutcome> {
    let entries = &pipeline.options().by_day_of_week;
    if entries.is_empty() {
        return Ok(StageOutcome::Valid);
    }

    let options = pipeline.options();
    // Ordinal entries count occurrences within the month when the rule
    // is month scoped, within the year otherwise.
    let month_scoped =
        options.frequency() == Frequency::Monthly || !options.by_month_of_year.is_empty();
    let window_unit = if month_scoped { Unit::Month } else { Unit::Year };

    let fields = candidate.fields();
    let candidate_date = naive_date(fields.year, fields.month, fields.day)?;
    let weekday = candidate.weekday();

    let plain: Vec<Weekday> = entries
        .iter()
        .filter(|entry| entry.ordinal.is_none())
        .map(|entry| entry.weekday)
        .collect();
    if plain.contains(&weekday) {
        return Ok(StageOutcome::Valid);
    }

    let mut ordinal_dates: Vec<NaiveDate> = entries
        .iter()
        .filter_map(|entry| {
            let ordinal = entry.ordinal?;
            resolve_ordinal(entry.weekday, ordinal, fields.year, fields.month, month_scoped)
        })
        .collect();
    ordinal_dates.sort_unstable();
    ordinal_dates.dedup();
    if ordinal_dates.binary_search(&candidate_date).is_ok() {
        return Ok(StageOutcome::Valid);
    }

    if pipeline.direction().is_forward() {
        // Nearest plain weekday, strictly after the candidate.
        let next_plain = plain
            .iter()
            .map(|&w| i64::from((w.index() + 7 - weekday.index()) % 7))
            .map(|days| if days == 0 { 7 } else { days })
            .min();
        let next_ordinal = ordinal_dates
            .iter()
            .find(|&&date| date > candidate_date)
            .map(|date| date.signed_duration_since(candidate_date).num_days());

        match min_option(next_plain, next_ordinal) {
            Some(days) => Ok(StageOutcome::Repair(
                candidate.add(Unit::Day, days)?.start_of(Unit::Day)?,
            )),
            None => Ok(StageOutcome::RejectAscend(window_unit)),
        }
    } else {
        let previous_plain = plain
            .iter()
            .map(|&w| i64::from((weekday.index() + 7 - w.index()) % 7))
            .map(|days| if days == 0 { 7 } else { days })
            .min();
        let previous_ordinal = ordinal_dates
            .iter()
            .rev()
            .find(|&&date| date < candidate_date)
            .map(|date| candidate_date.signed_duration_since(*date).num_days());

        match min_option(previous_plain, previous_ordinal) {
            Some(days) => Ok(StageOutcome::Repair(
                candidate.subtract(Unit::Day, days)?.end_of(Unit::Day)?,
            )),
            None => Ok(StageOutcome::RejectAscend(window_unit)),
        }
    }
}

fn min_option(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    }
}

/// Resolves an ordinal weekday entry to the concrete date it names in
/// the candidate's window, if that occurrence exists.
fn resolve_ordinal(
    weekday: Weekday,
    ordinal: i8,
    year: i32,
    month: u32,
    month_scoped: bool,
) -> Option<NaiveDate> {
    let (window_start, window_end) = if month_scoped {
        (
            NaiveDate::from_ymd_opt(year, month, 1)?,
            NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?,
        )
    } else {
        (
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        )
    };

    let target = chrono_weekday(weekday);
    let date = if ordinal > 0 {
        let offset =
            i64::from((target.num_days_from_sunday() + 7 - window_start.weekday().num_days_from_sunday()) % 7);
        let first = window_start + chrono::TimeDelta::days(offset);
        first + chrono::TimeDelta::days(7 * (i64::from(ordinal) - 1))
    } else {
        let offset =
            i64::from((window_end.weekday().num_days_from_sunday() + 7 - target.num_days_from_sunday()) % 7);
        let last = window_end - chrono::TimeDelta::days(offset);
        last - chrono::TimeDelta::days(7 * (i64::from(-ordinal) - 1))
    };

    (date >= window_start && date <= window_end).then_some(date)
}

const fn chrono_weekday(weekday: Weekday) -> chrono::Weekday {
    match weekday {
        Weekday::Sunday => chrono::Weekday::Sun,
        Weekday::Monday => chrono::Weekday::Mon,
        Weekday::Tuesday => chrono::Weekday::Tue,
        Weekday::Wednesday => chrono::Weekday::Wed,
        Weekday::Thursday => chrono::Weekday::Thu,
        Weekday::Friday => chrono::Weekday::Fri,
        Weekday::Saturday => chrono::Weekday::Sat,
    }
}

fn naive_date(year: i32, month: u32, day: u32) -> RecurResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        RecurError::InvalidOptions(format!("invalid date {year:04}-{month:02}-{day:02}"))
    })
}
