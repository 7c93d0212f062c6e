//! Month-of-year stage.
//!
//! Repairs directly: there is always a matching month in some year, so
//! this stage never ascends.

use cadenza_core::{Instant, Unit};

use crate::{
    error::RecurResult,
    pipeline::{Pipeline, StageOutcome},
};

pub(crate) fn evaluate(pipeline: &Pipeline<'_>, candidate: &Instant) -> RecurResult<StageOutcome> {
    let months = &pipeline.options().by_month_of_year;
    if months.is_empty() {
        return Ok(StageOutcome::Valid);
    }

    let month = candidate.fields().month;
    if months.binary_search(&month).is_ok() {
        return Ok(StageOutcome::Valid);
    }

    let repaired = if pipeline.direction().is_forward() {
        // First millisecond of the next matching month, wrapping into
        // the next year past the last entry.
        match months.iter().find(|&&m| m > month) {
            Some(&next) => set_month(candidate, next)?.start_of(Unit::Month)?,
            None => set_month(&candidate.add(Unit::Year, 1)?, months[0])?.start_of(Unit::Month)?,
        }
    } else {
        match months.iter().rev().find(|&&m| m < month) {
            Some(&previous) => set_month(candidate, previous)?.end_of(Unit::Month)?,
            None => {
                let last = months[months.len() - 1];
                set_month(&candidate.subtract(Unit::Year, 1)?, last)?.end_of(Unit::Month)?
            }
        }
    };
    Ok(StageOutcome::Repair(repaired))
}

fn set_month(candidate: &Instant, month: u32) -> RecurResult<Instant> {
    Ok(candidate.set(Unit::Month, i64::from(month))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::Direction,
        rule::options::{Frequency, NormalizedOptions, RuleOptions},
    };

    fn utc(year: i32, month: u32, day: u32) -> Instant {
        Instant::utc(year, month, day, 0, 0, 0, 0).expect("valid date")
    }

    fn options(months: Vec<u32>) -> NormalizedOptions {
        RuleOptions::new(utc(2019, 1, 1), Frequency::Monthly)
            .with_by_month_of_year(months)
            .validate()
            .expect("should validate")
    }

    #[test]
    fn test_matching_month_is_valid() {
        let options = options(vec![3, 6, 9]);
        let pipeline = Pipeline::new(&options, Direction::Forward);
        assert_eq!(
            evaluate(&pipeline, &utc(2019, 6, 15)).expect("should evaluate"),
            StageOutcome::Valid
        );
    }

    #[test]
    fn test_forward_repair_to_next_matching_month() {
        let options = options(vec![3, 6, 9]);
        let pipeline = Pipeline::new(&options, Direction::Forward);
        assert_eq!(
            evaluate(&pipeline, &utc(2019, 4, 15)).expect("should evaluate"),
            StageOutcome::Repair(utc(2019, 6, 1))
        );
    }

    #[test]
    fn test_forward_repair_wraps_into_next_year() {
        let options = options(vec![3, 6, 9]);
        let pipeline = Pipeline::new(&options, Direction::Forward);
        assert_eq!(
            evaluate(&pipeline, &utc(2019, 10, 15)).expect("should evaluate"),
            StageOutcome::Repair(utc(2020, 3, 1))
        );
    }

    #[test]
    fn test_backward_repair_to_previous_month_end() {
        let options = options(vec![3, 6, 9]);
        let pipeline = Pipeline::new(&options, Direction::Backward);
        let expected = utc(2019, 7, 1).subtract(Unit::Millisecond, 1).expect("ok");
        assert_eq!(
            evaluate(&pipeline, &utc(2019, 8, 15)).expect("should evaluate"),
            StageOutcome::Repair(expected)
        );
    }

    #[test]
    fn test_backward_repair_wraps_into_previous_year() {
        let options = options(vec![3, 6, 9]);
        let pipeline = Pipeline::new(&options, Direction::Backward);
        let expected = utc(2018, 10, 1).subtract(Unit::Millisecond, 1).expect("ok");
        assert_eq!(
            evaluate(&pipeline, &utc(2019, 2, 15)).expect("should evaluate"),
            StageOutcome::Repair(expected)
        );
    }
}
