//! Clock stages: hour, minute, second, and millisecond share one
//! evaluation shape, differing only in the unit they constrain.

use cadenza_core::{Instant, Unit};

use crate::{
    error::RecurResult,
    pipeline::{Pipeline, StageOutcome},
};

pub(crate) fn evaluate(
    pipeline: &Pipeline<'_>,
    candidate: &Instant,
    unit: Unit,
    values: &[u32],
) -> RecurResult<StageOutcome> {
    if values.is_empty() {
        return Ok(StageOutcome::Valid);
    }

    let fields = candidate.fields();
    let current = match unit {
        Unit::Hour => fields.hour,
        Unit::Minute => fields.minute,
        Unit::Second => fields.second,
        _ => fields.millisecond,
    };
    if values.binary_search(&current).is_ok() {
        return Ok(StageOutcome::Valid);
    }

    // Every clock unit has a parent window to ascend into.
    let ascend = unit.parent().unwrap_or(Unit::Day);
    if pipeline.direction().is_forward() {
        match values.iter().find(|&&value| value > current) {
            Some(&next) => {
                // Floor the finer fields so they get constrained fresh.
                let moved = candidate.set(unit, i64::from(next))?.start_of(unit)?;
                Ok(StageOutcome::Repair(moved))
            }
            None => Ok(StageOutcome::RejectAscend(ascend)),
        }
    } else {
        match values.iter().rev().find(|&&value| value < current) {
            Some(&previous) => {
                let moved = candidate.set(unit, i64::from(previous))?.end_of(unit)?;
                Ok(StageOutcome::Repair(moved))
            }
            None => Ok(StageOutcome::RejectAscend(ascend)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::Direction,
        rule::options::{Frequency, NormalizedOptions, RuleOptions},
    };

    fn utc(hour: u32, minute: u32) -> Instant {
        Instant::utc(2019, 1, 1, hour, minute, 0, 0).expect("valid date")
    }

    fn options() -> NormalizedOptions {
        RuleOptions::new(utc(0, 0), Frequency::Daily)
            .with_by_hour_of_day(vec![9, 17])
            .validate()
            .expect("should validate")
    }

    #[test]
    fn test_matching_value_is_valid() {
        let options = options();
        let pipeline = Pipeline::new(&options, Direction::Forward);
        assert_eq!(
            evaluate(&pipeline, &utc(17, 30), Unit::Hour, &options.by_hour_of_day)
                .expect("should evaluate"),
            StageOutcome::Valid
        );
    }

    #[test]
    fn test_forward_repair_floors_finer_fields() {
        let options = options();
        let pipeline = Pipeline::new(&options, Direction::Forward);
        assert_eq!(
            evaluate(&pipeline, &utc(10, 30), Unit::Hour, &options.by_hour_of_day)
                .expect("should evaluate"),
            StageOutcome::Repair(utc(17, 0))
        );
    }

    #[test]
    fn test_forward_exhausted_window_ascends_to_parent() {
        let options = options();
        let pipeline = Pipeline::new(&options, Direction::Forward);
        assert_eq!(
            evaluate(&pipeline, &utc(18, 0), Unit::Hour, &options.by_hour_of_day)
                .expect("should evaluate"),
            StageOutcome::RejectAscend(Unit::Day)
        );
    }

    #[test]
    fn test_backward_repair_ceils_finer_fields() {
        let options = options();
        let pipeline = Pipeline::new(&options, Direction::Backward);
        let expected = utc(10, 0).subtract(Unit::Millisecond, 1).expect("ok");
        assert_eq!(
            evaluate(&pipeline, &utc(12, 30), Unit::Hour, &options.by_hour_of_day)
                .expect("should evaluate"),
            StageOutcome::Repair(expected)
        );
    }

    #[test]
    fn test_backward_exhausted_window_ascends_to_parent() {
        let options = options();
        let pipeline = Pipeline::new(&options, Direction::Backward);
        assert_eq!(
            evaluate(&pipeline, &utc(8, 0), Unit::Hour, &options.by_hour_of_day)
                .expect("should evaluate"),
            StageOutcome::RejectAscend(Unit::Day)
        );
    }
}
