//! The constraint pipeline.
//!
//! Candidate instants flow through an ordered chain of stages, coarsest
//! granularity first. A stage either accepts the candidate, repairs it
//! analytically to the nearest instant that satisfies the stage (in the
//! traversal direction), or rejects the whole window at some
//! granularity so the driver can jump past it. Every repair moves the
//! candidate strictly in the traversal direction, which is what keeps
//! looping over the stages a terminating process for satisfiable
//! rules.

pub(crate) mod by_day;
pub(crate) mod by_month;
pub(crate) mod by_time;
pub(crate) mod frequency;

use cadenza_core::{Instant, Unit};

use crate::{
    error::{RecurError, RecurResult},
    rule::options::NormalizedOptions,
};

/// Upper bound on repair rounds for a single candidate search. A
/// satisfiable rule converges in a handful of rounds; unsatisfiable
/// date combinations (February 31st) would cycle forever without it.
pub(crate) const MAX_REPAIR_ITERATIONS: u32 = 50;

/// Traversal direction of a pipeline evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub(crate) const fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }
}

/// Verdict of a single stage on a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StageOutcome {
    /// The candidate satisfies the stage.
    Valid,
    /// The candidate fails, and this is the nearest satisfying instant
    /// in the traversal direction.
    Repair(Instant),
    /// No satisfying instant exists inside the current window of the
    /// given granularity; the driver must move past the window.
    RejectAscend(Unit),
}

/// Result of driving a candidate through the full pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipelineResult {
    /// A valid occurrence, at or past the seed candidate.
    Found(Instant),
    /// The traversal bound was crossed before any candidate passed.
    Exhausted,
}

/// One pipeline evaluation context: the rule's options plus a
/// direction. Stateless across candidates; all traversal state lives
/// in the iterator that drives it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pipeline<'a> {
    options: &'a NormalizedOptions,
    direction: Direction,
}

impl<'a> Pipeline<'a> {
    pub(crate) const fn new(options: &'a NormalizedOptions, direction: Direction) -> Self {
        Self { options, direction }
    }

    pub(crate) const fn options(&self) -> &'a NormalizedOptions {
        self.options
    }

    pub(crate) const fn direction(&self) -> Direction {
        self.direction
    }

    /// ## Summary
    /// Drives a seed candidate through the stages until one instant
    /// passes them all, the traversal bound is crossed, or the repair
    /// budget runs out.
    ///
    /// ## Errors
    ///
    /// Returns `RecurError::NonConvergence` if the candidate is still
    /// being repaired after [`MAX_REPAIR_ITERATIONS`] rounds, and
    /// propagates calendar arithmetic failures.
    pub(crate) fn run(&self, seed: Instant) -> RecurResult<PipelineResult> {
        let mut candidate = seed;
        for _round in 0..MAX_REPAIR_ITERATIONS {
            if self.out_of_bounds(&candidate) {
                return Ok(PipelineResult::Exhausted);
            }

            match self.first_failure(&candidate)? {
                StageOutcome::Valid => return Ok(PipelineResult::Found(candidate)),
                StageOutcome::Repair(repaired) => {
                    tracing::trace!(
                        from = candidate.timestamp_ms(),
                        to = repaired.timestamp_ms(),
                        "Pipeline repair"
                    );
                    candidate = repaired;
                }
                StageOutcome::RejectAscend(unit) => {
                    candidate = self.advance_window(&candidate, unit)?;
                }
            }
        }

        Err(RecurError::NonConvergence {
            iterations: MAX_REPAIR_ITERATIONS,
        })
    }

    /// Runs the stages in order and returns the first non-valid
    /// outcome, or `Valid` if every stage accepts.
    fn first_failure(&self, candidate: &Instant) -> RecurResult<StageOutcome> {
        let outcome = frequency::evaluate(self, candidate)?;
        if outcome != StageOutcome::Valid {
            return Ok(outcome);
        }
        let outcome = by_month::evaluate(self, candidate)?;
        if outcome != StageOutcome::Valid {
            return Ok(outcome);
        }
        let outcome = by_day::evaluate_day_of_month(self, candidate)?;
        if outcome != StageOutcome::Valid {
            return Ok(outcome);
        }
        let outcome = by_day::evaluate_day_of_week(self, candidate)?;
        if outcome != StageOutcome::Valid {
            return Ok(outcome);
        }
        let outcome =
            by_time::evaluate(self, candidate, Unit::Hour, &self.options.by_hour_of_day)?;
        if outcome != StageOutcome::Valid {
            return Ok(outcome);
        }
        let outcome = by_time::evaluate(
            self,
            candidate,
            Unit::Minute,
            &self.options.by_minute_of_hour,
        )?;
        if outcome != StageOutcome::Valid {
            return Ok(outcome);
        }
        let outcome = by_time::evaluate(
            self,
            candidate,
            Unit::Second,
            &self.options.by_second_of_minute,
        )?;
        if outcome != StageOutcome::Valid {
            return Ok(outcome);
        }
        by_time::evaluate(
            self,
            candidate,
            Unit::Millisecond,
            &self.options.by_millisecond_of_second,
        )
    }

    /// Checks the candidate against the rule's hard traversal bounds:
    /// the until instant going forward, the start instant going
    /// backward.
    fn out_of_bounds(&self, candidate: &Instant) -> bool {
        match self.direction {
            Direction::Forward => self
                .options
                .until
                .is_some_and(|until| candidate.timestamp_ms() > until.timestamp_ms()),
            Direction::Backward => {
                candidate.timestamp_ms() < self.options.start.timestamp_ms()
            }
        }
    }

    /// Moves the candidate just past the window of the given
    /// granularity: to the start of the next window going forward, to
    /// the last millisecond of the previous window going backward.
    fn advance_window(&self, candidate: &Instant, unit: Unit) -> RecurResult<Instant> {
        let window_start = if unit == Unit::Week {
            candidate.start_of_week(self.options.week_start)?
        } else {
            candidate.start_of(unit)?
        };
        let moved = if self.direction.is_forward() {
            window_start.add(unit, 1)?
        } else {
            window_start.subtract(Unit::Millisecond, 1)?
        };
        Ok(moved)
    }
}
