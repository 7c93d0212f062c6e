//! Recurrence rules and their lazy occurrence iterator.

pub mod options;

use cadenza_core::{Instant, Unit};

use crate::{
    error::{RecurError, RecurResult},
    generator::{OccurrenceGenerator, TraversalArgs},
    pipeline::{Direction, Pipeline, PipelineResult},
    rule::options::{NormalizedOptions, RuleOptions},
};

/// A single validated recurrence rule.
///
/// Immutable: traversal state lives entirely in the [`RuleIter`]
/// values handed out by [`Rule::occurrences`], so one rule can back
/// any number of concurrent traversals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    options: NormalizedOptions,
}

impl Rule {
    /// ## Summary
    /// Builds a rule from raw options.
    ///
    /// ## Errors
    ///
    /// Returns `RecurError::InvalidOptions` when validation fails; see
    /// [`RuleOptions::validate`].
    pub fn new(options: RuleOptions) -> RecurResult<Self> {
        Ok(Self {
            options: options.validate()?,
        })
    }

    /// The rule's validated options.
    #[must_use]
    pub const fn options(&self) -> &NormalizedOptions {
        &self.options
    }

    /// Starts a traversal. Construction never fails; an impossible
    /// traversal (unbounded reverse) surfaces on the first pull.
    #[must_use]
    pub fn occurrences(&self, args: TraversalArgs) -> RuleIter<'_> {
        RuleIter {
            options: &self.options,
            args,
            state: State::Unprimed,
            pending: None,
            emitted: 0,
            yielded: 0,
        }
    }
}

#[derive(Debug)]
enum State {
    Unprimed,
    Running { candidate: Instant },
    /// Reverse traversal of a count-limited rule: occurrence indices
    /// only exist going forward, so those are materialized first.
    Buffered { buffer: Vec<Instant>, next: usize },
    Done,
}

/// Lazy occurrence iterator over one rule.
#[derive(Debug)]
pub struct RuleIter<'a> {
    options: &'a NormalizedOptions,
    args: TraversalArgs,
    state: State,
    pending: Option<Instant>,
    /// Occurrences consumed against the rule's count, including those
    /// before the requested window.
    emitted: u32,
    /// Values handed to the consumer, against the take limit.
    yielded: usize,
}

impl RuleIter<'_> {
    fn direction(&self) -> Direction {
        if self.args.reverse {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    /// True when `a` comes before `b` in traversal order.
    fn precedes(&self, a: &Instant, b: &Instant) -> bool {
        if self.args.reverse {
            a.timestamp_ms() > b.timestamp_ms()
        } else {
            a.timestamp_ms() < b.timestamp_ms()
        }
    }

    /// Seeds a candidate at the target's timestamp while keeping the
    /// rule's zone and duration.
    fn seed_at(&self, timestamp_ms: i64) -> RecurResult<Instant> {
        let start = self.options.start();
        Ok(start.add(Unit::Millisecond, timestamp_ms - start.timestamp_ms())?)
    }

    fn prime(&mut self) -> RecurResult<()> {
        // Window bounds must share the rule's zone.
        let start = *self.options.start();
        if let Some(bound) = &self.args.start {
            start.compare(bound)?;
        }
        if let Some(bound) = &self.args.end {
            start.compare(bound)?;
        }

        if !self.args.reverse {
            let mut candidate = start;
            // Without a count the window's lower bound is a pure skip
            // hint; with one, earlier occurrences still consume it.
            if self.options.count().is_none()
                && let Some(bound) = self.args.start
                && bound.timestamp_ms() > candidate.timestamp_ms()
            {
                candidate = self.seed_at(bound.timestamp_ms())?;
            }
            self.state = State::Running { candidate };
            return Ok(());
        }

        if self.options.count().is_some() {
            self.state = State::Buffered {
                buffer: self.materialize_forward()?,
                next: 0,
            };
            return Ok(());
        }

        let edge = match (self.options.until(), self.args.end.as_ref()) {
            (Some(until), Some(end)) => until.timestamp_ms().min(end.timestamp_ms()),
            (Some(until), None) => until.timestamp_ms(),
            (None, Some(end)) => end.timestamp_ms(),
            (None, None) => return Err(RecurError::InfiniteReverse),
        };
        self.state = State::Running {
            candidate: self.seed_at(edge)?,
        };
        Ok(())
    }

    /// Runs the rule forward to completion and returns the windowed
    /// occurrences in descending order. Only reachable for
    /// count-limited rules, so the forward run is finite.
    fn materialize_forward(&self) -> RecurResult<Vec<Instant>> {
        let pipeline = Pipeline::new(self.options, Direction::Forward);
        let count = self.options.count().unwrap_or(0);
        let mut buffer = Vec::new();
        let mut candidate = *self.options.start();
        for _index in 0..count {
            match pipeline.run(candidate)? {
                PipelineResult::Found(found) => {
                    candidate = found.add(Unit::Millisecond, 1)?;
                    let before_window = self
                        .args
                        .start
                        .is_some_and(|bound| found.timestamp_ms() < bound.timestamp_ms());
                    let after_window = self
                        .args
                        .end
                        .is_some_and(|bound| found.timestamp_ms() > bound.timestamp_ms());
                    if after_window {
                        break;
                    }
                    if !before_window {
                        buffer.push(found);
                    }
                }
                PipelineResult::Exhausted => break,
            }
        }
        buffer.reverse();
        Ok(buffer)
    }

    /// Produces the next occurrence inside the window, honoring the
    /// rule's count but not the take limit.
    fn advance(&mut self) -> RecurResult<Option<Instant>> {
        loop {
            match &mut self.state {
                State::Done => return Ok(None),
                State::Unprimed => self.prime()?,
                State::Buffered { buffer, next } => {
                    if *next >= buffer.len() {
                        self.state = State::Done;
                        return Ok(None);
                    }
                    let value = buffer[*next];
                    *next += 1;
                    return Ok(Some(value));
                }
                State::Running { candidate } => {
                    let seed = *candidate;
                    let pipeline = Pipeline::new(self.options, self.direction());
                    match pipeline.run(seed)? {
                        PipelineResult::Exhausted => {
                            self.state = State::Done;
                            return Ok(None);
                        }
                        PipelineResult::Found(found) => {
                            let next_seed = if self.args.reverse {
                                found.subtract(Unit::Millisecond, 1)?
                            } else {
                                found.add(Unit::Millisecond, 1)?
                            };
                            if let State::Running { candidate } = &mut self.state {
                                *candidate = next_seed;
                            }

                            if let Some(count) = self.options.count() {
                                if self.emitted >= count {
                                    self.state = State::Done;
                                    return Ok(None);
                                }
                                self.emitted += 1;
                            }

                            if self.args.reverse {
                                if self
                                    .args
                                    .start
                                    .is_some_and(|b| found.timestamp_ms() < b.timestamp_ms())
                                {
                                    self.state = State::Done;
                                    return Ok(None);
                                }
                            } else {
                                if self
                                    .args
                                    .end
                                    .is_some_and(|b| found.timestamp_ms() > b.timestamp_ms())
                                {
                                    self.state = State::Done;
                                    return Ok(None);
                                }
                                // Counted, but before the window.
                                if self
                                    .args
                                    .start
                                    .is_some_and(|b| found.timestamp_ms() < b.timestamp_ms())
                                {
                                    continue;
                                }
                            }
                            return Ok(Some(found));
                        }
                    }
                }
            }
        }
    }
}

impl OccurrenceGenerator for RuleIter<'_> {
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>> {
        if self.args.take.is_some_and(|take| self.yielded >= take) {
            self.state = State::Done;
            return Ok(None);
        }
        let value = match self.pending.take() {
            Some(pending) => Some(pending),
            None => match self.advance() {
                Ok(value) => value,
                Err(error) => {
                    self.state = State::Done;
                    return Err(error);
                }
            },
        };
        if value.is_some() {
            self.yielded += 1;
        }
        Ok(value)
    }

    fn skip_to(&mut self, target: &Instant) -> RecurResult<()> {
        self.options.start().compare(target)?;

        if let Some(pending) = &self.pending {
            if self.precedes(pending, target) {
                self.pending = None;
            } else {
                return Ok(());
            }
        }

        match &mut self.state {
            State::Done => Ok(()),
            State::Buffered { buffer, next } => {
                let reverse = self.args.reverse;
                while *next < buffer.len() {
                    let value = &buffer[*next];
                    let before_target = if reverse {
                        value.timestamp_ms() > target.timestamp_ms()
                    } else {
                        value.timestamp_ms() < target.timestamp_ms()
                    };
                    if !before_target {
                        break;
                    }
                    *next += 1;
                }
                Ok(())
            }
            State::Unprimed | State::Running { .. } => {
                if self.options.count().is_some() && !self.args.reverse {
                    // Occurrence indices matter, so skipped values must
                    // still be generated and counted.
                    loop {
                        match self.advance()? {
                            None => return Ok(()),
                            Some(value) => {
                                if !self.precedes(&value, target) {
                                    self.pending = Some(value);
                                    return Ok(());
                                }
                            }
                        }
                    }
                } else {
                    if matches!(self.state, State::Unprimed) {
                        self.prime()?;
                    }
                    let needs_jump = match &self.state {
                        State::Running { candidate } => self.precedes(candidate, target),
                        _ => false,
                    };
                    if needs_jump {
                        let seed = self.seed_at(target.timestamp_ms())?;
                        if let State::Running { candidate } = &mut self.state {
                            *candidate = seed;
                        }
                    }
                    Ok(())
                }
            }
        }
    }
}

impl Iterator for RuleIter<'_> {
    type Item = RecurResult<Instant>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_occurrence().transpose()
    }
}

#[cfg(test)]
mod tests {
    use cadenza_core::Weekday;

    use super::*;
    use crate::rule::options::{Frequency, WeekdayNum};

    fn utc(year: i32, month: u32, day: u32, hour: u32) -> Instant {
        Instant::utc(year, month, day, hour, 0, 0, 0).expect("valid date")
    }

    fn collect(mut iter: RuleIter<'_>) -> Vec<Instant> {
        let mut values = Vec::new();
        while let Some(value) = iter.next_occurrence().expect("should iterate") {
            values.push(value);
        }
        values
    }

    #[test]
    fn test_daily_count_rule() {
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily).with_count(3),
        )
        .expect("should build");

        let values = collect(rule.occurrences(TraversalArgs::new()));
        assert_eq!(
            values,
            vec![utc(2019, 1, 1, 9), utc(2019, 1, 2, 9), utc(2019, 1, 3, 9)]
        );
    }

    #[test]
    fn test_first_occurrence_is_start_when_it_matches() {
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Weekly).with_count(2),
        )
        .expect("should build");
        let values = collect(rule.occurrences(TraversalArgs::new()));
        assert_eq!(values[0], utc(2019, 1, 1, 9));
        assert_eq!(values[1], utc(2019, 1, 8, 9));
    }

    #[test]
    fn test_until_bound_is_inclusive() {
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily)
                .with_until(utc(2019, 1, 3, 9)),
        )
        .expect("should build");
        let values = collect(rule.occurrences(TraversalArgs::new()));
        assert_eq!(values.len(), 3);
        assert_eq!(values[2], utc(2019, 1, 3, 9));
    }

    #[test]
    fn test_window_skips_ahead_without_count() {
        let rule = Rule::new(RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily))
            .expect("should build");
        let args = TraversalArgs::between(utc(2019, 3, 1, 0), utc(2019, 3, 3, 23));
        let values = collect(rule.occurrences(args));
        assert_eq!(
            values,
            vec![utc(2019, 3, 1, 9), utc(2019, 3, 2, 9), utc(2019, 3, 3, 9)]
        );
    }

    #[test]
    fn test_count_consumed_by_occurrences_before_window() {
        // Three daily occurrences total; only the third falls inside
        // the window.
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily).with_count(3),
        )
        .expect("should build");
        let args = TraversalArgs {
            start: Some(utc(2019, 1, 3, 0)),
            ..TraversalArgs::default()
        };
        let values = collect(rule.occurrences(args));
        assert_eq!(values, vec![utc(2019, 1, 3, 9)]);
    }

    #[test]
    fn test_take_limits_yielded_values() {
        let rule = Rule::new(RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily))
            .expect("should build");
        let values = collect(rule.occurrences(TraversalArgs::new().with_take(4)));
        assert_eq!(values.len(), 4);
        assert_eq!(values[3], utc(2019, 1, 4, 9));
    }

    #[test]
    fn test_reverse_traversal_from_until() {
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily)
                .with_until(utc(2019, 1, 4, 9)),
        )
        .expect("should build");
        let values = collect(rule.occurrences(TraversalArgs::new().reversed()));
        assert_eq!(
            values,
            vec![
                utc(2019, 1, 4, 9),
                utc(2019, 1, 3, 9),
                utc(2019, 1, 2, 9),
                utc(2019, 1, 1, 9),
            ]
        );
    }

    #[test]
    fn test_reverse_traversal_with_count_materializes_forward() {
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily).with_count(3),
        )
        .expect("should build");
        let values = collect(rule.occurrences(TraversalArgs::new().reversed()));
        assert_eq!(
            values,
            vec![utc(2019, 1, 3, 9), utc(2019, 1, 2, 9), utc(2019, 1, 1, 9)]
        );
    }

    #[test]
    fn test_unbounded_reverse_fails_on_first_pull() {
        let rule = Rule::new(RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily))
            .expect("should build");
        let mut iter = rule.occurrences(TraversalArgs::new().reversed());
        assert!(matches!(
            iter.next_occurrence(),
            Err(RecurError::InfiniteReverse)
        ));
    }

    #[test]
    fn test_skip_to_jumps_without_enumerating() {
        let rule = Rule::new(RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily))
            .expect("should build");
        let mut iter = rule.occurrences(TraversalArgs::new());
        iter.skip_to(&utc(2024, 6, 1, 0)).expect("should skip");
        let value = iter
            .next_occurrence()
            .expect("should iterate")
            .expect("should yield");
        assert_eq!(value, utc(2024, 6, 1, 9));
    }

    #[test]
    fn test_skip_to_preserves_count_semantics() {
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily).with_count(5),
        )
        .expect("should build");
        let mut iter = rule.occurrences(TraversalArgs::new());
        iter.skip_to(&utc(2019, 1, 4, 0)).expect("should skip");
        let mut values = Vec::new();
        while let Some(value) = iter.next_occurrence().expect("should iterate") {
            values.push(value);
        }
        // Occurrences 1-3 were consumed by the skip; 4 and 5 remain.
        assert_eq!(values, vec![utc(2019, 1, 4, 9), utc(2019, 1, 5, 9)]);
    }

    #[test]
    fn test_yearly_tuesday_rule_repairs_into_next_week() {
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 15, 0), Frequency::Yearly)
                .with_by_day_of_week(vec![WeekdayNum::every(Weekday::Tuesday)]),
        )
        .expect("should build");
        let mut iter = rule.occurrences(TraversalArgs::new());
        iter.skip_to(&utc(2019, 1, 16, 0)).expect("should skip");
        let value = iter
            .next_occurrence()
            .expect("should iterate")
            .expect("should yield");
        assert_eq!(value, utc(2019, 1, 22, 0));
    }

    #[test]
    fn test_non_convergent_rule_surfaces_error() {
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 31, 0), Frequency::Monthly)
                .with_by_month_of_year(vec![2])
                .with_by_day_of_month(vec![31]),
        )
        .expect("should build");
        let mut iter = rule.occurrences(TraversalArgs::new());
        assert!(matches!(
            iter.next_occurrence(),
            Err(RecurError::NonConvergence { iterations: _ })
        ));
        // The iterator is dead afterwards.
        assert!(matches!(iter.next_occurrence(), Ok(None)));
    }

    #[test]
    fn test_duration_carries_through_occurrences() {
        let start = utc(2019, 1, 1, 9).with_duration(3_600_000).expect("ok");
        let rule = Rule::new(RuleOptions::new(start, Frequency::Daily).with_count(2))
            .expect("should build");
        let values = collect(rule.occurrences(TraversalArgs::new()));
        assert!(values.iter().all(|v| v.duration_ms() == 3_600_000));
    }

    #[test]
    fn test_iterator_adapter_yields_results() {
        let rule = Rule::new(
            RuleOptions::new(utc(2019, 1, 1, 9), Frequency::Daily).with_count(2),
        )
        .expect("should build");
        let values: Vec<Instant> = rule
            .occurrences(TraversalArgs::new())
            .collect::<RecurResult<Vec<_>>>()
            .expect("should collect");
        assert_eq!(values.len(), 2);
    }
}
