//! Composable occurrence streams.
//!
//! A [`Stream`] is an immutable description of an occurrence source:
//! a rule, a fixed date set, or an operator over other streams.
//! Traversal state lives entirely in the [`StreamIter`] returned by
//! [`Stream::occurrences`], so one stream value can back any number of
//! concurrent traversals.

use std::{fmt, sync::Arc};

use cadenza_core::{Instant, Unit};

use crate::{
    dates::{Dates, DatesIter},
    error::RecurResult,
    generator::{OccurrenceGenerator, TraversalArgs},
    operator::{
        intersection::DEFAULT_MAX_ALIGNMENT_ROUNDS, DifferenceIter, IntersectionIter,
        MergeDurationIter, SplitDurationIter, UnionIter, UniqueIter,
    },
    rule::{Rule, RuleIter},
};

/// A split function for [`Stream::split_duration`]: given an instant
/// longer than the maximum, produce shorter instants covering it.
#[derive(Clone)]
pub struct Splitter(pub(crate) Arc<dyn Fn(&Instant, i64) -> Vec<Instant> + Send + Sync>);

impl Splitter {
    /// Wraps a split function.
    #[must_use]
    pub fn new(split: impl Fn(&Instant, i64) -> Vec<Instant> + Send + Sync + 'static) -> Self {
        Self(Arc::new(split))
    }

    /// Chops a span into consecutive pieces of at most the maximum
    /// duration, the last piece taking the remainder.
    #[must_use]
    pub fn even() -> Self {
        Self::new(|instant, max_duration_ms| {
            let total = instant.duration_ms();
            let mut pieces = Vec::new();
            let mut offset = 0;
            while offset < total {
                let length = (total - offset).min(max_duration_ms);
                if let Ok(moved) = instant.add(Unit::Millisecond, offset)
                    && let Ok(piece) = moved.with_duration(length)
                {
                    pieces.push(piece);
                }
                offset += length;
            }
            pieces
        })
    }
}

impl fmt::Debug for Splitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Splitter(..)")
    }
}

/// An occurrence stream: a leaf source or an operator over child
/// streams.
#[derive(Debug, Clone)]
pub enum Stream {
    /// A single recurrence rule.
    Rule(Rule),
    /// A fixed set of instants.
    Dates(Dates),
    /// The ordered merge of the child streams.
    Union(Vec<Stream>),
    /// The base stream minus instants matched by any exclusion.
    Difference {
        base: Box<Stream>,
        exclusions: Vec<Stream>,
    },
    /// Instants present in every child stream.
    Intersection {
        inputs: Vec<Stream>,
        max_rounds: u32,
    },
    /// The base stream with runs of equal instants collapsed.
    Unique(Box<Stream>),
    /// The base stream with overlapping spans coalesced.
    MergeDuration {
        base: Box<Stream>,
        max_duration_ms: i64,
    },
    /// The base stream with long spans split by a split function.
    SplitDuration {
        base: Box<Stream>,
        max_duration_ms: i64,
        splitter: Splitter,
    },
}

impl Stream {
    /// A stream over one rule.
    #[must_use]
    pub fn rule(rule: Rule) -> Self {
        Self::Rule(rule)
    }

    /// A stream over a fixed date set.
    #[must_use]
    pub fn dates(dates: Dates) -> Self {
        Self::Dates(dates)
    }

    /// The ordered merge of the given streams.
    #[must_use]
    pub fn union(inputs: Vec<Self>) -> Self {
        Self::Union(inputs)
    }

    /// This stream minus instants matched by any exclusion stream.
    #[must_use]
    pub fn difference(self, exclusions: Vec<Self>) -> Self {
        Self::Difference {
            base: Box::new(self),
            exclusions,
        }
    }

    /// Instants present in every given stream. `max_rounds` bounds the
    /// alignment work per emitted value; `None` uses the default.
    #[must_use]
    pub fn intersection(inputs: Vec<Self>, max_rounds: Option<u32>) -> Self {
        Self::Intersection {
            inputs,
            max_rounds: max_rounds.unwrap_or(DEFAULT_MAX_ALIGNMENT_ROUNDS),
        }
    }

    /// This stream with runs of equal instants collapsed.
    #[must_use]
    pub fn unique(self) -> Self {
        Self::Unique(Box::new(self))
    }

    /// This stream with overlapping or touching spans coalesced.
    /// Merged spans longer than `max_duration_ms` fail the traversal.
    #[must_use]
    pub fn merge_duration(self, max_duration_ms: i64) -> Self {
        Self::MergeDuration {
            base: Box::new(self),
            max_duration_ms,
        }
    }

    /// This stream with spans longer than `max_duration_ms` split by
    /// `splitter`.
    #[must_use]
    pub fn split_duration(self, max_duration_ms: i64, splitter: Splitter) -> Self {
        Self::SplitDuration {
            base: Box::new(self),
            max_duration_ms,
            splitter,
        }
    }

    /// ## Summary
    /// Starts a traversal over this stream.
    ///
    /// Bounds and direction propagate to every leaf; the take limit
    /// applies only to the iterator handed back, so operators never
    /// starve on a limit meant for the consumer.
    #[must_use]
    pub fn occurrences(&self, args: TraversalArgs) -> StreamIter<'_> {
        let child_args = args.upstream();
        match self {
            Self::Rule(rule) => StreamIter::Rule(rule.occurrences(args)),
            Self::Dates(dates) => StreamIter::Dates(dates.occurrences(args)),
            Self::Union(inputs) => StreamIter::Union(UnionIter::new(
                inputs
                    .iter()
                    .map(|input| input.occurrences(child_args))
                    .collect(),
                args.reverse,
                args.take,
            )),
            Self::Difference { base, exclusions } => StreamIter::Difference(DifferenceIter::new(
                base.occurrences(child_args),
                exclusions
                    .iter()
                    .map(|exclusion| exclusion.occurrences(child_args))
                    .collect(),
                args.reverse,
                args.take,
            )),
            Self::Intersection { inputs, max_rounds } => {
                StreamIter::Intersection(IntersectionIter::new(
                    inputs
                        .iter()
                        .map(|input| input.occurrences(child_args))
                        .collect(),
                    args.reverse,
                    *max_rounds,
                    args.take,
                ))
            }
            Self::Unique(base) => {
                StreamIter::Unique(UniqueIter::new(base.occurrences(child_args), args.take))
            }
            Self::MergeDuration {
                base,
                max_duration_ms,
            } => StreamIter::MergeDuration(MergeDurationIter::new(
                base.occurrences(child_args),
                *max_duration_ms,
                args.reverse,
                args.take,
            )),
            Self::SplitDuration {
                base,
                max_duration_ms,
                splitter,
            } => StreamIter::SplitDuration(SplitDurationIter::new(
                base.occurrences(child_args),
                *max_duration_ms,
                splitter.clone(),
                args.reverse,
                args.take,
            )),
        }
    }
}

/// ## Summary
/// Builds the canonical calendar composition: recurrence rules minus
/// exclusion rules, joined with explicit dates, minus exclusion dates,
/// de-duplicated.
///
/// Exclusion dates win over everything, including explicit dates.
#[must_use]
pub fn schedule(rrules: Vec<Rule>, exrules: Vec<Rule>, rdates: Dates, exdates: Dates) -> Stream {
    let rules = Stream::union(rrules.into_iter().map(Stream::rule).collect());
    let exrules = Stream::union(exrules.into_iter().map(Stream::rule).collect());
    let with_dates = Stream::union(vec![
        rules.difference(vec![exrules]),
        Stream::dates(rdates),
    ]);
    with_dates
        .difference(vec![Stream::dates(exdates)])
        .unique()
}

/// Traversal over a [`Stream`]. One closed set of shapes, so operator
/// nesting is resolved at construction instead of through trait
/// objects.
#[derive(Debug)]
pub enum StreamIter<'a> {
    Rule(RuleIter<'a>),
    Dates(DatesIter<'a>),
    Union(UnionIter<'a>),
    Difference(DifferenceIter<'a>),
    Intersection(IntersectionIter<'a>),
    Unique(UniqueIter<'a>),
    MergeDuration(MergeDurationIter<'a>),
    SplitDuration(SplitDurationIter<'a>),
}

impl OccurrenceGenerator for StreamIter<'_> {
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>> {
        match self {
            Self::Rule(iter) => iter.next_occurrence(),
            Self::Dates(iter) => iter.next_occurrence(),
            Self::Union(iter) => iter.next_occurrence(),
            Self::Difference(iter) => iter.next_occurrence(),
            Self::Intersection(iter) => iter.next_occurrence(),
            Self::Unique(iter) => iter.next_occurrence(),
            Self::MergeDuration(iter) => iter.next_occurrence(),
            Self::SplitDuration(iter) => iter.next_occurrence(),
        }
    }

    fn skip_to(&mut self, target: &Instant) -> RecurResult<()> {
        match self {
            Self::Rule(iter) => iter.skip_to(target),
            Self::Dates(iter) => iter.skip_to(target),
            Self::Union(iter) => iter.skip_to(target),
            Self::Difference(iter) => iter.skip_to(target),
            Self::Intersection(iter) => iter.skip_to(target),
            Self::Unique(iter) => iter.skip_to(target),
            Self::MergeDuration(iter) => iter.skip_to(target),
            Self::SplitDuration(iter) => iter.skip_to(target),
        }
    }
}

impl Iterator for StreamIter<'_> {
    type Item = RecurResult<Instant>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_occurrence().transpose()
    }
}
