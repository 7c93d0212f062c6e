//! The pull contract every occurrence source implements.

use cadenza_core::Instant;

use crate::error::RecurResult;

/// Traversal parameters, supplied per `occurrences()` call and never
/// baked into stream configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraversalArgs {
    /// Inclusive lower bound on emitted instants.
    pub start: Option<Instant>,
    /// Inclusive upper bound on emitted instants.
    pub end: Option<Instant>,
    /// Maximum number of instants to emit.
    pub take: Option<usize>,
    /// Emit in descending order.
    pub reverse: bool,
}

impl TraversalArgs {
    /// Unbounded ascending traversal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the traversal to `[start, end]` inclusive.
    #[must_use]
    pub fn between(start: Instant, end: Instant) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Sets the emission limit.
    #[must_use]
    pub fn with_take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    /// Flips the traversal to descending order.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Arguments for an upstream generator: bounds and direction
    /// propagate, the take limit applies only to the iterator the
    /// consumer holds.
    pub(crate) fn upstream(&self) -> Self {
        Self { take: None, ..*self }
    }
}

/// ## Summary
/// The cooperative pull protocol shared by rule generators, date sets
/// and stream operators.
///
/// Single-threaded and synchronous: the consumer repeatedly asks for
/// the next instant in traversal order, and between pulls may advise
/// the source to skip ahead. Nothing is computed beyond the value
/// needed to answer the current pull, so dropping the generator
/// cancels the traversal with no cleanup protocol.
pub trait OccurrenceGenerator {
    /// Computes the next instant in traversal order, `None` on
    /// exhaustion.
    ///
    /// ## Errors
    ///
    /// Any error is fatal to the traversal; see
    /// [`RecurError`](crate::error::RecurError).
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>>;

    /// ## Summary
    /// Resume hint: discard pending values strictly before `target`
    /// (strictly after it in reverse), down to but not past it.
    ///
    /// A hint may reorder internal lookahead but never the order of
    /// emitted values.
    ///
    /// ## Errors
    ///
    /// Fails on zone mismatch between `target` and the stream's
    /// instants, or on any upstream failure encountered while
    /// discarding.
    fn skip_to(&mut self, target: &Instant) -> RecurResult<()>;
}
