//! Occurrence stream operators.
//!
//! Each operator wraps one or more child iterators behind the same
//! pull contract, pulling from them lazily and pushing skip hints down
//! so children can jump instead of enumerate.

pub(crate) mod difference;
pub(crate) mod duration;
pub(crate) mod intersection;
pub(crate) mod union;
pub(crate) mod unique;

pub use difference::DifferenceIter;
pub use duration::{MergeDurationIter, SplitDurationIter};
pub use intersection::IntersectionIter;
pub use union::UnionIter;
pub use unique::UniqueIter;

use cadenza_core::Instant;

use crate::{error::RecurResult, generator::OccurrenceGenerator, stream::StreamIter};

/// True when `a` comes strictly before `b` in traversal order.
/// Duration breaks timestamp ties, shorter first going forward.
pub(crate) fn precedes(a: &Instant, b: &Instant, reverse: bool) -> bool {
    if reverse {
        a.ordering_key() > b.ordering_key()
    } else {
        a.ordering_key() < b.ordering_key()
    }
}

/// A child iterator with one instant of lookahead, so operators can
/// compare heads across children before committing to a pull.
#[derive(Debug)]
pub(crate) struct StreamNode<'a> {
    iter: Box<StreamIter<'a>>,
    head: Option<Instant>,
    exhausted: bool,
}

impl<'a> StreamNode<'a> {
    pub(crate) fn new(iter: StreamIter<'a>) -> Self {
        Self {
            iter: Box::new(iter),
            head: None,
            exhausted: false,
        }
    }

    /// The next instant this child will emit, without consuming it.
    pub(crate) fn peek(&mut self) -> RecurResult<Option<Instant>> {
        if self.head.is_none() && !self.exhausted {
            self.head = self.iter.next_occurrence()?;
            if self.head.is_none() {
                self.exhausted = true;
            }
        }
        Ok(self.head)
    }

    /// Consumes and returns the head.
    pub(crate) fn take_head(&mut self) -> RecurResult<Option<Instant>> {
        self.peek()?;
        Ok(self.head.take())
    }

    /// Forwards a skip hint, dropping a lookahead head that precedes
    /// the target.
    pub(crate) fn skip_to(&mut self, target: &Instant, reverse: bool) -> RecurResult<()> {
        if let Some(head) = &self.head {
            if precedes(head, target, reverse) {
                self.head = None;
            } else {
                // The head already satisfies the hint.
                return Ok(());
            }
        }
        if self.exhausted {
            return Ok(());
        }
        self.iter.skip_to(target)
    }
}
