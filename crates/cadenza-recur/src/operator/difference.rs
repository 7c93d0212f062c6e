//! Occurrence exclusion.

use cadenza_core::Instant;

use crate::{
    error::RecurResult,
    generator::OccurrenceGenerator,
    operator::StreamNode,
    stream::StreamIter,
};

/// Emits the base stream's occurrences, dropping those matched by any
/// exclusion stream. Matching is full instant equality, timestamp and
/// duration both, so an exclusion must carry the same duration as the
/// occurrence it cancels. Exclusions are advanced in lock step via
/// skip hints, never enumerated.
#[derive(Debug)]
pub struct DifferenceIter<'a> {
    base: StreamNode<'a>,
    exclusions: Vec<StreamNode<'a>>,
    reverse: bool,
    take: Option<usize>,
    yielded: usize,
}

impl<'a> DifferenceIter<'a> {
    pub(crate) fn new(
        base: StreamIter<'a>,
        exclusions: Vec<StreamIter<'a>>,
        reverse: bool,
        take: Option<usize>,
    ) -> Self {
        Self {
            base: StreamNode::new(base),
            exclusions: exclusions.into_iter().map(StreamNode::new).collect(),
            reverse,
            take,
            yielded: 0,
        }
    }

    fn excluded(&mut self, value: &Instant) -> RecurResult<bool> {
        for exclusion in &mut self.exclusions {
            exclusion.skip_to(value, self.reverse)?;
            if let Some(head) = exclusion.peek()?
                && head.same_instant(value)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl OccurrenceGenerator for DifferenceIter<'_> {
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>> {
        if self.take.is_some_and(|take| self.yielded >= take) {
            return Ok(None);
        }
        loop {
            let Some(value) = self.base.take_head()? else {
                return Ok(None);
            };
            if self.excluded(&value)? {
                continue;
            }
            self.yielded += 1;
            return Ok(Some(value));
        }
    }

    fn skip_to(&mut self, target: &Instant) -> RecurResult<()> {
        self.base.skip_to(target, self.reverse)
    }
}
