//! Duplicate suppression.

use cadenza_core::{Instant, OrderingKey};

use crate::{
    error::RecurResult,
    generator::OccurrenceGenerator,
    stream::StreamIter,
};

/// Collapses runs of equal instants to their first value. Equality is
/// the full ordering key, so two values at the same millisecond with
/// different durations are distinct and both emitted. Children of a
/// union emit duplicates adjacently, so one key of memory suffices.
#[derive(Debug)]
pub struct UniqueIter<'a> {
    base: Box<StreamIter<'a>>,
    last_key: Option<OrderingKey>,
    take: Option<usize>,
    yielded: usize,
}

impl<'a> UniqueIter<'a> {
    pub(crate) fn new(base: StreamIter<'a>, take: Option<usize>) -> Self {
        Self {
            base: Box::new(base),
            last_key: None,
            take,
            yielded: 0,
        }
    }
}

impl OccurrenceGenerator for UniqueIter<'_> {
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>> {
        if self.take.is_some_and(|take| self.yielded >= take) {
            return Ok(None);
        }
        loop {
            let Some(value) = self.base.next_occurrence()? else {
                return Ok(None);
            };
            if self.last_key == Some(value.ordering_key()) {
                continue;
            }
            self.last_key = Some(value.ordering_key());
            self.yielded += 1;
            return Ok(Some(value));
        }
    }

    fn skip_to(&mut self, target: &Instant) -> RecurResult<()> {
        self.base.skip_to(target)
    }
}
