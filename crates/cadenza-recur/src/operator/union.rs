//! K-way ordered merge of child streams.

use cadenza_core::Instant;

use crate::{
    error::RecurResult,
    generator::OccurrenceGenerator,
    operator::{precedes, StreamNode},
    stream::StreamIter,
};

/// Emits every occurrence of every child in traversal order. Equal
/// instants from different children are all emitted, ordered by child
/// position so the merge is deterministic.
#[derive(Debug)]
pub struct UnionIter<'a> {
    inputs: Vec<StreamNode<'a>>,
    reverse: bool,
    take: Option<usize>,
    yielded: usize,
}

impl<'a> UnionIter<'a> {
    pub(crate) fn new(
        inputs: Vec<StreamIter<'a>>,
        reverse: bool,
        take: Option<usize>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(StreamNode::new).collect(),
            reverse,
            take,
            yielded: 0,
        }
    }
}

impl OccurrenceGenerator for UnionIter<'_> {
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>> {
        if self.take.is_some_and(|take| self.yielded >= take) {
            return Ok(None);
        }

        let mut best: Option<(usize, Instant)> = None;
        for (index, node) in self.inputs.iter_mut().enumerate() {
            if let Some(head) = node.peek()? {
                let better = match &best {
                    Some((_, current)) => precedes(&head, current, self.reverse),
                    None => true,
                };
                if better {
                    best = Some((index, head));
                }
            }
        }

        match best {
            Some((index, _)) => {
                let value = self.inputs[index].take_head()?;
                if value.is_some() {
                    self.yielded += 1;
                }
                Ok(value)
            }
            None => Ok(None),
        }
    }

    fn skip_to(&mut self, target: &Instant) -> RecurResult<()> {
        for node in &mut self.inputs {
            node.skip_to(target, self.reverse)?;
        }
        Ok(())
    }
}
