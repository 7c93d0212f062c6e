//! Occurrence intersection.

use cadenza_core::Instant;

use crate::{
    error::{RecurError, RecurResult},
    generator::OccurrenceGenerator,
    operator::{precedes, StreamNode},
    stream::StreamIter,
};

/// Alignment rounds allowed per emitted value before the traversal is
/// declared non-convergent. Disjoint infinite inputs would otherwise
/// chase each other forever.
pub(crate) const DEFAULT_MAX_ALIGNMENT_ROUNDS: u32 = 50;

/// Emits only instants present in every child stream. Children are
/// aligned by repeatedly skipping them all to the furthest head.
#[derive(Debug)]
pub struct IntersectionIter<'a> {
    inputs: Vec<StreamNode<'a>>,
    reverse: bool,
    max_rounds: u32,
    take: Option<usize>,
    yielded: usize,
}

impl<'a> IntersectionIter<'a> {
    pub(crate) fn new(
        inputs: Vec<StreamIter<'a>>,
        reverse: bool,
        max_rounds: u32,
        take: Option<usize>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(StreamNode::new).collect(),
            reverse,
            max_rounds,
            take,
            yielded: 0,
        }
    }
}

impl OccurrenceGenerator for IntersectionIter<'_> {
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>> {
        if self.take.is_some_and(|take| self.yielded >= take) {
            return Ok(None);
        }
        if self.inputs.is_empty() {
            return Ok(None);
        }

        for _round in 0..self.max_rounds {
            // The furthest head is the only instant every child could
            // still agree on.
            let mut furthest: Option<Instant> = None;
            for node in &mut self.inputs {
                let Some(head) = node.peek()? else {
                    return Ok(None);
                };
                let further = match &furthest {
                    Some(current) => precedes(current, &head, self.reverse),
                    None => true,
                };
                if further {
                    furthest = Some(head);
                }
            }
            let Some(target) = furthest else {
                return Ok(None);
            };

            let mut aligned = true;
            for node in &mut self.inputs {
                node.skip_to(&target, self.reverse)?;
                let Some(head) = node.peek()? else {
                    return Ok(None);
                };
                if !head.same_instant(&target)? {
                    aligned = false;
                }
            }

            if aligned {
                for node in &mut self.inputs {
                    node.take_head()?;
                }
                self.yielded += 1;
                return Ok(Some(target));
            }
        }

        Err(RecurError::NonConvergence {
            iterations: self.max_rounds,
        })
    }

    fn skip_to(&mut self, target: &Instant) -> RecurResult<()> {
        for node in &mut self.inputs {
            node.skip_to(target, self.reverse)?;
        }
        Ok(())
    }
}
