//! Duration shaping: merging overlapping spans and splitting long
//! ones.

use std::collections::VecDeque;

use cadenza_core::Instant;

use crate::{
    error::{RecurError, RecurResult},
    generator::OccurrenceGenerator,
    operator::{precedes, StreamNode},
    stream::{Splitter, StreamIter},
};

/// Recursion bound on re-splitting pieces a splitter returns. Each
/// level must strictly shrink durations, so a deep recursion signals a
/// broken splitter.
const MAX_SPLIT_DEPTH: u32 = 50;

/// Coalesces overlapping or touching spans into one instant covering
/// their union. Fails with `DurationOverflow` when a merged span
/// exceeds the configured maximum.
#[derive(Debug)]
pub struct MergeDurationIter<'a> {
    base: StreamNode<'a>,
    max_duration_ms: i64,
    reverse: bool,
    take: Option<usize>,
    yielded: usize,
}

impl<'a> MergeDurationIter<'a> {
    pub(crate) fn new(
        base: StreamIter<'a>,
        max_duration_ms: i64,
        reverse: bool,
        take: Option<usize>,
    ) -> Self {
        Self {
            base: StreamNode::new(base),
            max_duration_ms,
            reverse,
            take,
            yielded: 0,
        }
    }

    fn merge_forward(&mut self, first: Instant) -> RecurResult<Instant> {
        let span_start = first.timestamp_ms();
        let mut span_end = first.timestamp_ms() + first.duration_ms();
        while let Some(head) = self.base.peek()? {
            if head.timestamp_ms() > span_end {
                break;
            }
            self.base.take_head()?;
            span_end = span_end.max(head.timestamp_ms() + head.duration_ms());
        }
        self.shape(first, span_end - span_start)
    }

    fn merge_backward(&mut self, first: Instant) -> RecurResult<Instant> {
        let mut span_start = first.timestamp_ms();
        let mut span_end = first.timestamp_ms() + first.duration_ms();
        let mut earliest = first;
        while let Some(head) = self.base.peek()? {
            if head.timestamp_ms() + head.duration_ms() < span_start {
                break;
            }
            self.base.take_head()?;
            span_start = span_start.min(head.timestamp_ms());
            span_end = span_end.max(head.timestamp_ms() + head.duration_ms());
            earliest = head;
        }
        self.shape(earliest, span_end - span_start)
    }

    fn shape(&self, anchor: Instant, duration_ms: i64) -> RecurResult<Instant> {
        if duration_ms > self.max_duration_ms {
            return Err(RecurError::DurationOverflow {
                actual: duration_ms,
                max: self.max_duration_ms,
            });
        }
        Ok(anchor.with_duration(duration_ms)?)
    }
}

impl OccurrenceGenerator for MergeDurationIter<'_> {
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>> {
        if self.take.is_some_and(|take| self.yielded >= take) {
            return Ok(None);
        }
        let Some(first) = self.base.take_head()? else {
            return Ok(None);
        };
        let merged = if self.reverse {
            self.merge_backward(first)?
        } else {
            self.merge_forward(first)?
        };
        self.yielded += 1;
        Ok(Some(merged))
    }

    fn skip_to(&mut self, target: &Instant) -> RecurResult<()> {
        self.base.skip_to(target, self.reverse)
    }
}

/// Splits instants longer than the maximum into shorter pieces using
/// a caller-supplied split function, re-emitting the pieces in
/// traversal order.
#[derive(Debug)]
pub struct SplitDurationIter<'a> {
    base: StreamNode<'a>,
    max_duration_ms: i64,
    splitter: Splitter,
    buffer: VecDeque<Instant>,
    reverse: bool,
    take: Option<usize>,
    yielded: usize,
}

impl<'a> SplitDurationIter<'a> {
    pub(crate) fn new(
        base: StreamIter<'a>,
        max_duration_ms: i64,
        splitter: Splitter,
        reverse: bool,
        take: Option<usize>,
    ) -> Self {
        Self {
            base: StreamNode::new(base),
            max_duration_ms,
            splitter,
            buffer: VecDeque::new(),
            reverse,
            take,
            yielded: 0,
        }
    }

    /// Splits one long instant down to pieces within the maximum and
    /// queues them in traversal order.
    fn split_into_buffer(&mut self, value: Instant) -> RecurResult<()> {
        let mut pieces = Vec::new();
        let mut worklist = vec![(value, 0_u32)];
        while let Some((item, depth)) = worklist.pop() {
            if item.duration_ms() <= self.max_duration_ms {
                pieces.push(item);
                continue;
            }
            if depth >= MAX_SPLIT_DEPTH {
                return Err(RecurError::NonConvergence {
                    iterations: MAX_SPLIT_DEPTH,
                });
            }
            let parts = (self.splitter.0)(&item, self.max_duration_ms);
            if parts.is_empty()
                || parts.iter().any(|part| part.duration_ms() >= item.duration_ms())
            {
                return Err(RecurError::InvalidOptions(
                    "duration splitter must produce strictly shorter instants".to_string(),
                ));
            }
            for part in parts {
                worklist.push((part, depth + 1));
            }
        }
        // Pieces can land between pieces already buffered from an
        // earlier overlapping instant, so the whole queue is re-sorted.
        self.buffer.extend(pieces);
        let mut sorted: Vec<Instant> = self.buffer.drain(..).collect();
        if self.reverse {
            sorted.sort_by_key(|piece| std::cmp::Reverse(piece.ordering_key()));
        } else {
            sorted.sort_by_key(Instant::ordering_key);
        }
        self.buffer.extend(sorted);
        Ok(())
    }
}

impl OccurrenceGenerator for SplitDurationIter<'_> {
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>> {
        if self.take.is_some_and(|take| self.yielded >= take) {
            return Ok(None);
        }
        loop {
            let head = self.base.peek()?;
            if let Some(front) = self.buffer.front() {
                // Drain the buffer while it leads the base stream.
                let buffer_leads =
                    head.is_none_or(|head| !precedes(&head, front, self.reverse));
                if buffer_leads {
                    let value = self.buffer.pop_front();
                    if value.is_some() {
                        self.yielded += 1;
                    }
                    return Ok(value);
                }
            }
            let Some(value) = self.base.take_head()? else {
                return Ok(None);
            };
            if value.duration_ms() <= self.max_duration_ms {
                self.yielded += 1;
                return Ok(Some(value));
            }
            self.split_into_buffer(value)?;
        }
    }

    fn skip_to(&mut self, target: &Instant) -> RecurResult<()> {
        self.buffer
            .retain(|value| !precedes(value, target, self.reverse));
        self.base.skip_to(target, self.reverse)
    }
}
