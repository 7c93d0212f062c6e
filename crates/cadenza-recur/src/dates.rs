//! A fixed set of instants behind the same pull contract rules use.

use cadenza_core::Instant;

use crate::{
    error::RecurResult,
    generator::{OccurrenceGenerator, TraversalArgs},
};

/// An explicit, finite occurrence source. Instants are stored sorted
/// by (timestamp, duration); duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dates {
    instants: Vec<Instant>,
}

impl Dates {
    /// An empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            instants: Vec::new(),
        }
    }

    /// ## Summary
    /// Builds a set from the given instants, sorting them into
    /// traversal order.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::ZoneMismatch` (through `RecurError::Core`)
    /// unless every instant shares one zone.
    pub fn new(instants: Vec<Instant>) -> RecurResult<Self> {
        if let Some((first, rest)) = instants.split_first() {
            for instant in rest {
                first.compare(instant)?;
            }
        }
        let mut instants = instants;
        instants.sort_by_key(Instant::ordering_key);
        Ok(Self { instants })
    }

    /// The instants in ascending order.
    #[must_use]
    pub fn instants(&self) -> &[Instant] {
        &self.instants
    }

    /// Whether the set holds no instants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    /// Returns a new set with `instant` added.
    ///
    /// ## Errors
    ///
    /// Fails when the instant's zone differs from the set's.
    pub fn add(&self, instant: Instant) -> RecurResult<Self> {
        let mut instants = self.instants.clone();
        instants.push(instant);
        Self::new(instants)
    }

    /// Returns a new set with every instant equal to `instant`
    /// removed.
    #[must_use]
    pub fn remove(&self, instant: &Instant) -> Self {
        let instants = self
            .instants
            .iter()
            .copied()
            .filter(|existing| existing.ordering_key() != instant.ordering_key())
            .collect();
        Self { instants }
    }

    /// Starts a traversal over the set.
    #[must_use]
    pub fn occurrences(&self, args: TraversalArgs) -> DatesIter<'_> {
        DatesIter {
            instants: &self.instants,
            args,
            // Reverse traversal walks the sorted slice from the top.
            next: if args.reverse {
                self.instants.len()
            } else {
                0
            },
            yielded: 0,
            bounds_checked: false,
        }
    }
}

/// Traversal over a [`Dates`] set.
#[derive(Debug)]
pub struct DatesIter<'a> {
    instants: &'a [Instant],
    args: TraversalArgs,
    /// Ascending: index of the next instant. Descending: one past it.
    next: usize,
    yielded: usize,
    bounds_checked: bool,
}

impl DatesIter<'_> {
    fn check_bounds(&mut self) -> RecurResult<()> {
        if self.bounds_checked {
            return Ok(());
        }
        self.bounds_checked = true;
        if let Some(first) = self.instants.first() {
            if let Some(bound) = &self.args.start {
                first.compare(bound)?;
            }
            if let Some(bound) = &self.args.end {
                first.compare(bound)?;
            }
        }
        Ok(())
    }

    fn in_window(&self, instant: &Instant) -> bool {
        let ts = instant.timestamp_ms();
        self.args.start.is_none_or(|bound| ts >= bound.timestamp_ms())
            && self.args.end.is_none_or(|bound| ts <= bound.timestamp_ms())
    }
}

impl OccurrenceGenerator for DatesIter<'_> {
    fn next_occurrence(&mut self) -> RecurResult<Option<Instant>> {
        self.check_bounds()?;
        if self.args.take.is_some_and(|take| self.yielded >= take) {
            return Ok(None);
        }
        loop {
            let instant = if self.args.reverse {
                if self.next == 0 {
                    return Ok(None);
                }
                self.next -= 1;
                self.instants[self.next]
            } else {
                if self.next >= self.instants.len() {
                    return Ok(None);
                }
                let instant = self.instants[self.next];
                self.next += 1;
                instant
            };
            if self.in_window(&instant) {
                self.yielded += 1;
                return Ok(Some(instant));
            }
        }
    }

    fn skip_to(&mut self, target: &Instant) -> RecurResult<()> {
        if let Some(first) = self.instants.first() {
            first.compare(target)?;
        }
        if self.args.reverse {
            while self.next > 0 && self.instants[self.next - 1].timestamp_ms() > target.timestamp_ms()
            {
                self.next -= 1;
            }
        } else {
            while self.next < self.instants.len()
                && self.instants[self.next].timestamp_ms() < target.timestamp_ms()
            {
                self.next += 1;
            }
        }
        Ok(())
    }
}

impl Iterator for DatesIter<'_> {
    type Item = RecurResult<Instant>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_occurrence().transpose()
    }
}

#[cfg(test)]
mod tests {
    use cadenza_core::Zone;

    use super::*;

    fn utc(day: u32, hour: u32) -> Instant {
        Instant::utc(2019, 1, day, hour, 0, 0, 0).expect("valid date")
    }

    fn collect(mut iter: DatesIter<'_>) -> Vec<Instant> {
        let mut values = Vec::new();
        while let Some(value) = iter.next_occurrence().expect("should iterate") {
            values.push(value);
        }
        values
    }

    #[test]
    fn test_instants_sorted_on_construction() {
        let dates = Dates::new(vec![utc(3, 0), utc(1, 0), utc(2, 0)]).expect("should build");
        assert_eq!(dates.instants(), &[utc(1, 0), utc(2, 0), utc(3, 0)]);
    }

    #[test]
    fn test_mixed_zones_rejected() {
        let floating =
            Instant::from_fields(utc(1, 0).fields(), Zone::Floating).expect("valid date");
        assert!(Dates::new(vec![utc(1, 0), floating]).is_err());
    }

    #[test]
    fn test_window_and_take() {
        let dates =
            Dates::new(vec![utc(1, 0), utc(2, 0), utc(3, 0), utc(4, 0)]).expect("should build");
        let args = TraversalArgs::between(utc(2, 0), utc(4, 0)).with_take(2);
        assert_eq!(collect(dates.occurrences(args)), vec![utc(2, 0), utc(3, 0)]);
    }

    #[test]
    fn test_reverse_traversal() {
        let dates = Dates::new(vec![utc(1, 0), utc(2, 0), utc(3, 0)]).expect("should build");
        let values = collect(dates.occurrences(TraversalArgs::new().reversed()));
        assert_eq!(values, vec![utc(3, 0), utc(2, 0), utc(1, 0)]);
    }

    #[test]
    fn test_skip_to_discards_preceding() {
        let dates = Dates::new(vec![utc(1, 0), utc(2, 0), utc(3, 0)]).expect("should build");
        let mut iter = dates.occurrences(TraversalArgs::new());
        iter.skip_to(&utc(2, 0)).expect("should skip");
        let value = iter
            .next_occurrence()
            .expect("should iterate")
            .expect("should yield");
        assert_eq!(value, utc(2, 0));
    }

    #[test]
    fn test_duplicates_survive() {
        let dates = Dates::new(vec![utc(1, 0), utc(1, 0)]).expect("should build");
        assert_eq!(collect(dates.occurrences(TraversalArgs::new())).len(), 2);
    }

    #[test]
    fn test_remove_drops_all_equal_instants() {
        let dates =
            Dates::new(vec![utc(1, 0), utc(1, 0), utc(2, 0)]).expect("should build");
        let removed = dates.remove(&utc(1, 0));
        assert_eq!(removed.instants(), &[utc(2, 0)]);
    }
}
