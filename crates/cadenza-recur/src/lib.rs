//! Lazy RFC 5545 style recurrence engine.
//!
//! Rules and streams are immutable descriptions; calling
//! `occurrences()` with [`TraversalArgs`] starts an independent lazy
//! traversal that computes each occurrence analytically instead of
//! scanning candidate instants one by one.

pub mod dates;
pub mod error;
pub mod generator;
pub mod operator;
mod pipeline;
pub mod rule;
pub mod stream;

pub use cadenza_core::{CalendarFields, CoreError, Instant, InstantRecord, Unit, Weekday, Zone};
pub use dates::{Dates, DatesIter};
pub use error::{RecurError, RecurResult};
pub use generator::{OccurrenceGenerator, TraversalArgs};
pub use rule::{
    options::{Frequency, NormalizedOptions, RuleOptions, WeekdayNum},
    Rule, RuleIter,
};
pub use stream::{schedule, Splitter, Stream, StreamIter};
