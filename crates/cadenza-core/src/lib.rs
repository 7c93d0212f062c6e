//! Cadenza core - the immutable `Instant` model.
//!
//! An [`Instant`] is a timezone-aware point in time with an optional
//! duration, the shared currency of the recurrence engine in
//! `cadenza-recur`. Everything here is a value type: transformations
//! return new instants, comparisons across mismatched zone labels fail
//! loudly, and the calendar-field JSON form ([`InstantRecord`]) is the
//! only wire surface.

pub mod error;
pub mod instant;
pub mod unit;
pub mod zone;

pub use error::{CoreError, CoreResult};
pub use instant::record::InstantRecord;
pub use instant::{CalendarFields, Instant, OrderingKey, days_in_month, is_leap_year};
pub use unit::{Unit, Weekday};
pub use zone::Zone;
