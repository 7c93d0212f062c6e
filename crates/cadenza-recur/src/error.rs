use thiserror::Error;

/// Recurrence engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurError {
    /// Invalid rule option combination, rejected at construction.
    #[error("Invalid rule options: {0}")]
    InvalidOptions(String),

    /// The constraint pipeline (or an operator's realignment loop)
    /// exceeded its iteration bound. Fatal: the rule or operator
    /// combination is contradictory, not transiently failing.
    #[error("No occurrence found within {iterations} repair iterations; the constraints are unsatisfiable")]
    NonConvergence { iterations: u32 },

    /// A merged or split interval would exceed the configured maximum.
    #[error("Interval of {actual} ms exceeds the configured maximum of {max} ms")]
    DurationOverflow { actual: i64, max: i64 },

    /// Reverse traversal of a rule with no end bound, count, or
    /// traversal end.
    #[error("Cannot traverse an unbounded rule in reverse")]
    InfiniteReverse,

    #[error(transparent)]
    Core(#[from] cadenza_core::CoreError),
}

pub type RecurResult<T> = std::result::Result<T, RecurError>;
