use thiserror::Error;

use crate::zone::Zone;

/// Core error type with minimal dependencies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Timezone mismatch: cannot compare {left} with {right}")]
    ZoneMismatch { left: Zone, right: Zone },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid duration: {0} ms")]
    InvalidDuration(i64),

    #[error("Unknown timezone: {0}")]
    UnknownZone(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
