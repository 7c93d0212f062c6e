//! Timezone labels for instants.

use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::error::{CoreError, CoreResult};

/// The timezone label attached to an [`Instant`](crate::Instant).
///
/// Two instants may only be compared when their labels are equal.
/// A floating instant has no zone; its calendar fields are read off a
/// fixed timeline with no offset applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Coordinated Universal Time.
    Utc,
    /// No timezone.
    Floating,
    /// An IANA timezone.
    Named(Tz),
}

impl Zone {
    /// ## Summary
    /// Resolves a zone label; `None` means floating.
    ///
    /// `"UTC"` resolves to [`Zone::Utc`], everything else is parsed as
    /// an IANA timezone name.
    ///
    /// ## Errors
    ///
    /// Returns `CoreError::UnknownZone` if the name cannot be resolved.
    pub fn resolve(label: Option<&str>) -> CoreResult<Self> {
        match label {
            None => Ok(Self::Floating),
            Some("UTC") => Ok(Self::Utc),
            Some(name) => Tz::from_str(name).map(Self::Named).map_err(|_e| {
                tracing::debug!("Unresolvable timezone label: {name}");
                CoreError::UnknownZone(name.to_string())
            }),
        }
    }

    /// Returns the serialized label, `None` for floating.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Utc => Some("UTC"),
            Self::Floating => None,
            Self::Named(tz) => Some(tz.name()),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label().unwrap_or("floating"))
    }
}
