//! Crate-level error types
//!
//! Almost every hub operation reports failure through booleans or a
//! [`DispatchOutcome`](crate::dispatch::DispatchOutcome); a missing recipient
//! or a denied group operation is an expected condition, not an error. The
//! only fallible machinery left is payload serialization.

use std::fmt;

/// Convenience alias for hub operations
pub type Result<T> = std::result::Result<T, HubError>;

/// Error type for hub operations
#[derive(Debug)]
pub enum HubError {
    /// A payload could not be serialized into a wire event
    Codec(serde_json::Error),
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubError::Codec(err) => write!(f, "Payload serialization failed: {}", err),
        }
    }
}

impl std::error::Error for HubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HubError::Codec(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Codec(err)
    }
}
