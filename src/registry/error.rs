//! Sink error types

/// Error type for sink writes
///
/// Both variants mean the connection is no longer deliverable; the
/// dispatcher responds to either by evicting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The client stream was dropped (peer gone)
    Closed,
    /// The outbound queue is full (peer too slow to drain it)
    Backpressure,
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Closed => write!(f, "Sink closed"),
            SinkError::Backpressure => write!(f, "Sink queue full"),
        }
    }
}

impl std::error::Error for SinkError {}
