use std::fmt;

/// Everything that can make a navigation (or anything it waits on) fail.
///
/// Cancellation is a failure too: a cancelled [`Deferred`](super::deferred::Deferred)
/// reports one of the cancellation variants through its failure callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    /// No cached screen and no factory matched the path. Nothing was mutated.
    NoScreenFound { path: String },
    /// The active screen refused to be deactivated.
    Vetoed { path: String },
    /// A newer navigation started while this one was still in flight.
    Superseded { path: String },
    /// Plain cancellation, e.g. a caller cancelled the deferred directly.
    Cancelled,
    /// The new screen's readiness hook failed.
    Readiness(String),
    /// A surface transition failed.
    Transition(String),
    /// A request made through the HTTP helper failed.
    /// `status` is `None` when no response arrived at all.
    Request {
        status: Option<u16>,
        message: String,
    },
}

impl NavError {
    /// True for the variants produced by cancelling rather than by a real failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            NavError::Vetoed { .. } | NavError::Superseded { .. } | NavError::Cancelled
        )
    }
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::NoScreenFound { path } => write!(f, "no screen or factory for {path}"),
            NavError::Vetoed { path } => {
                write!(f, "navigation to {path} cancelled by active screen")
            }
            NavError::Superseded { path } => {
                write!(f, "navigation to {path} superseded by a newer navigation")
            }
            NavError::Cancelled => write!(f, "cancelled"),
            NavError::Readiness(msg) => write!(f, "screen not ready: {msg}"),
            NavError::Transition(msg) => write!(f, "surface transition failed: {msg}"),
            NavError::Request {
                status: Some(status),
                message,
            } => write!(f, "request error, status: {status}: {message}"),
            NavError::Request {
                status: None,
                message,
            } => write!(f, "request error: {message}"),
        }
    }
}

impl std::error::Error for NavError {}
