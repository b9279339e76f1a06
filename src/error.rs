//! Error types for the bridge.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the failure class: a missing target, a lost connection, a command that the
//! fieldset's current state or competition forbids, or an engine that is not
//! running.

use thiserror::Error;

use crate::fieldset::{Competition, FieldsetState};

/// Top-level error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Cannot connect to a Match Field Set dialog titled '{title}'. Ensure the dialog is open and visible")]
    NotFound {
        title: String,
    },

    #[error("Connection to fieldset '{title}' lost: {reason}")]
    Connection {
        title: String,
        reason: String,
    },

    #[error("Cannot {operation} while the match is {state}: {reason}")]
    InvalidState {
        operation: &'static str,
        state: FieldsetState,
        reason: String,
    },

    #[error("{feature} is not available for {competition}")]
    UnsupportedForCategory {
        feature: String,
        competition: Competition,
    },

    #[error("{field} value {value} is out of range")]
    OutOfRange {
        field: &'static str,
        value: u32,
    },

    #[error("Bridge engine is not running")]
    NotRunning,

    #[error("Unrecognized {control} value: {raw:?}")]
    UnrecognizedValue {
        control: &'static str,
        raw: String,
    },

    #[error("Snapshot stream for '{title}' is closed")]
    StreamClosed {
        title: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl BridgeError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a connection error for the given fieldset.
    #[must_use]
    pub fn connection(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connection {
            title: title.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is a lost or missing connection.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::NotFound { .. })
    }

    /// Returns true if this is a state-gated command rejection.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Returns true if retrying the same call may succeed without any
    /// change made by the caller.
    ///
    /// Only connection loss qualifies: the target may come back. State and
    /// category rejections need an external change first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mentions_title() {
        let err = BridgeError::NotFound {
            title: "Match Field Set #1".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Match Field Set #1"));
        assert!(err.is_connection());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_connection_is_retryable() {
        let err = BridgeError::connection("F1", "window closed");
        assert!(err.is_connection());
        assert!(err.is_retryable());
        assert!(format!("{err}").contains("window closed"));
    }

    #[test]
    fn test_invalid_state_message() {
        let err = BridgeError::InvalidState {
            operation: "start match",
            state: FieldsetState::DriverControl,
            reason: "match already started".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("start match"));
        assert!(msg.contains("DRIVER CONTROL"));
        assert!(err.is_invalid_state());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unsupported_for_category_message() {
        let err = BridgeError::UnsupportedForCategory {
            feature: "Autonomous bonus".to_string(),
            competition: Competition::Viqrc,
        };
        assert!(format!("{err}").contains("VEX IQ Robotics Competition"));
    }

    #[test]
    fn test_timeout_message() {
        let err = BridgeError::Timeout { duration_ms: 250 };
        assert!(format!("{err}").contains("250ms"));
        assert!(!err.is_connection());
    }

    #[test]
    fn test_not_running_and_internal() {
        assert!(!BridgeError::NotRunning.is_retryable());
        let err = BridgeError::internal("unexpected state");
        assert!(format!("{err}").contains("unexpected state"));
    }
}
