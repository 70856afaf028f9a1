//! Error types for the rightsizing engine.

use crate::models::SignalKind;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, RightsizeError>;

/// Errors that can abort a rightsizing run.
#[derive(Debug, Error)]
pub enum RightsizeError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("backend status={status}")]
    BackendStatus { status: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("{signal}: {source}")]
    Signal {
        signal: SignalKind,
        #[source]
        source: Box<RightsizeError>,
    },
}

impl RightsizeError {
    /// Attach the identity of the signal whose fetch failed.
    pub fn for_signal(self, signal: SignalKind) -> Self {
        RightsizeError::Signal {
            signal,
            source: Box::new(self),
        }
    }
}

impl From<reqwest::Error> for RightsizeError {
    fn from(err: reqwest::Error) -> Self {
        RightsizeError::Transport(err.to_string())
    }
}

/// Reason a single result entry was dropped by the parser.
///
/// Never fatal: the rest of the batch is still returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedSample {
    #[error("value pair missing or shorter than two elements")]
    MissingValue,

    #[error("sample value is not a string")]
    NonStringValue,

    #[error("sample value {0:?} is not a float")]
    InvalidFloat(String),

    #[error("sample value {0} is not finite")]
    NonFinite(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_error_names_the_signal() {
        let err = RightsizeError::BackendStatus {
            status: "error".to_string(),
        }
        .for_signal(SignalKind::MemRequest);

        assert_eq!(err.to_string(), "mem requests: backend status=error");
        assert!(std::error::Error::source(&err).is_some());
    }
}
