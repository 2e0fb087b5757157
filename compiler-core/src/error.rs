//! Error types for the submission pipeline.
//!
//! Only two things can go wrong from the client's point of view: the report
//! could not be obtained ([`TransportError`]), or the session refused an
//! operation ([`SessionError`]). Error diagnostics inside a report are data,
//! not errors.

use thiserror::Error;

use crate::state_machine::IllegalTransition;

/// Result type alias for gateway calls
pub type TransportResult<T> = Result<T, TransportError>;

/// Any condition that prevented a valid report from being obtained.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("compiler service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to compiler service failed: {0}")]
    Network(String),

    #[error("could not decode compile report: {0}")]
    Decode(String),

    #[error("invalid compiler service endpoint: {0}")]
    InvalidEndpoint(String),
}

impl TransportError {
    /// Short machine-readable code, used in logs and events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::InvalidEndpoint(_) => "invalid_endpoint",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by the session controller itself.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("a submission is already in flight (sequence {0})")]
    SubmissionInFlight(u64),

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    #[error("submit must be called from within a tokio runtime")]
    NoRuntime,
}
