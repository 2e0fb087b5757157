//! Event types published by the session controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ParserMode;

/// Everything observable that happens to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A request was handed to the gateway
    SubmissionStarted {
        sequence: u64,
        parser: ParserMode,
        code_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// A report was received and applied
    SubmissionSucceeded {
        sequence: u64,
        diagnostics: usize,
        errors: usize,
        symbols: usize,
        elapsed_seconds: f64,
        timestamp: DateTime<Utc>,
    },

    /// The gateway resolved with a transport error
    SubmissionFailed {
        sequence: u64,
        error_code: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A response for an older submission arrived and was ignored
    StaleResponseDiscarded {
        sequence: u64,
        current_sequence: u64,
        timestamp: DateTime<Utc>,
    },

    /// A submit was refused because another one is in flight
    SubmissionRejected {
        in_flight: u64,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SessionEvent::SubmissionStarted { timestamp, .. } => *timestamp,
            SessionEvent::SubmissionSucceeded { timestamp, .. } => *timestamp,
            SessionEvent::SubmissionFailed { timestamp, .. } => *timestamp,
            SessionEvent::StaleResponseDiscarded { timestamp, .. } => *timestamp,
            SessionEvent::SubmissionRejected { timestamp, .. } => *timestamp,
        }
    }

    /// Snake-case name of the variant, matching the serialized `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::SubmissionStarted { .. } => "submission_started",
            SessionEvent::SubmissionSucceeded { .. } => "submission_succeeded",
            SessionEvent::SubmissionFailed { .. } => "submission_failed",
            SessionEvent::StaleResponseDiscarded { .. } => "stale_response_discarded",
            SessionEvent::SubmissionRejected { .. } => "submission_rejected",
        }
    }

    /// Submission this event is about.
    pub fn sequence(&self) -> u64 {
        match self {
            SessionEvent::SubmissionStarted { sequence, .. }
            | SessionEvent::SubmissionSucceeded { sequence, .. }
            | SessionEvent::SubmissionFailed { sequence, .. }
            | SessionEvent::StaleResponseDiscarded { sequence, .. } => *sequence,
            SessionEvent::SubmissionRejected { in_flight, .. } => *in_flight,
        }
    }
}
