//! Session state machine: explicit statuses and legal transition guards.
//!
//! Provides a typed status model for the submission session so that:
//! 1. Every status change is auditable and logged.
//! 2. Illegal transitions (e.g. completing a session that never submitted)
//!    are rejected by `advance()`.
//! 3. Tests and the CLI can replay the exact sequence of statuses.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of session statuses.
///
/// Every session starts at `Idle`. `Succeeded` and `Failed` are settled
/// statuses: they accept a new submission at any time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// A request is on the wire.
    Submitting,
    /// The last accepted response produced a report.
    Succeeded,
    /// The last accepted response was a transport failure.
    Failed,
}

impl SessionStatus {
    /// Whether the session is waiting on nothing. `Idle` counts.
    pub fn is_settled(self) -> bool {
        self != Self::Submitting
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Submitting => write!(f, "Submitting"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Legal transitions between session statuses.
///
/// ```text
/// Idle | Submitting | Succeeded | Failed → Submitting
/// Submitting → Succeeded | Failed
/// Succeeded | Failed → Succeeded | Failed   (late completion, last write wins)
/// ```
fn is_legal_transition(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;

    match to {
        Idle => false,
        Submitting => true,
        Succeeded | Failed => from != Idle,
    }
}

/// A single recorded status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SessionStatus,
    pub to: SessionStatus,
    /// Submission sequence number that caused the transition.
    pub sequence: u64,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal session transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// The session state machine.
///
/// Tracks the current status, enforces legal transitions, and keeps a log of
/// every transition.
#[derive(Debug)]
pub struct SessionStateMachine {
    current: SessionStatus,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl SessionStateMachine {
    /// Create a new state machine starting at `Idle`.
    pub fn new() -> Self {
        Self {
            current: SessionStatus::Idle,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> SessionStatus {
        self.current
    }

    /// Attempt to move to `to` on behalf of submission `sequence`.
    pub fn advance(
        &mut self,
        to: SessionStatus,
        sequence: u64,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            sequence,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            sequence,
            "Session transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// One-line history, e.g. `Idle → Failed (12ms, 2 transitions) [Submitting → Failed]`.
    pub fn summary(&self) -> String {
        let states: Vec<String> = self.transitions.iter().map(|t| t.to.to_string()).collect();
        let mut summary = format!(
            "{} → {} ({}ms, {} transitions)",
            SessionStatus::Idle,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        );
        if !states.is_empty() {
            summary.push_str(&format!(" [{}]", states.join(" → ")));
        }
        summary
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
