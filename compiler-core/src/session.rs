//! Session state controller.
//!
//! The controller is the single authority over what views may display. It
//! owns the status machine and the current [`SessionSnapshot`], dispatches
//! submissions to a [`CompileGateway`], and publishes every change as a new
//! immutable snapshot over a `tokio::sync::watch` channel plus a discrete
//! [`SessionEvent`] on the event bus.
//!
//! Each mutation and its publication happen inside one critical section, so an
//! observer sees either the state before a completion or the state after it,
//! never a half-applied report.
//!
//! Overlapping submissions are governed by [`OverlapPolicy`]. Every submission
//! is numbered; with the default policy a response for anything but the newest
//! submission is dropped.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

use crate::error::{SessionError, SessionResult, TransportResult};
use crate::events::{EventBusExt, EventFilter, FilteredReceiver, SessionEvent, SessionEventBus};
use crate::gateway::CompileGateway;
use crate::model::{CompileReport, CompileRequest, Diagnostic};
use crate::presenter::DiagnosticPresenter;
use crate::report;
use crate::state_machine::{SessionStateMachine, SessionStatus, TransitionRecord};

/// What happens when `submit` is called while a request is still in flight.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Only the response to the newest submission is applied.
    #[default]
    LatestRequestWins,
    /// Every response is applied in arrival order; the last one to arrive wins.
    LastWriteWins,
    /// A second submit is refused until the first one settles.
    RejectWhileSubmitting,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestRequestWins => write!(f, "latest_request_wins"),
            Self::LastWriteWins => write!(f, "last_write_wins"),
            Self::RejectWhileSubmitting => write!(f, "reject_while_submitting"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown overlap policy '{0}' (expected latest_request_wins, last_write_wins or reject_while_submitting)")]
pub struct UnknownOverlapPolicy(pub String);

impl FromStr for OverlapPolicy {
    type Err = UnknownOverlapPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "latest_request_wins" | "latest" => Ok(Self::LatestRequestWins),
            "last_write_wins" | "last_write" => Ok(Self::LastWriteWins),
            "reject_while_submitting" | "reject" => Ok(Self::RejectWhileSubmitting),
            _ => Err(UnknownOverlapPolicy(s.to_string())),
        }
    }
}

/// Immutable view of the session at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    /// Current editable draft.
    pub request: CompileRequest,
    /// Last applied report, symbol table sorted. Empty while submitting and
    /// after a failure.
    pub report: CompileReport,
    pub error_diagnostics: Vec<Diagnostic>,
    pub transport_failed: bool,
    /// Submission whose effects this snapshot reflects (0 before the first).
    pub sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            status: SessionStatus::Idle,
            request: CompileRequest::example(),
            report: CompileReport::empty(),
            error_diagnostics: Vec::new(),
            transport_failed: false,
            sequence: 0,
            last_error: None,
        }
    }

    pub fn has_fatal_errors(&self) -> bool {
        !self.error_diagnostics.is_empty()
    }

    /// Full, unfiltered diagnostic list of the current report.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.report.diagnostics
    }
}

/// How a gateway response was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response was applied and the session moved to this status.
    Applied(SessionStatus),
    /// The response belonged to a superseded submission and was dropped.
    Discarded,
}

/// Handle to an in-flight submission.
///
/// Dropping it does not cancel the request.
#[derive(Debug)]
pub struct SubmissionHandle {
    sequence: u64,
    task: JoinHandle<Completion>,
}

impl SubmissionHandle {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Wait until the gateway resolved and the outcome was handled.
    pub async fn wait(self) -> Result<Completion, JoinError> {
        self.task.await
    }
}

struct SessionInner {
    machine: SessionStateMachine,
    snapshot: SessionSnapshot,
    /// Highest sequence number handed out so far.
    latest_sequence: u64,
}

struct Shared {
    policy: OverlapPolicy,
    inner: Mutex<SessionInner>,
    snapshots: watch::Sender<Arc<SessionSnapshot>>,
    events: SessionEventBus,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        // Every writer replaces the snapshot wholesale, so a poisoned guard
        // still holds a consistent state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, snapshot: &SessionSnapshot) {
        self.snapshots.send_replace(Arc::new(snapshot.clone()));
    }

    fn complete(&self, sequence: u64, outcome: TransportResult<CompileReport>) -> Completion {
        let mut inner = self.lock();

        if sequence < inner.latest_sequence && self.policy != OverlapPolicy::LastWriteWins {
            info!(
                sequence,
                current_sequence = inner.latest_sequence,
                "Discarding response for superseded submission"
            );
            self.events.publish(SessionEvent::StaleResponseDiscarded {
                sequence,
                current_sequence: inner.latest_sequence,
                timestamp: Utc::now(),
            });
            return Completion::Discarded;
        }

        let request = inner.snapshot.request.clone();
        let late = sequence < inner.latest_sequence;
        let (snapshot, event, reason) = match outcome {
            Ok(raw) => {
                let processed = report::process(raw);
                info!(
                    sequence,
                    diagnostics = processed.report.diagnostics.len(),
                    errors = processed.error_diagnostics.len(),
                    seconds = processed.report.elapsed_seconds,
                    "Compile report received"
                );
                let event = SessionEvent::SubmissionSucceeded {
                    sequence,
                    diagnostics: processed.report.diagnostics.len(),
                    errors: processed.error_diagnostics.len(),
                    symbols: processed.report.symbol_table.len(),
                    elapsed_seconds: processed.report.elapsed_seconds,
                    timestamp: Utc::now(),
                };
                let snapshot = SessionSnapshot {
                    status: SessionStatus::Succeeded,
                    request,
                    report: processed.report,
                    error_diagnostics: processed.error_diagnostics,
                    transport_failed: false,
                    sequence,
                    last_error: None,
                };
                (snapshot, event, late.then_some("late response"))
            }
            Err(e) => {
                warn!(sequence, error = %e, "Submission failed");
                let event = SessionEvent::SubmissionFailed {
                    sequence,
                    error_code: e.code().to_string(),
                    message: e.to_string(),
                    timestamp: Utc::now(),
                };
                let snapshot = SessionSnapshot {
                    status: SessionStatus::Failed,
                    request,
                    report: CompileReport::empty(),
                    error_diagnostics: Vec::new(),
                    transport_failed: true,
                    sequence,
                    last_error: Some(e.to_string()),
                };
                (snapshot, event, Some(e.code()))
            }
        };

        let status = snapshot.status;
        if let Err(e) = inner.machine.advance(status, sequence, reason) {
            warn!(sequence, error = %e, "Dropping response");
            return Completion::Discarded;
        }
        inner.snapshot = snapshot;
        self.publish(&inner.snapshot);
        self.events.publish(event);
        Completion::Applied(status)
    }
}

/// Owns the session state and drives submissions through the gateway.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionController {
    gateway: Arc<dyn CompileGateway>,
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn CompileGateway>, policy: OverlapPolicy) -> Self {
        let initial = SessionSnapshot::initial();
        let (snapshots, _) = watch::channel(Arc::new(initial.clone()));
        let shared = Shared {
            policy,
            inner: Mutex::new(SessionInner {
                machine: SessionStateMachine::new(),
                snapshot: initial,
                latest_sequence: 0,
            }),
            snapshots,
            events: SessionEventBus::new(),
        };
        Self {
            gateway,
            shared: Arc::new(shared),
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.shared.policy
    }

    /// Submit `request` and return without waiting for the response.
    ///
    /// The session is `Submitting` with a cleared report by the time this
    /// returns. Must be called from within a tokio runtime.
    pub fn submit(&self, request: CompileRequest) -> SessionResult<SubmissionHandle> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        let sequence = {
            let mut inner = self.shared.lock();

            if self.shared.policy == OverlapPolicy::RejectWhileSubmitting
                && inner.machine.current() == SessionStatus::Submitting
            {
                let in_flight = inner.latest_sequence;
                warn!(in_flight, "Submission refused while another is in flight");
                self.shared.events.publish(SessionEvent::SubmissionRejected {
                    in_flight,
                    timestamp: Utc::now(),
                });
                return Err(SessionError::SubmissionInFlight(in_flight));
            }

            let sequence = inner.latest_sequence + 1;
            let reason = (!inner.machine.current().is_settled()).then_some("superseded");
            inner.machine.advance(SessionStatus::Submitting, sequence, reason)?;
            inner.latest_sequence = sequence;
            inner.snapshot = SessionSnapshot {
                status: SessionStatus::Submitting,
                request: request.clone(),
                report: CompileReport::empty(),
                error_diagnostics: Vec::new(),
                transport_failed: false,
                sequence,
                last_error: None,
            };
            self.shared.publish(&inner.snapshot);
            self.shared.events.publish(SessionEvent::SubmissionStarted {
                sequence,
                parser: request.parser_mode,
                code_len: request.code.len(),
                timestamp: Utc::now(),
            });
            sequence
        };

        info!(sequence, parser = %request.parser_mode, "Submitting program");

        let gateway = Arc::clone(&self.gateway);
        let shared = Arc::clone(&self.shared);
        let task = runtime.spawn(async move {
            let outcome = gateway.submit(request).await;
            shared.complete(sequence, outcome)
        });

        Ok(SubmissionHandle { sequence, task })
    }

    /// Submit the current draft.
    pub fn submit_current(&self) -> SessionResult<SubmissionHandle> {
        let request = self.snapshot().request.clone();
        self.submit(request)
    }

    /// Replace the draft without submitting it.
    pub fn set_request(&self, request: CompileRequest) {
        let mut inner = self.shared.lock();
        inner.snapshot.request = request;
        self.shared.publish(&inner.snapshot);
    }

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.shared.snapshots.borrow())
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionSnapshot>> {
        self.shared.snapshots.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn events_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        self.shared.events.subscribe_filtered(filter)
    }

    /// Wait until no submission is in flight and return that snapshot.
    ///
    /// Returns immediately when the session is idle or already settled.
    pub async fn wait_for_settled(&self) -> Arc<SessionSnapshot> {
        let mut receiver = self.subscribe();
        let settled = match receiver.wait_for(|s| s.status.is_settled()).await {
            Ok(snapshot) => Arc::clone(&snapshot),
            Err(_) => self.snapshot(),
        };
        settled
    }

    pub fn transitions(&self) -> Vec<TransitionRecord> {
        self.shared.lock().machine.transitions().to_vec()
    }

    pub fn summary(&self) -> String {
        self.shared.lock().machine.summary()
    }

    /// Hand the full diagnostic list of the current report to `presenter`.
    pub fn open_diagnostics(&self, presenter: &dyn DiagnosticPresenter) {
        let snapshot = self.snapshot();
        presenter.present(snapshot.diagnostics());
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("SessionController")
            .field("policy", &self.shared.policy)
            .field("status", &snapshot.status)
            .field("sequence", &snapshot.sequence)
            .finish()
    }
}
