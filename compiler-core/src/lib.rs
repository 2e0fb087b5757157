//! Compiler Playground Core
//!
//! Client-side pipeline for submitting programs to the compiler service and
//! preparing what a front end shows about the result.
//!
//! # Components
//!
//! - [`model`]: request, report, diagnostic and symbol-table types
//! - [`gateway`]: sends one request, returns one report or a transport error
//! - [`report`]: error classification and symbol-table ordering
//! - [`session`]: the `Idle → Submitting → Succeeded | Failed` controller
//!   that owns what views may display
//! - [`events`]: broadcast stream of submission milestones
//! - [`presenter`]: seam for diagnostic listings
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use compiler_core::{HttpGateway, OverlapPolicy, SessionController, CompileRequest, ParserMode};
//!
//! let gateway = HttpGateway::new("http://localhost:8000", "compiler/generate", None)?;
//! let session = SessionController::new(Arc::new(gateway), OverlapPolicy::default());
//!
//! session.submit(CompileRequest::new("{ let x = 1; }", ParserMode::Recursive))?;
//! let snapshot = session.wait_for_settled().await;
//! println!("{} errors", snapshot.error_diagnostics.len());
//! ```

pub mod error;
pub mod events;
pub mod gateway;
pub mod model;
pub mod presenter;
pub mod report;
pub mod session;
pub mod state_machine;

pub use error::{SessionError, SessionResult, TransportError, TransportResult};
pub use events::{EventBusExt, EventFilter, SessionEvent, SessionEventBus};
pub use gateway::{decode_report, CompileGateway, HttpGateway, DEFAULT_ENDPOINT_PATH};
pub use model::{
    CompileReport, CompileRequest, Diagnostic, ParserMode, SymbolEntry, TextKind, TextPlace,
    TextSpan,
};
pub use presenter::DiagnosticPresenter;
pub use report::{
    classify_errors, count_by_kind, format_symbol_table, has_fatal_errors, sorted_symbol_table,
    KindCounts, ProcessedReport,
};
pub use session::{
    Completion, OverlapPolicy, SessionController, SessionSnapshot, SubmissionHandle,
};
pub use state_machine::{SessionStateMachine, SessionStatus, TransitionRecord};
