//! Seam between the session and whatever renders a diagnostic listing.

use crate::model::Diagnostic;

/// Renders a diagnostic listing on demand.
///
/// Receives a snapshot of the full, unfiltered list; later submissions do not
/// update what was already handed over.
pub trait DiagnosticPresenter {
    fn present(&self, diagnostics: &[Diagnostic]);
}
