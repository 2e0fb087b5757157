//! Terminal rendering of session snapshots and diagnostic listings.

use std::cell::RefCell;
use std::io::{self, Write};

use compiler_core::{
    count_by_kind, format_symbol_table, Diagnostic, DiagnosticPresenter, SessionSnapshot,
    SessionStatus, TextKind,
};

/// Writes a diagnostic listing, one line per diagnostic.
pub struct TerminalPresenter<W: Write> {
    out: RefCell<W>,
    errors_only: bool,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            errors_only: false,
        }
    }

    /// Skip warnings and infos when rendering.
    pub fn errors_only(mut self, errors_only: bool) -> Self {
        self.errors_only = errors_only;
        self
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_listing(&self, diagnostics: &[Diagnostic]) -> io::Result<()> {
        let mut out = self.out.borrow_mut();
        let shown: Vec<&Diagnostic> = diagnostics
            .iter()
            .filter(|d| !self.errors_only || d.kind == TextKind::Error)
            .collect();

        if shown.is_empty() {
            writeln!(out, "No diagnostics.")?;
            return Ok(());
        }
        for (i, diagnostic) in shown.iter().enumerate() {
            writeln!(out, "{:>3}. {}", i + 1, diagnostic)?;
        }
        Ok(())
    }
}

impl<W: Write> DiagnosticPresenter for TerminalPresenter<W> {
    fn present(&self, diagnostics: &[Diagnostic]) {
        if let Err(e) = self.write_listing(diagnostics) {
            tracing::warn!("Failed to write diagnostics: {e}");
        }
    }
}

/// Summary block for a settled snapshot: status, counts, symbols, timing.
pub fn render_summary<W: Write>(snapshot: &SessionSnapshot, out: &mut W) -> io::Result<()> {
    match snapshot.status {
        SessionStatus::Failed => {
            writeln!(
                out,
                "Submission failed: {}",
                snapshot.last_error.as_deref().unwrap_or("unknown error")
            )?;
        }
        SessionStatus::Succeeded => {
            let counts = count_by_kind(&snapshot.report);
            writeln!(
                out,
                "Compiled with {} error(s), {} warning(s), {} info(s) in {:.3}s",
                counts.errors, counts.warnings, counts.infos, snapshot.report.elapsed_seconds
            )?;
            if snapshot.report.symbol_table.is_empty() {
                writeln!(out, "Symbols: (none)")?;
            } else {
                writeln!(
                    out,
                    "Symbols: {}",
                    format_symbol_table(&snapshot.report.symbol_table)
                )?;
            }
        }
        status => writeln!(out, "Session is {status}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use compiler_core::{CompileReport, CompileRequest, SymbolEntry, TextPlace, TextSpan};

    fn diagnostics() -> Vec<Diagnostic> {
        vec![
            Diagnostic::new(
                "The character $ isn't valid.",
                TextSpan::new(4, 5).unwrap(),
                TextPlace::Lexical,
                TextKind::Error,
            ),
            Diagnostic::new(
                "Variable j shadows an outer variable.",
                TextSpan::new(10, 11).unwrap(),
                TextPlace::Semantic,
                TextKind::Warning,
            ),
        ]
    }

    fn snapshot(status: SessionStatus, report: CompileReport) -> SessionSnapshot {
        SessionSnapshot {
            status,
            request: CompileRequest::example(),
            report,
            error_diagnostics: vec![],
            transport_failed: status == SessionStatus::Failed,
            sequence: 1,
            last_error: (status == SessionStatus::Failed).then(|| "connection refused".into()),
        }
    }

    #[test]
    fn test_lists_every_diagnostic() {
        let presenter = TerminalPresenter::new(Vec::new());
        presenter.present(&diagnostics());
        let text = String::from_utf8(presenter.into_inner()).unwrap();
        assert!(text.contains("  1. Error-Lexical-Position:4..5: The character $ isn't valid."));
        assert!(text.contains("  2. Warning-Semantic"));
    }

    #[test]
    fn test_errors_only_filters_listing() {
        let presenter = TerminalPresenter::new(Vec::new()).errors_only(true);
        presenter.present(&diagnostics());
        let text = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(!text.contains("Warning"));
    }

    #[test]
    fn test_empty_listing() {
        let presenter = TerminalPresenter::new(Vec::new());
        presenter.present(&[]);
        assert_eq!(
            String::from_utf8(presenter.into_inner()).unwrap(),
            "No diagnostics.\n"
        );
    }

    #[test]
    fn test_summary_for_success() {
        let report = CompileReport {
            diagnostics: diagnostics(),
            symbol_table: vec![SymbolEntry::new("j", "10"), SymbolEntry::new("res", "55")],
            elapsed_seconds: 0.0123,
        };
        let mut out = Vec::new();
        render_summary(&snapshot(SessionStatus::Succeeded, report), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1 error(s), 1 warning(s), 0 info(s) in 0.012s"));
        assert!(text.contains("Symbols: j: 10 res: 55"));
    }

    #[test]
    fn test_summary_for_failure() {
        let mut out = Vec::new();
        render_summary(
            &snapshot(SessionStatus::Failed, CompileReport::empty()),
            &mut out,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Submission failed: connection refused\n"
        );
    }
}
