//! Report processing: severity classification and symbol-table ordering.
//!
//! Everything here is a pure function of a [`CompileReport`]. Inputs are
//! borrowed and never reordered in place; derived views are fresh copies.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::{CompileReport, Diagnostic, SymbolEntry, TextKind};

/// Diagnostics with `kind == Error`, in their original order.
pub fn classify_errors(report: &CompileReport) -> Vec<Diagnostic> {
    report
        .diagnostics
        .iter()
        .filter(|d| d.is_error())
        .cloned()
        .collect()
}

/// Whether the report carries at least one error diagnostic.
pub fn has_fatal_errors(report: &CompileReport) -> bool {
    report.diagnostics.iter().any(Diagnostic::is_error)
}

/// A copy of the symbol table sorted by id in locale order.
///
/// The sort is stable: entries sharing an id keep the order the service
/// reported them in.
pub fn sorted_symbol_table(report: &CompileReport) -> Vec<SymbolEntry> {
    let mut table = report.symbol_table.clone();
    table.sort_by(|a, b| locale_cmp(&a.id, &b.id));
    table
}

/// Collation order used for identifiers.
///
/// Approximates a root-locale collator in levels. Base letters compare
/// first (accents stripped via NFD, case folded, punctuation before digits
/// before letters). Ties are then split by accents (unaccented first), then
/// by case (lowercase first), then by code point.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let primary = base_chars(a)
        .flat_map(collation_keys)
        .cmp(base_chars(b).flat_map(collation_keys));

    primary
        .then_with(|| accents(a).cmp(&accents(b)))
        .then_with(|| {
            base_chars(a)
                .map(char::is_uppercase)
                .cmp(base_chars(b).map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

fn base_chars(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().filter(|c| !is_combining_mark(*c))
}

/// Combining marks attached to each base character, in order.
fn accents(s: &str) -> Vec<Vec<char>> {
    let mut marks: Vec<Vec<char>> = Vec::new();
    for c in s.nfd() {
        if !is_combining_mark(c) {
            marks.push(Vec::new());
        } else if let Some(last) = marks.last_mut() {
            last.push(c);
        }
    }
    marks
}

fn collation_keys(c: char) -> impl Iterator<Item = (u8, char)> {
    let class = if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    };
    c.to_lowercase().map(move |lower| (class, lower))
}

/// A report as the session stores it: symbol table sorted, errors extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedReport {
    pub report: CompileReport,
    pub error_diagnostics: Vec<Diagnostic>,
}

impl ProcessedReport {
    pub fn has_fatal_errors(&self) -> bool {
        !self.error_diagnostics.is_empty()
    }
}

/// Sort and classify a freshly received report.
///
/// Takes ownership: the session's copy is the only one that gets reordered.
pub fn process(mut report: CompileReport) -> ProcessedReport {
    let error_diagnostics = classify_errors(&report);
    report.symbol_table = sorted_symbol_table(&report);
    ProcessedReport {
        report,
        error_diagnostics,
    }
}

/// Diagnostic totals per severity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

pub fn count_by_kind(report: &CompileReport) -> KindCounts {
    report
        .diagnostics
        .iter()
        .fold(KindCounts::default(), |mut counts, d| {
            match d.kind {
                TextKind::Error => counts.errors += 1,
                TextKind::Warning => counts.warnings += 1,
                TextKind::Info => counts.infos += 1,
            }
            counts
        })
}

/// Render a symbol table as `id: value` pairs on one line.
pub fn format_symbol_table(table: &[SymbolEntry]) -> String {
    table
        .iter()
        .map(|entry| format!("{}: {}", entry.id, entry.value))
        .collect::<Vec<_>>()
        .join(" ")
}
