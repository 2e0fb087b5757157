//! Domain model shared by the gateway, the report processor and the session.
//!
//! These are the shapes exchanged with the compiler service. Decoding is
//! strict: a payload that does not match these types (unknown severity,
//! inverted span, missing field) is rejected instead of being passed on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Program shown in the editor when a session starts.
const EXAMPLE_PROGRAM: &str = "{
  let res = 0;
  for (j = 0 to 10) {
    res = res + j;
  }
}";

/// Parsing strategy the compiler service applies to the submitted code.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParserMode {
    /// Hand-written recursive descent parser.
    #[default]
    Recursive,
    /// Table-driven LR parser.
    Lr,
    /// Generalized LR parser.
    Glr,
}

impl ParserMode {
    /// Name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recursive => "Recursive",
            Self::Lr => "Lr",
            Self::Glr => "Glr",
        }
    }
}

impl fmt::Display for ParserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a parser mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown parser mode '{0}' (expected recursive, lr or glr)")]
pub struct UnknownParserMode(pub String);

impl FromStr for ParserMode {
    type Err = UnknownParserMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recursive" => Ok(Self::Recursive),
            "lr" => Ok(Self::Lr),
            "glr" => Ok(Self::Glr),
            _ => Err(UnknownParserMode(s.to_string())),
        }
    }
}

/// Body of a compile submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    /// Raw source text. Empty is a valid program.
    pub code: String,
    #[serde(rename = "parser")]
    pub parser_mode: ParserMode,
}

impl CompileRequest {
    pub fn new(code: impl Into<String>, parser_mode: ParserMode) -> Self {
        Self {
            code: code.into(),
            parser_mode,
        }
    }

    /// The draft a fresh session starts with.
    pub fn example() -> Self {
        Self::new(EXAMPLE_PROGRAM, ParserMode::default())
    }
}

impl Default for CompileRequest {
    fn default() -> Self {
        Self::example()
    }
}

/// Byte range in the submitted code. Always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTextSpan")]
pub struct TextSpan {
    start: usize,
    end: usize,
}

impl TextSpan {
    /// Build a span, rejecting inverted ranges.
    pub fn new(start: usize, end: usize) -> Result<Self, InvalidSpan> {
        if start > end {
            return Err(InvalidSpan { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("span start {start} is after end {end}")]
pub struct InvalidSpan {
    pub start: usize,
    pub end: usize,
}

/// Wire forms a span may arrive in: an explicit range, or start plus length
/// as the compiler service records it internally.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTextSpan {
    Range(RangeSpan),
    Sized(SizedSpan),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeSpan {
    start: usize,
    end: usize,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SizedSpan {
    start: usize,
    length: usize,
}

impl TryFrom<RawTextSpan> for TextSpan {
    type Error = InvalidSpan;

    fn try_from(raw: RawTextSpan) -> Result<Self, Self::Error> {
        match raw {
            RawTextSpan::Range(RangeSpan { start, end }) => TextSpan::new(start, end),
            RawTextSpan::Sized(SizedSpan { start, length }) => match start.checked_add(length) {
                Some(end) => TextSpan::new(start, end),
                None => Err(InvalidSpan {
                    start,
                    end: usize::MAX,
                }),
            },
        }
    }
}

/// Compilation phase a diagnostic refers to.
///
/// Values outside the known phases are kept verbatim so they can still be
/// displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TextPlace {
    Lexical,
    Syntax,
    Semantic,
    Other(String),
}

impl From<String> for TextPlace {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Lexical" => Self::Lexical,
            "Syntax" => Self::Syntax,
            "Semantic" => Self::Semantic,
            _ => Self::Other(value),
        }
    }
}

impl From<TextPlace> for String {
    fn from(place: TextPlace) -> Self {
        match place {
            TextPlace::Other(value) => value,
            known => known.to_string(),
        }
    }
}

impl fmt::Display for TextPlace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => write!(f, "Lexical"),
            Self::Syntax => write!(f, "Syntax"),
            Self::Semantic => write!(f, "Semantic"),
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextKind {
    Error,
    Warning,
    Info,
}

impl fmt::Display for TextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "Error"),
            Self::Warning => write!(f, "Warning"),
            Self::Info => write!(f, "Info"),
        }
    }
}

/// One message reported by the compiler service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Diagnostic {
    pub message: String,
    pub span: TextSpan,
    pub place: TextPlace,
    pub kind: TextKind,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: TextSpan, place: TextPlace, kind: TextKind) -> Self {
        Self {
            message: message.into(),
            span,
            place,
            kind,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == TextKind::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-Position:{}: {}",
            self.kind, self.place, self.span, self.message
        )
    }
}

/// A resolved symbol and the value the service computed for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolEntry {
    pub id: String,
    pub value: String,
}

impl SymbolEntry {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// Everything the service returns for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompileReport {
    pub diagnostics: Vec<Diagnostic>,
    pub symbol_table: Vec<SymbolEntry>,
    #[serde(rename = "seconds")]
    pub elapsed_seconds: f64,
}

impl CompileReport {
    /// The cleared report a session holds before and during a submission.
    pub fn empty() -> Self {
        Self {
            diagnostics: Vec::new(),
            symbol_table: Vec::new(),
            elapsed_seconds: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty() && self.symbol_table.is_empty()
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), InvalidReport> {
        if !self.elapsed_seconds.is_finite() || self.elapsed_seconds < 0.0 {
            return Err(InvalidReport::ElapsedSeconds(self.elapsed_seconds));
        }
        Ok(())
    }
}

impl Default for CompileReport {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidReport {
    #[error("elapsed seconds must be finite and non-negative, got {0}")]
    ElapsedSeconds(f64),
}
