//! Structured error reporting for script runs.
//!
//! All errors format to stderr as:
//! ```text
//! session.dtb:10:5: error: message
//! ```

use std::fmt;
use std::path::PathBuf;

use dtb_emulator::FaultCode;

use crate::parser::ParseError;

/// A source location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    /// Script path.
    pub file: PathBuf,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number (1 if unknown).
    pub column: usize,
}

impl SourceLoc {
    /// Creates a new source location.
    #[must_use]
    pub const fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }

    /// Formats the location as `file:line:column`.
    #[must_use]
    pub fn format_location(&self) -> String {
        format!("{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// What went wrong while running a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptErrorKind {
    /// The script file could not be read.
    Io(String),
    /// A line failed to parse.
    Parse(ParseError),
    /// A board call returned a fault.
    Fault(FaultCode),
    /// An `expect_*` command did not hold.
    ExpectationFailed {
        /// What was asserted.
        what: String,
        /// Expected value.
        expected: u64,
        /// Observed value.
        actual: u64,
    },
}

impl fmt::Display for ScriptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(message) => write!(f, "{message}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Fault(code) => write!(f, "fault 0x{:02X}: {code}", code.as_u8()),
            Self::ExpectationFailed {
                what,
                expected,
                actual,
            } => write!(f, "expectation failed: {what} expected {expected}, got {actual}"),
        }
    }
}

/// A script error with an optional location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// Error kind.
    pub kind: ScriptErrorKind,
    /// Where it happened, when known.
    pub location: Option<SourceLoc>,
}

impl ScriptError {
    /// Creates an error without a location.
    #[must_use]
    pub const fn new(kind: ScriptErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    /// Attaches a location.
    #[must_use]
    pub fn at(mut self, location: SourceLoc) -> Self {
        self.location = Some(location);
        self
    }

    /// Formats the error for stderr output.
    #[must_use]
    pub fn format_for_stderr(&self) -> String {
        self.location.as_ref().map_or_else(
            || format!("error: {}", self.kind),
            |loc| format!("{}: error: {}", loc.format_location(), self.kind),
        )
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}", loc.format_location(), self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<ParseError> for ScriptError {
    fn from(e: ParseError) -> Self {
        Self {
            location: Some(SourceLoc {
                file: PathBuf::new(),
                line: e.location.line,
                column: e.location.column,
            }),
            kind: ScriptErrorKind::Parse(e),
        }
    }
}

impl From<FaultCode> for ScriptError {
    fn from(code: FaultCode) -> Self {
        Self::new(ScriptErrorKind::Fault(code))
    }
}
