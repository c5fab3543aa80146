//! Non-fatal diagnostics collected while parsing and publishing.
//!
//! Warnings are data, not log lines: the parser returns them alongside the
//! document, the engine aggregates them into the run report, and strict mode
//! decides at the end whether any of them fail the run.

use std::fmt;

use serde::Serialize;

/// Category of a warning, with a stable short code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A nav entry points at a file that does not exist.
    MissingPage,
    /// An image or link target could not be turned into a remote URL.
    UnresolvedLink,
    UnterminatedFence,
    MalformedCallout,
    MalformedTable,
    MalformedTab,
    NestingTooDeep,
    /// An indented list item was published at the top list level.
    FlattenedList,
    /// A source file could not be read.
    FileIo,
    /// Directory or nav layout problem (duplicate titles, empty sections).
    Structure,
}

impl WarningKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingPage => "W001",
            Self::UnresolvedLink => "W002",
            Self::UnterminatedFence => "W003",
            Self::MalformedTable => "W004",
            Self::FileIo => "W005",
            Self::MalformedCallout => "W006",
            Self::MalformedTab => "W007",
            Self::NestingTooDeep => "W008",
            Self::FlattenedList => "W009",
            Self::Structure => "W010",
        }
    }
}

/// A warning raised while parsing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub kind: WarningKind,
    /// 1-based line in the source file.
    pub line: usize,
    /// Element the warning concerns (`table`, `callout`, ...).
    pub element: &'static str,
    pub message: String,
}

impl ParseWarning {
    pub fn new(
        kind: WarningKind,
        line: usize,
        element: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            line,
            element,
            message: message.into(),
        }
    }
}

/// A warning attributed to a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceWarning {
    pub source_path: String,
    #[serde(flatten)]
    pub warning: ParseWarning,
}

impl SourceWarning {
    pub fn new(source_path: impl Into<String>, warning: ParseWarning) -> Self {
        Self {
            source_path: source_path.into(),
            warning,
        }
    }

    /// Warning for a whole file rather than a line within it.
    pub fn for_file(
        source_path: impl Into<String>,
        kind: WarningKind,
        element: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::new(source_path, ParseWarning::new(kind, 0, element, message))
    }
}

impl fmt::Display for SourceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = &self.warning;
        if w.line > 0 {
            write!(f, "{}:{} ", self.source_path, w.line)?;
        } else {
            write!(f, "{} ", self.source_path)?;
        }
        write!(f, "{} [{}] {}", w.kind.code(), w.element, w.message)
    }
}
