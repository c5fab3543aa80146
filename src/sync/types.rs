//! Sync types: options, per-run report and identity-map errors.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::markdown::SourceWarning;
use crate::notion::SerializeOptions;

/// What to do with pages whose source file disappeared.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionPolicy {
    /// Archive the page and forget it.
    #[default]
    Archive,
    /// Prefix the page title with `[removed] ` and forget it.
    Mark,
    /// Leave the page and its identity entry alone.
    Keep,
}

impl std::fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::Mark => write!(f, "mark"),
            Self::Keep => write!(f, "keep"),
        }
    }
}

/// Title prefix applied by [`DeletionPolicy::Mark`].
pub const REMOVED_PREFIX: &str = "[removed] ";

/// Knobs for one sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Any warning fails the run (evaluated once, at the end).
    pub strict: bool,
    pub deletion_policy: DeletionPolicy,
    pub serialize: SerializeOptions,
}

/// How one document ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOutcome {
    Created,
    Updated,
    Unchanged,
}

/// A document that could not be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub path: String,
    /// The step that failed (`create_page`, `append_blocks`, `read_document`, ...).
    pub operation: String,
    pub error: String,
}

/// Aggregate result of a push.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<DocumentFailure>,
    pub warnings: Vec<SourceWarning>,
}

impl SyncReport {
    pub fn record(&mut self, path: &str, outcome: DocumentOutcome) {
        let bucket = match outcome {
            DocumentOutcome::Created => &mut self.created,
            DocumentOutcome::Updated => &mut self.updated,
            DocumentOutcome::Unchanged => &mut self.unchanged,
        };
        bucket.push(path.to_string());
    }

    /// Number of documents the run looked at.
    #[must_use]
    pub fn total(&self) -> usize {
        self.created.len() + self.updated.len() + self.unchanged.len() + self.failed.len()
    }

    #[must_use]
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            created: self.created.len(),
            updated: self.updated.len(),
            unchanged: self.unchanged.len(),
            deleted: self.deleted.len(),
            failed: self.failed.len(),
            warnings: self.warnings.len(),
        }
    }

    /// Final verdict: failed documents, then strict-mode warnings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SyncFailed`] if any document failed, or
    /// [`Error::StrictWarnings`] if `strict` and any warning was raised.
    pub fn outcome(&self, strict: bool) -> Result<()> {
        if !self.failed.is_empty() {
            return Err(Error::SyncFailed {
                failed: self.failed.len(),
                total: self.total(),
            });
        }
        if strict && !self.warnings.is_empty() {
            return Err(Error::StrictWarnings {
                count: self.warnings.len(),
            });
        }
        Ok(())
    }
}

/// Counts for summary output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub failed: usize,
    pub warnings: usize,
}

/// What a push would do to one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    Create,
    Update,
    Unchanged,
    Archive,
    Mark,
    Keep,
    /// The source file cannot be read.
    Skip,
}

impl PlannedAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Unchanged => "unchanged",
            Self::Archive => "archive",
            Self::Mark => "mark",
            Self::Keep => "keep",
            Self::Skip => "skip",
        }
    }
}

/// One line of a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    pub path: String,
    pub title: String,
    pub action: PlannedAction,
    /// Source path of the page this one is nested under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
}

/// Dry-run result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DryRunReport {
    pub changes: Vec<PlannedChange>,
    pub warnings: Vec<SourceWarning>,
}

impl DryRunReport {
    #[must_use]
    pub fn count(&self, action: PlannedAction) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }
}

/// Identity-map file errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The map file exists but is not a path → record object.
    #[error("Invalid identity map {path}: {message}")]
    InvalidMap { path: String, message: String },
}

/// Result type for identity-map operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
