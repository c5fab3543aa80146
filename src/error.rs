//! Error types for mkdocs2notion.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=source, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::notion::StoreError;
use crate::sync::SyncError;

/// Result type alias for mkdocs2notion operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Source (exit 2)
    SourceNotFound,
    NavError,
    YamlError,

    // Not Found (exit 3)
    ParentNotFound,

    // Validation (exit 4)
    InvalidArgument,
    StrictWarnings,

    // Remote (exit 6)
    RemoteError,
    Unauthorized,
    SyncFailed,

    // Config (exit 7)
    ConfigError,
    MissingToken,
    MissingParent,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::SourceNotFound => "SOURCE_NOT_FOUND",
            Self::NavError => "NAV_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::ParentNotFound => "PARENT_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::StrictWarnings => "STRICT_WARNINGS",
            Self::RemoteError => "REMOTE_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::SyncFailed => "SYNC_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::MissingToken => "MISSING_TOKEN",
            Self::MissingParent => "MISSING_PARENT",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::SourceNotFound | Self::NavError | Self::YamlError => 2,
            Self::ParentNotFound => 3,
            Self::InvalidArgument | Self::StrictWarnings => 4,
            Self::RemoteError | Self::Unauthorized | Self::SyncFailed => 6,
            Self::ConfigError | Self::MissingToken | Self::MissingParent => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether running the same command again may succeed.
    ///
    /// True for remote failures, since the identity map makes reruns
    /// resume where the last one stopped.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteError | Self::SyncFailed | Self::InvalidArgument)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in mkdocs2notion operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Invalid nav in {}: {message}", path.display())]
    Nav { path: PathBuf, message: String },

    #[error("Parent page not found: {id}")]
    ParentNotFound { id: String },

    #[error("Notion rejected the token: {0}")]
    Unauthorized(String),

    #[error("No Notion token configured")]
    MissingToken,

    #[error("No parent page configured")]
    MissingParent,

    #[error("{failed} of {total} documents failed to sync")]
    SyncFailed { failed: usize, total: usize },

    #[error("{count} warnings reported in strict mode")]
    StrictWarnings { count: usize },

    #[error("Notion error: {0}")]
    Remote(#[from] StoreError),

    #[error("Identity map error: {0}")]
    IdentityMap(#[from] SyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::SourceNotFound { .. } => ErrorCode::SourceNotFound,
            Self::Nav { .. } => ErrorCode::NavError,
            Self::Yaml(_) => ErrorCode::YamlError,
            Self::ParentNotFound { .. } => ErrorCode::ParentNotFound,
            Self::Unauthorized(_) | Self::Remote(StoreError::Unauthorized(_)) => {
                ErrorCode::Unauthorized
            }
            Self::Remote(_) => ErrorCode::RemoteError,
            Self::SyncFailed { .. } => ErrorCode::SyncFailed,
            Self::StrictWarnings { .. } => ErrorCode::StrictWarnings,
            Self::MissingToken => ErrorCode::MissingToken,
            Self::MissingParent => ErrorCode::MissingParent,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::IdentityMap(_) | Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::SourceNotFound { path } => Some(format!(
                "Pass a docs directory, a project root containing mkdocs.yml, or the \
                 mkdocs.yml itself (got {}).",
                path.display()
            )),

            Self::Nav { .. } => Some(
                "Each nav entry must be a path string, a {title: path} mapping, or a \
                 {title: [entries]} section."
                    .to_string(),
            ),

            Self::MissingToken => Some(
                "Set NOTION_TOKEN to an integration token, or add \"notion_token\" to \
                 ~/.mkdocs2notion/config.json"
                    .to_string(),
            ),

            Self::MissingParent => Some(
                "Pass --parent <page-id-or-url>, set NOTION_PARENT_PAGE_ID, or add \
                 \"parent_page_id\" to ~/.mkdocs2notion/config.json"
                    .to_string(),
            ),

            Self::ParentNotFound { id } => Some(format!(
                "Check that page or database {id} exists and is shared with your integration \
                 (page menu > Connections)."
            )),

            Self::Unauthorized(_) | Self::Remote(StoreError::Unauthorized(_)) => {
                Some(
                    "The token was rejected. Create a new integration token and update \
                     NOTION_TOKEN."
                        .to_string(),
                )
            }

            Self::SyncFailed { .. } => Some(
                "Fix the reported documents and push again; unchanged pages are skipped on rerun."
                    .to_string(),
            ),

            Self::StrictWarnings { .. } => {
                Some(
                    "Run `mkdocs2notion validate` to list the warnings, or drop --strict."
                        .to_string(),
                )
            }

            Self::Remote(err) if err.is_transient() => {
                Some(
                    "Notion is busy or unreachable. Try again later or lower \
                     MKDOCS2NOTION_RATE_LIMIT."
                        .to_string(),
                )
            }

            Self::IdentityMap(SyncError::InvalidMap { path, .. }) => Some(format!(
                "Fix or delete {path}; rerun with --fresh to republish everything as new pages."
            )),

            Self::Remote(_)
            | Self::IdentityMap(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
