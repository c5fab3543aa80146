//! Remote page store interface.
//!
//! [`RemoteStore`] is the seam between the sync engine and Notion. The HTTP
//! implementation lives in [`super::client`]; tests use an in-memory store.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Result type for remote calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// What kind of object a parent id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    Page,
    Database,
}

/// A resolved location new pages can be created under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub id: String,
    pub kind: ParentKind,
}

impl ParentKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Database => "database",
        }
    }
}

impl Parent {
    pub fn page(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ParentKind::Page,
        }
    }
}

/// A block listed under a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildBlock {
    pub id: String,
    /// Notion block type (`paragraph`, `child_page`, ...).
    pub kind: String,
    /// Title, for `child_page` and `child_database` blocks.
    pub title: Option<String>,
}

impl ChildBlock {
    /// Whether this block is a nested page or database.
    #[must_use]
    pub fn is_subpage(&self) -> bool {
        matches!(self.kind.as_str(), "child_page" | "child_database")
    }
}

/// One page of a paginated children listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenPage {
    pub results: Vec<ChildBlock>,
    pub next_cursor: Option<String>,
}

/// Remote operation names, for logs and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    RetrieveParent,
    CreatePage,
    UpdatePageTitle,
    AppendBlocks,
    ListBlockChildren,
    DeleteBlock,
    DeletePage,
    CreateFileUpload,
    SendFileUpload,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RetrieveParent => "retrieve_parent",
            Self::CreatePage => "create_page",
            Self::UpdatePageTitle => "update_page_title",
            Self::AppendBlocks => "append_blocks",
            Self::ListBlockChildren => "list_block_children",
            Self::DeleteBlock => "delete_block",
            Self::DeletePage => "delete_page",
            Self::CreateFileUpload => "create_file_upload",
            Self::SendFileUpload => "send_file_upload",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from remote calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("conflicting edit: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Classify an HTTP error response.
    #[must_use]
    pub fn from_status(
        status: u16,
        code: &str,
        message: String,
        retry_after: Option<Duration>,
    ) -> Self {
        match status {
            401 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            429 => Self::RateLimited { retry_after },
            500..=599 => Self::Server { status, message },
            _ => Self::Rejected {
                status,
                code: code.to_string(),
                message,
            },
        }
    }

    /// Worth retrying: timeouts, rate limits, conflicts, server errors.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::RateLimited { .. }
                | Self::Server { .. }
                | Self::Conflict(_)
        )
    }

    /// Aborts the whole run rather than one document.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Server-requested wait before the next attempt.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Operations the sync engine needs from the remote page store.
///
/// Implementations must be safe to share; the engine holds one store for
/// the whole run.
pub trait RemoteStore: Send + Sync {
    /// Look up a parent of the given kind by id. `NotFound` when no object
    /// of that kind exists or the integration cannot see it.
    fn retrieve_parent(
        &self,
        id: &str,
        kind: ParentKind,
    ) -> impl Future<Output = StoreResult<Parent>> + Send;

    /// Create an empty page titled `title` under `parent`, returning its id.
    fn create_page(
        &self,
        parent: &Parent,
        title: &str,
    ) -> impl Future<Output = StoreResult<String>> + Send;

    fn update_page_title(
        &self,
        page_id: &str,
        title: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Append block payloads under `block_id`, after the block `after` when
    /// given. Returns the ids of the created blocks in order.
    fn append_blocks(
        &self,
        block_id: &str,
        batch: &[Value],
        after: Option<&str>,
    ) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    /// One page of the children of `block_id`.
    fn list_block_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> impl Future<Output = StoreResult<ChildrenPage>> + Send;

    fn delete_block(&self, block_id: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Archive a page.
    fn delete_page(&self, page_id: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Start a file upload, returning the upload id image blocks refer to.
    fn create_file_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> impl Future<Output = StoreResult<String>> + Send;

    /// Send the contents of a started upload.
    fn send_file_upload(
        &self,
        upload_id: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let classify = |status, code| StoreError::from_status(status, code, "msg".into(), None);
        assert!(classify(500, "internal_server_error").is_transient());
        assert!(classify(503, "service_unavailable").is_transient());
        assert!(classify(409, "conflict_error").is_transient());
        assert!(classify(401, "unauthorized").is_fatal());

        let rejected = StoreError::from_status(400, "validation_error", "bad body".into(), None);
        assert!(!rejected.is_transient());
        assert!(!rejected.is_fatal());

        let missing = StoreError::from_status(404, "object_not_found", "gone".into(), None);
        assert!(matches!(missing, StoreError::NotFound(_)));
        assert!(!missing.is_transient());
    }

    #[test]
    fn test_rate_limit_carries_retry_after() {
        let wait = Some(Duration::from_secs(2));
        let err = StoreError::from_status(429, "rate_limited", String::new(), wait);
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_subpage_detection() {
        let block = ChildBlock {
            id: "b1".into(),
            kind: "child_page".into(),
            title: Some("Guide".into()),
        };
        assert!(block.is_subpage());
        assert_eq!(Operation::AppendBlocks.to_string(), "append_blocks");
        assert_eq!(Operation::SendFileUpload.to_string(), "send_file_upload");
        assert_eq!(ParentKind::Database.as_str(), "database");
    }
}
