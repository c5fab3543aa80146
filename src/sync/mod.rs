//! Incremental publishing to Notion.
//!
//! - **Identity map**: source path → page id, persisted next to the docs
//! - **Hashing**: SHA256 fingerprints of the serialized page for change detection
//! - **Engine**: create / update / skip per document, then reconcile removals
//! - **Files**: atomic writes for the map and timestamped warning logs
//!
//! # Identity map
//!
//! `<docs>/.mkdocs2notion_ids.json` maps each published source path to its
//! page and the fingerprint last written there. A rerun over an unchanged
//! tree makes no remote writes; a changed document is rewritten in place so
//! its page id (and every link to it) stays stable.
//!
//! # Example
//!
//! ```ignore
//! use m2n::sync::{IdentityMap, SyncEngine, SyncOptions};
//!
//! let mut ids = IdentityMap::for_docs_root(&project.docs_path, false)?;
//! let engine = SyncEngine::new(&client, &limiter, &retry, &options);
//! let report = engine.run(parent_id, &plan, &mut ids).await?;
//! report.outcome(options.strict)?;
//! ```

mod engine;
mod file;
mod hash;
mod id_map;
mod types;

pub use engine::{plan_changes, prepare, PreparedPage, SyncEngine};
pub use file::{atomic_write, warning_log_path, write_warning_log};
pub use hash::{content_hash, has_changed, page_fingerprint};
pub use id_map::{normalize_key, IdentityMap, IdentityRecord, ID_MAP_FILE};
pub use types::{
    DeletionPolicy, DocumentFailure, DocumentOutcome, DryRunReport, PlannedAction, PlannedChange,
    SyncError, SyncOptions, SyncReport, SyncResult, SyncStats, REMOVED_PREFIX,
};
