//! Persistent source path → Notion page identity map.
//!
//! Stored as `.mkdocs2notion_ids.json` at the root of the docs tree:
//!
//! ```json
//! {
//!   "guide/intro.md": {
//!     "page_id": "0c1d...",
//!     "fingerprint": "5e88...",
//!     "synced_at": "2024-03-09T14:05:00Z"
//!   },
//!   "legacy.md": "9f2a..."
//! }
//! ```
//!
//! Entries written by older versions are bare id strings; they load as
//! records without a fingerprint, so the next push updates them once.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::sync::file::atomic_write;
use crate::sync::types::{SyncError, SyncResult};

pub const ID_MAP_FILE: &str = ".mkdocs2notion_ids.json";

/// What is known about one published document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub page_id: String,
    /// Fingerprint of the content last written to the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Page title last written, used when marking removed pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// RFC 3339 time of the last successful write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Legacy(String),
    Record(IdentityRecord),
}

impl From<StoredEntry> for IdentityRecord {
    fn from(entry: StoredEntry) -> Self {
        match entry {
            StoredEntry::Legacy(page_id) => Self {
                page_id,
                fingerprint: None,
                title: None,
                synced_at: None,
            },
            StoredEntry::Record(record) => record,
        }
    }
}

/// Normalize a source path to the forward-slash relative key form.
#[must_use]
pub fn normalize_key(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// The identity map for one docs tree.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    path: PathBuf,
    entries: BTreeMap<String, IdentityRecord>,
}

impl IdentityMap {
    /// Empty map that will be saved to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Map for a docs root, at `<root>/.mkdocs2notion_ids.json`.
    ///
    /// # Errors
    ///
    /// See [`IdentityMap::load`].
    pub fn for_docs_root(root: &Path, fresh: bool) -> SyncResult<Self> {
        Self::load(&root.join(ID_MAP_FILE), fresh)
    }

    /// Read the map once. With `fresh`, existing content is ignored (and
    /// overwritten on the next save) without touching the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON object of path → record entries.
    pub fn load(path: &Path, fresh: bool) -> SyncResult<Self> {
        let mut map = Self::new(path);
        if fresh {
            info!(path = %path.display(), "Fresh run, ignoring existing identity map");
            return Ok(map);
        }
        if !path.exists() {
            debug!(path = %path.display(), "No identity map yet");
            return Ok(map);
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(map);
        }
        let raw: BTreeMap<String, StoredEntry> =
            serde_json::from_str(&content).map_err(|e| SyncError::InvalidMap {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        map.entries = raw
            .into_iter()
            .map(|(key, entry)| (normalize_key(&key), entry.into()))
            .collect();
        debug!(entries = map.entries.len(), "Loaded identity map");
        Ok(map)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn lookup(&self, source_path: &str) -> Option<&IdentityRecord> {
        self.entries.get(&normalize_key(source_path))
    }

    /// Source path already published as `page_id`, if any.
    #[must_use]
    pub fn path_for_page(&self, page_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, record)| record.page_id == page_id)
            .map(|(key, _)| key.as_str())
    }

    /// Record the page for `source_path`, stamping the sync time.
    pub fn record(
        &mut self,
        source_path: &str,
        page_id: &str,
        title: &str,
        fingerprint: Option<String>,
    ) {
        self.entries.insert(
            normalize_key(source_path),
            IdentityRecord {
                page_id: page_id.to_string(),
                fingerprint,
                title: Some(title.to_string()),
                synced_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            },
        );
    }

    /// Drop the stored fingerprint so the next run rewrites the page.
    pub fn invalidate(&mut self, source_path: &str) {
        if let Some(record) = self.entries.get_mut(&normalize_key(source_path)) {
            record.fingerprint = None;
        }
    }

    pub fn remove(&mut self, source_path: &str) -> Option<IdentityRecord> {
        self.entries.remove(&normalize_key(source_path))
    }

    /// Mapped paths that are not part of `current`, in sorted order.
    #[must_use]
    pub fn stale_paths<'a>(&self, current: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let current: BTreeSet<String> = current.into_iter().map(normalize_key).collect();
        self.entries
            .keys()
            .filter(|key| !current.contains(*key))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist atomically as a sorted, pretty-printed object.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub fn save(&self) -> SyncResult<()> {
        let mut json = serde_json::to_string_pretty(&self.entries)?;
        json.push('\n');
        atomic_write(&self.path, &json)?;
        debug!(entries = self.entries.len(), path = %self.path.display(), "Saved identity map");
        Ok(())
    }
}
