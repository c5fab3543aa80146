//! Content fingerprints for change detection.
//!
//! A page's fingerprint is the SHA256 of the JSON it would be published as
//! (title plus serialized blocks). Equal fingerprints mean a rerun can skip
//! the page without any remote call.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::notion::RemoteBlock;

/// Compute a SHA256 hash of a serializable value.
///
/// Returns `None` only if the value cannot be serialized to JSON, which
/// does not happen for the payload types used here.
#[must_use]
pub fn content_hash<T: Serialize>(value: &T) -> Option<String> {
    let json = serde_json::to_vec(value).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Some(format!("{:x}", hasher.finalize()))
}

#[derive(Serialize)]
struct PublishedShape<'a> {
    title: &'a str,
    blocks: Vec<Value>,
}

fn shape(block: &RemoteBlock) -> Value {
    let mut value = block.payload.clone();
    if !block.children.is_empty() {
        value["children"] = Value::Array(block.children.iter().map(shape).collect());
    }
    value
}

/// Fingerprint of a page as it would be published.
#[must_use]
pub fn page_fingerprint(title: &str, blocks: &[RemoteBlock]) -> String {
    let published = PublishedShape {
        title,
        blocks: blocks.iter().map(shape).collect(),
    };
    content_hash(&published).unwrap_or_default()
}

/// Check if a page has changed since it was last synced.
///
/// Returns `true` if:
/// - There is no stored fingerprint (never synced, or a legacy entry)
/// - The current fingerprint differs from the stored one
#[must_use]
pub fn has_changed(current: &str, stored: Option<&str>) -> bool {
    stored.is_none_or(|s| s != current)
}
