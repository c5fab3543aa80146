//! Sync engine: publishes a plan of documents to a [`RemoteStore`].
//!
//! Documents are processed one at a time, in plan order. Each one is parsed,
//! serialized and fingerprinted, then:
//!
//! - **new** (no identity entry): create the page under its parent, record
//!   and save the identity, then write the blocks
//! - **unchanged** (fingerprint matches): nothing is sent
//! - **changed**: update the title, save the identity without its
//!   fingerprint, delete the current blocks (nested pages and databases
//!   stay), then write the blocks
//!
//! Blocks are appended in batches of at most [`MAX_BATCH_SIZE`], each batch
//! after the previous batch's last block; children too deep for a single
//! request go under the id returned for their parent. Local images are
//! uploaded just before the batch that carries them. Every remote call
//! waits on the shared [`RateLimiter`] and runs under the [`RetryPolicy`].
//!
//! Removed documents are the mapped paths missing from the source tree, not
//! from the plan: a file left out of the MkDocs `nav` is unpublished but
//! keeps its page.
//!
//! [`MAX_BATCH_SIZE`]: crate::notion::MAX_BATCH_SIZE

use std::ffi::OsStr;
use std::fs;
use std::future::Future;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::loaders::directory::title_from_filename;
use crate::loaders::PublishItem;
use crate::markdown::{parse_markdown, SourceWarning, WarningKind};
use crate::notion::serializer::batches;
use crate::notion::{
    serialize_document, ChildBlock, Operation, Parent, ParentKind, RateLimiter, RemoteBlock,
    RemoteStore, RetryPolicy, SerializeOptions, StoreError, StoreResult,
};
use crate::sync::hash::{has_changed, page_fingerprint};
use crate::sync::id_map::IdentityMap;
use crate::sync::types::{
    DeletionPolicy, DocumentFailure, DocumentOutcome, DryRunReport, PlannedAction, PlannedChange,
    SyncError, SyncOptions, SyncReport, REMOVED_PREFIX,
};

/// A document parsed and serialized, ready to publish.
#[derive(Debug, Clone)]
pub struct PreparedPage {
    pub title: String,
    pub blocks: Vec<RemoteBlock>,
    pub fingerprint: String,
    pub warnings: Vec<SourceWarning>,
}

/// Parse, serialize and fingerprint one plan item.
#[must_use]
pub fn prepare(item: &PublishItem, options: &SerializeOptions) -> PreparedPage {
    let parsed = parse_markdown(&item.text, &item.source_path);
    debug!(
        path = %item.source_path,
        blocks = parsed.document.block_count(),
        "Parsed document"
    );
    let title = item.resolve_title(&parsed);
    let serialized = serialize_document(&parsed.document, options);
    let fingerprint = page_fingerprint(&title, &serialized.blocks);
    let warnings = parsed
        .warnings
        .into_iter()
        .chain(serialized.warnings)
        .map(|warning| SourceWarning::new(&item.source_path, warning))
        .collect();

    PreparedPage {
        title,
        blocks: serialized.blocks,
        fingerprint,
        warnings,
    }
}

fn unreadable_warning(path: &str, error: &str) -> SourceWarning {
    let message = format!("unreadable file: {error}");
    SourceWarning::for_file(path, WarningKind::FileIo, "document", message)
}

/// What a push would do, computed locally with no remote calls.
///
/// `sources` lists every Markdown file in the tree; mapped paths missing
/// from it are planned for removal.
#[must_use]
pub fn plan_changes(
    plan: &[PublishItem],
    sources: &[&str],
    ids: &IdentityMap,
    options: &SyncOptions,
) -> DryRunReport {
    let mut report = DryRunReport::default();

    for item in plan {
        let path = item.source_path.as_str();
        if let Some(error) = &item.read_error {
            report.warnings.push(unreadable_warning(path, error));
            report.changes.push(PlannedChange {
                path: path.to_string(),
                title: item.nav_title.clone().unwrap_or_else(|| title_from_filename(path)),
                action: PlannedAction::Skip,
                parent_path: item.parent_path.clone(),
            });
            continue;
        }

        let page = prepare(item, &options.serialize);
        let action = match ids.lookup(path) {
            None => PlannedAction::Create,
            Some(record) if has_changed(&page.fingerprint, record.fingerprint.as_deref()) => {
                PlannedAction::Update
            }
            Some(_) => PlannedAction::Unchanged,
        };
        report.warnings.extend(page.warnings);
        report.changes.push(PlannedChange {
            path: path.to_string(),
            title: page.title,
            action,
            parent_path: item.parent_path.clone(),
        });
    }

    if !sources.is_empty() {
        let action = match options.deletion_policy {
            DeletionPolicy::Archive => PlannedAction::Archive,
            DeletionPolicy::Mark => PlannedAction::Mark,
            DeletionPolicy::Keep => PlannedAction::Keep,
        };
        for path in ids.stale_paths(sources.iter().copied()) {
            let title = ids
                .lookup(&path)
                .and_then(|record| record.title.clone())
                .unwrap_or_else(|| title_from_filename(&path));
            report.changes.push(PlannedChange {
                path,
                title,
                action,
                parent_path: None,
            });
        }
    }

    report
}

/// Why a single document stopped.
#[derive(Debug)]
enum DocError {
    /// Abort the whole run.
    Fatal(Error),
    Failed { operation: String, message: String },
}

impl DocError {
    fn from_store(operation: Operation, error: StoreError) -> Self {
        if error.is_fatal() {
            return Self::Fatal(abort(error));
        }
        Self::Failed {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<SyncError> for DocError {
    fn from(error: SyncError) -> Self {
        Self::Fatal(error.into())
    }
}

/// Run-level error for a store error that ends the run.
fn abort(error: StoreError) -> Error {
    match error {
        StoreError::Unauthorized(message) => Error::Unauthorized(message),
        other => Error::Remote(other),
    }
}

/// Result of rewriting a mapped page.
enum PageUpdate {
    Written,
    /// The mapped page no longer exists remotely.
    Missing,
}

/// Publishes documents through a remote store.
pub struct SyncEngine<'a, S: RemoteStore> {
    store: &'a S,
    limiter: &'a RateLimiter,
    retry: &'a RetryPolicy,
    options: &'a SyncOptions,
}

impl<'a, S: RemoteStore> SyncEngine<'a, S> {
    pub fn new(
        store: &'a S,
        limiter: &'a RateLimiter,
        retry: &'a RetryPolicy,
        options: &'a SyncOptions,
    ) -> Self {
        Self {
            store,
            limiter,
            retry,
            options,
        }
    }

    async fn call<T, F, Fut>(&self, operation: Operation, call: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        self.retry.run(self.limiter, operation, call).await
    }

    async fn attempt<T, F, Fut>(
        &self,
        operation: Operation,
        call: F,
    ) -> std::result::Result<T, DocError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        self.call(operation, call)
            .await
            .map_err(|error| DocError::from_store(operation, error))
    }

    /// Publish `plan` under the page or database `parent_id`, then apply the
    /// deletion policy to mapped paths missing from `sources`.
    ///
    /// Per-document failures are collected in the report and the run goes
    /// on. The identity map is saved after every page creation, before every
    /// page rewrite and once at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent cannot be resolved, the token is
    /// rejected, or the identity map cannot be saved.
    pub async fn run(
        &self,
        parent_id: &str,
        plan: &[PublishItem],
        sources: &[&str],
        ids: &mut IdentityMap,
    ) -> Result<SyncReport> {
        let root = self.resolve_root(parent_id).await?;
        info!(
            parent = %root.id,
            kind = root.kind.as_str(),
            documents = plan.len(),
            "Starting sync"
        );

        let mut report = SyncReport::default();
        for item in plan {
            match self.sync_document(&root, item, ids, &mut report).await {
                Ok(outcome) => report.record(&item.source_path, outcome),
                Err(DocError::Failed { operation, message }) => {
                    warn!(
                        path = %item.source_path,
                        %operation,
                        error = %message,
                        "Document failed"
                    );
                    report.failed.push(DocumentFailure {
                        path: item.source_path.clone(),
                        operation,
                        error: message,
                    });
                }
                Err(DocError::Fatal(error)) => {
                    if let Err(save_error) = ids.save() {
                        warn!(error = %save_error, "Could not save identity map");
                    }
                    return Err(error);
                }
            }
        }

        if sources.is_empty() {
            info!("Source tree is empty, skipping reconciliation");
        } else {
            self.reconcile(sources, ids, &mut report).await?;
        }

        ids.save()?;
        let stats = report.stats();
        info!(
            created = stats.created,
            updated = stats.updated,
            unchanged = stats.unchanged,
            deleted = stats.deleted,
            failed = stats.failed,
            "Sync finished"
        );
        Ok(report)
    }

    /// Resolve `parent_id` as a page, then as a database.
    async fn resolve_root(&self, parent_id: &str) -> Result<Parent> {
        let store = self.store;
        for kind in [ParentKind::Page, ParentKind::Database] {
            let lookup = self
                .call(Operation::RetrieveParent, move || store.retrieve_parent(parent_id, kind))
                .await;
            match lookup {
                Ok(parent) => return Ok(parent),
                Err(StoreError::NotFound(_)) => {
                    debug!(parent_id, kind = kind.as_str(), "Parent is not of this kind");
                }
                Err(error) if error.is_fatal() => return Err(abort(error)),
                Err(StoreError::Rejected { .. }) => break,
                Err(other) => return Err(Error::Remote(other)),
            }
        }
        Err(Error::ParentNotFound {
            id: parent_id.to_string(),
        })
    }

    async fn sync_document(
        &self,
        root: &Parent,
        item: &PublishItem,
        ids: &mut IdentityMap,
        report: &mut SyncReport,
    ) -> std::result::Result<DocumentOutcome, DocError> {
        let path = item.source_path.as_str();
        if let Some(error) = &item.read_error {
            report.warnings.push(unreadable_warning(path, error));
            return Err(DocError::Failed {
                operation: "read_document".to_string(),
                message: error.clone(),
            });
        }

        let page = prepare(item, &self.options.serialize);
        report.warnings.extend(page.warnings.iter().cloned());

        if let Some(record) = ids.lookup(path).cloned() {
            if !has_changed(&page.fingerprint, record.fingerprint.as_deref()) {
                debug!(path, "Unchanged");
                return Ok(DocumentOutcome::Unchanged);
            }
            match self.update_page(&record.page_id, path, &page, ids).await? {
                PageUpdate::Written => return Ok(DocumentOutcome::Updated),
                PageUpdate::Missing => {
                    let page_id = record.page_id.as_str();
                    warn!(path, page_id, "Mapped page no longer exists, recreating");
                    ids.remove(path);
                }
            }
        }

        let parent = parent_for(root, item, ids)?;
        self.create_page(&parent, path, &page, ids).await?;
        Ok(DocumentOutcome::Created)
    }

    async fn update_page(
        &self,
        page_id: &str,
        path: &str,
        page: &PreparedPage,
        ids: &mut IdentityMap,
    ) -> std::result::Result<PageUpdate, DocError> {
        let store = self.store;
        let title = page.title.as_str();
        match self
            .call(Operation::UpdatePageTitle, move || store.update_page_title(page_id, title))
            .await
        {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => return Ok(PageUpdate::Missing),
            Err(error) => return Err(DocError::from_store(Operation::UpdatePageTitle, error)),
        }

        // Until the new blocks are all written the page must not look
        // current, on disk included.
        ids.invalidate(path);
        ids.save()?;
        let removed = self.clear_page(page_id).await?;
        debug!(path, removed, "Cleared page content");
        self.write_blocks(page_id, &page.blocks).await?;
        ids.record(path, page_id, &page.title, Some(page.fingerprint.clone()));
        info!(path, page_id, "Updated page");
        Ok(PageUpdate::Written)
    }

    async fn create_page(
        &self,
        parent: &Parent,
        path: &str,
        page: &PreparedPage,
        ids: &mut IdentityMap,
    ) -> std::result::Result<(), DocError> {
        let page_id = self.create_deduplicated(parent, &page.title, ids).await?;
        ids.record(path, &page_id, &page.title, None);
        ids.save()?;
        info!(path, page_id = %page_id, "Created page");

        self.write_blocks(&page_id, &page.blocks).await?;
        ids.record(path, &page_id, &page.title, Some(page.fingerprint.clone()));
        Ok(())
    }

    /// Create a page, retrying a transient failure only after a lookup under
    /// the parent shows the failed attempt did not create it anyway.
    ///
    /// Database children cannot be listed as blocks, so a transient failure
    /// under a database parent is not retried.
    async fn create_deduplicated(
        &self,
        parent: &Parent,
        title: &str,
        ids: &IdentityMap,
    ) -> std::result::Result<String, DocError> {
        let mut attempt = 1;
        loop {
            self.limiter.acquire().await;
            let error = match self.store.create_page(parent, title).await {
                Ok(page_id) => return Ok(page_id),
                Err(error) => error,
            };
            if !self.retry.should_retry(attempt, &error) {
                return Err(DocError::from_store(Operation::CreatePage, error));
            }
            if parent.kind == ParentKind::Database {
                warn!(title, error = %error, "Page creation in a database failed, not retrying");
                return Err(DocError::from_store(Operation::CreatePage, error));
            }

            let delay = self.retry.delay_for(attempt, &error);
            warn!(
                title,
                attempt,
                ?delay,
                error = %error,
                "Page creation failed, checking for a partial create"
            );
            tokio::time::sleep(delay).await;

            if let Some(existing) = self.find_child_page(parent, title, ids).await? {
                info!(title, page_id = %existing, "Adopting page left by the failed attempt");
                return Ok(existing);
            }
            attempt += 1;
        }
    }

    /// Unmapped child page of `parent` titled `title`.
    async fn find_child_page(
        &self,
        parent: &Parent,
        title: &str,
        ids: &IdentityMap,
    ) -> std::result::Result<Option<String>, DocError> {
        let children = self.list_children(&parent.id).await?;
        Ok(children
            .into_iter()
            .filter(|child| child.kind == "child_page" && child.title.as_deref() == Some(title))
            .find(|child| match ids.path_for_page(&child.id) {
                Some(owner) => {
                    debug!(title, page_id = %child.id, owner, "Title match is another document");
                    false
                }
                None => true,
            })
            .map(|child| child.id))
    }

    /// Every child of `block_id`, following pagination cursors.
    async fn list_children(
        &self,
        block_id: &str,
    ) -> std::result::Result<Vec<ChildBlock>, DocError> {
        let store = self.store;
        let mut children = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let current = cursor.as_deref();
            let page = self
                .attempt(Operation::ListBlockChildren, move || {
                    store.list_block_children(block_id, current)
                })
                .await?;
            children.extend(page.results);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(children),
            }
        }
    }

    /// Delete the page's blocks, keeping nested pages and databases.
    async fn clear_page(&self, page_id: &str) -> std::result::Result<usize, DocError> {
        let children = self.list_children(page_id).await?;
        let store = self.store;
        let mut removed = 0;
        for child in children.iter().filter(|child| !child.is_subpage()) {
            let block_id = child.id.as_str();
            match self.call(Operation::DeleteBlock, move || store.delete_block(block_id)).await {
                Ok(()) | Err(StoreError::NotFound(_)) => removed += 1,
                Err(error) => return Err(DocError::from_store(Operation::DeleteBlock, error)),
            }
        }
        Ok(removed)
    }

    /// Upload a local image, returning the upload id.
    async fn upload_image(&self, path: &Path) -> std::result::Result<String, DocError> {
        let bytes = fs::read(path).map_err(|e| DocError::Failed {
            operation: "read_image".to_string(),
            message: format!("{}: {e}", path.display()),
        })?;
        let filename = path.file_name().and_then(OsStr::to_str).unwrap_or("image");
        let content_type = image_content_type(path);
        let store = self.store;

        let upload_id = self
            .attempt(Operation::CreateFileUpload, move || {
                store.create_file_upload(filename, content_type)
            })
            .await?;
        let id = upload_id.as_str();
        let bytes = bytes.as_slice();
        self.attempt(Operation::SendFileUpload, move || {
            store.send_file_upload(id, filename, content_type, bytes)
        })
        .await?;
        debug!(path = %path.display(), upload_id = %upload_id, "Uploaded image");
        Ok(upload_id)
    }

    async fn write_blocks(
        &self,
        parent_id: &str,
        blocks: &[RemoteBlock],
    ) -> std::result::Result<(), DocError> {
        let store = self.store;
        let mut after: Option<String> = None;
        for batch in batches(blocks) {
            let mut payloads: Vec<Value> = Vec::with_capacity(batch.len());
            for block in batch {
                let Some(path) = &block.upload else {
                    payloads.push(block.payload.clone());
                    continue;
                };
                let upload_id = self.upload_image(path).await?;
                let mut block = block.clone();
                block.attach_upload(&upload_id);
                payloads.push(block.payload);
            }

            let payloads = payloads.as_slice();
            let cursor = after.as_deref();
            let created = self
                .attempt(Operation::AppendBlocks, move || {
                    store.append_blocks(parent_id, payloads, cursor)
                })
                .await?;
            if created.len() != batch.len() {
                return Err(DocError::Failed {
                    operation: Operation::AppendBlocks.to_string(),
                    message: format!("sent {} blocks, got {} ids back", batch.len(), created.len()),
                });
            }

            for (block, block_id) in batch.iter().zip(&created) {
                if !block.children.is_empty() {
                    Box::pin(self.write_blocks(block_id, &block.children)).await?;
                }
            }
            after = created.last().cloned();
        }
        Ok(())
    }

    /// Apply the deletion policy to mapped paths missing from `sources`.
    async fn reconcile(
        &self,
        sources: &[&str],
        ids: &mut IdentityMap,
        report: &mut SyncReport,
    ) -> Result<()> {
        let stale = ids.stale_paths(sources.iter().copied());
        let policy = self.options.deletion_policy;
        let store = self.store;

        for path in stale {
            let Some(record) = ids.lookup(&path).cloned() else {
                continue;
            };
            let page_id = record.page_id.as_str();
            let (operation, result) = match policy {
                DeletionPolicy::Keep => {
                    debug!(path = %path, "Keeping page for removed document");
                    continue;
                }
                DeletionPolicy::Archive => (
                    Operation::DeletePage,
                    self.call(Operation::DeletePage, move || store.delete_page(page_id))
                        .await,
                ),
                DeletionPolicy::Mark => {
                    let title = format!(
                        "{REMOVED_PREFIX}{}",
                        record.title.clone().unwrap_or_else(|| title_from_filename(&path))
                    );
                    let title = title.as_str();
                    (
                        Operation::UpdatePageTitle,
                        self.call(Operation::UpdatePageTitle, move || {
                            store.update_page_title(page_id, title)
                        })
                        .await,
                    )
                }
            };

            match result {
                Ok(()) | Err(StoreError::NotFound(_)) => {
                    info!(path = %path, page_id, %policy, "Removed page for deleted document");
                    ids.remove(&path);
                    report.deleted.push(path);
                }
                Err(error) if error.is_fatal() => return Err(abort(error)),
                Err(error) => {
                    warn!(path = %path, %operation, error = %error, "Could not remove page");
                    report.failed.push(DocumentFailure {
                        path,
                        operation: operation.to_string(),
                        error: error.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Content type sent with an uploaded image, from its extension.
fn image_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Root parent, or the page published for the item's nav parent.
fn parent_for(
    root: &Parent,
    item: &PublishItem,
    ids: &IdentityMap,
) -> std::result::Result<Parent, DocError> {
    let Some(parent_path) = &item.parent_path else {
        return Ok(root.clone());
    };
    ids.lookup(parent_path)
        .map(|record| Parent::page(record.page_id.clone()))
        .ok_or_else(|| DocError::Failed {
            operation: "resolve_parent".to_string(),
            message: format!("parent page {parent_path} has not been published"),
        })
}
