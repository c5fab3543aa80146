//! In-memory [`RemoteStore`] for tests.
//!
//! Keeps a tiny page/block tree, records every call with its timestamp and
//! lets tests script failures per operation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::time::Instant;

use super::store::{
    ChildBlock, ChildrenPage, Operation, Parent, ParentKind, RemoteStore, StoreError, StoreResult,
};

/// A scripted failure for the next call of an operation.
#[derive(Debug, Clone)]
pub struct Failure {
    pub operation: Operation,
    pub error: StoreError,
    /// Apply the call's effect before failing (a lost response).
    pub after_effect: bool,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: String,
    pub title: Option<String>,
    pub payload: Value,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub archived: bool,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<String, Node>,
    next_id: usize,
    calls: Vec<(Operation, Instant)>,
    failures: VecDeque<Failure>,
    /// Upload id to filename and sent bytes.
    uploads: HashMap<String, (String, Option<Vec<u8>>)>,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    page_size: usize,
}

impl MemoryStore {
    /// Store containing one root page with id `root`.
    pub fn with_root(root: &str) -> Self {
        Self::with_top_level(root, "page")
    }

    /// Store containing one database with id `root`.
    pub fn with_database(root: &str) -> Self {
        Self::with_top_level(root, "database")
    }

    fn with_top_level(root: &str, kind: &str) -> Self {
        let mut state = State::default();
        state.nodes.insert(
            root.to_string(),
            Node {
                kind: kind.into(),
                title: Some("Root".into()),
                payload: Value::Null,
                parent: None,
                children: Vec::new(),
                archived: false,
            },
        );
        Self {
            state: Mutex::new(state),
            page_size: 100,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_next(&self, operation: Operation, error: StoreError) {
        self.lock().failures.push_back(Failure {
            operation,
            error,
            after_effect: false,
        });
    }

    pub fn fail_next_after_effect(&self, operation: Operation, error: StoreError) {
        self.lock().failures.push_back(Failure {
            operation,
            error,
            after_effect: true,
        });
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.lock().calls.iter().filter(|(op, _)| *op == operation).count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.lock().calls.iter().map(|(_, at)| *at).collect()
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.lock().nodes.get(id).cloned()
    }

    /// Block types of the live children of `id`, in order.
    pub fn child_kinds(&self, id: &str) -> Vec<String> {
        let state = self.lock();
        state
            .nodes
            .get(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| state.nodes.get(child))
                    .map(|child| child.kind.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Live pages (not archived) other than the root.
    pub fn live_pages(&self) -> Vec<(String, String)> {
        let state = self.lock();
        let mut pages: Vec<_> = state
            .nodes
            .iter()
            .filter(|(_, n)| n.kind == "child_page" && !n.archived)
            .map(|(id, n)| (id.clone(), n.title.clone().unwrap_or_default()))
            .collect();
        pages.sort();
        pages
    }

    /// Filename and sent bytes of an upload.
    pub fn upload(&self, id: &str) -> Option<(String, Option<Vec<u8>>)> {
        self.lock().uploads.get(id).cloned()
    }

    /// Record the call and pop a scripted failure for it, if any.
    fn begin(&self, operation: Operation) -> Option<Failure> {
        let mut state = self.lock();
        state.calls.push((operation, Instant::now()));
        let position = state.failures.iter().position(|f| f.operation == operation)?;
        state.failures.remove(position)
    }

    fn finish<T>(
        failure: Option<Failure>,
        apply: impl FnOnce() -> StoreResult<T>,
    ) -> StoreResult<T> {
        match failure {
            Some(f) if f.after_effect => {
                apply()?;
                Err(f.error)
            }
            Some(f) => Err(f.error),
            None => apply(),
        }
    }
}

impl State {
    fn insert(&mut self, parent: &str, node: Node, after: Option<&str>) -> StoreResult<String> {
        self.next_id += 1;
        let id = format!("{}-{}", node.kind.replace('_', "-"), self.next_id);
        let siblings = &mut self
            .nodes
            .get_mut(parent)
            .filter(|p| !p.archived)
            .ok_or_else(|| StoreError::NotFound(parent.to_string()))?
            .children;
        let position = after
            .and_then(|a| siblings.iter().position(|s| s == a))
            .map_or(siblings.len(), |p| p + 1);
        siblings.insert(position, id.clone());
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    fn live(&self, id: &str) -> StoreResult<&Node> {
        self.nodes
            .get(id)
            .filter(|n| !n.archived)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn detach(&mut self, id: &str) -> StoreResult<()> {
        let parent = self.live(id)?.parent.clone();
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| c != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.archived = true;
        }
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    async fn retrieve_parent(&self, id: &str, kind: ParentKind) -> StoreResult<Parent> {
        let failure = self.begin(Operation::RetrieveParent);
        Self::finish(failure, || {
            let state = self.lock();
            let node = state.live(id)?;
            let matches = match kind {
                ParentKind::Page => node.kind != "database",
                ParentKind::Database => node.kind == "database",
            };
            if !matches {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Ok(Parent {
                id: id.to_string(),
                kind,
            })
        })
    }

    async fn create_page(&self, parent: &Parent, title: &str) -> StoreResult<String> {
        let failure = self.begin(Operation::CreatePage);
        Self::finish(failure, || {
            let node = Node {
                kind: "child_page".into(),
                title: Some(title.to_string()),
                payload: Value::Null,
                parent: Some(parent.id.clone()),
                children: Vec::new(),
                archived: false,
            };
            self.lock().insert(&parent.id, node, None)
        })
    }

    async fn update_page_title(&self, page_id: &str, title: &str) -> StoreResult<()> {
        let failure = self.begin(Operation::UpdatePageTitle);
        Self::finish(failure, || {
            let mut state = self.lock();
            state.live(page_id)?;
            if let Some(node) = state.nodes.get_mut(page_id) {
                node.title = Some(title.to_string());
            }
            Ok(())
        })
    }

    async fn append_blocks(
        &self,
        block_id: &str,
        batch: &[Value],
        after: Option<&str>,
    ) -> StoreResult<Vec<String>> {
        let failure = self.begin(Operation::AppendBlocks);
        Self::finish(failure, || {
            let mut state = self.lock();
            let mut ids = Vec::with_capacity(batch.len());
            let mut cursor = after.map(str::to_string);
            for payload in batch {
                let node = Node {
                    kind: payload["type"].as_str().unwrap_or("unknown").to_string(),
                    title: None,
                    payload: payload.clone(),
                    parent: Some(block_id.to_string()),
                    children: Vec::new(),
                    archived: false,
                };
                let id = state.insert(block_id, node, cursor.as_deref())?;
                if cursor.is_some() {
                    cursor = Some(id.clone());
                }
                ids.push(id);
            }
            Ok(ids)
        })
    }

    async fn list_block_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> StoreResult<ChildrenPage> {
        let failure = self.begin(Operation::ListBlockChildren);
        Self::finish(failure, || {
            let state = self.lock();
            let node = state.live(block_id)?;
            let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
            let end = (start + self.page_size).min(node.children.len());
            let results = node.children[start..end]
                .iter()
                .filter_map(|id| {
                    state.nodes.get(id).map(|child| ChildBlock {
                        id: id.clone(),
                        kind: child.kind.clone(),
                        title: child.title.clone(),
                    })
                })
                .collect();
            let next_cursor = (end < node.children.len()).then(|| end.to_string());
            Ok(ChildrenPage { results, next_cursor })
        })
    }

    async fn delete_block(&self, block_id: &str) -> StoreResult<()> {
        let failure = self.begin(Operation::DeleteBlock);
        Self::finish(failure, || self.lock().detach(block_id))
    }

    async fn delete_page(&self, page_id: &str) -> StoreResult<()> {
        let failure = self.begin(Operation::DeletePage);
        Self::finish(failure, || self.lock().detach(page_id))
    }

    async fn create_file_upload(&self, filename: &str, _content_type: &str) -> StoreResult<String> {
        let failure = self.begin(Operation::CreateFileUpload);
        Self::finish(failure, || {
            let mut state = self.lock();
            state.next_id += 1;
            let id = format!("file-upload-{}", state.next_id);
            state.uploads.insert(id.clone(), (filename.to_string(), None));
            Ok(id)
        })
    }

    async fn send_file_upload(
        &self,
        upload_id: &str,
        _filename: &str,
        _content_type: &str,
        bytes: &[u8],
    ) -> StoreResult<()> {
        let failure = self.begin(Operation::SendFileUpload);
        Self::finish(failure, || {
            let mut state = self.lock();
            let upload = state
                .uploads
                .get_mut(upload_id)
                .ok_or_else(|| StoreError::NotFound(upload_id.to_string()))?;
            upload.1 = Some(bytes.to_vec());
            Ok(())
        })
    }
}
