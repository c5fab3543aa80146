//! Notion REST client.
//!
//! Thin [`RemoteStore`] implementation over `reqwest`. It performs exactly one
//! HTTP request per call and classifies failures into [`StoreError`]; rate
//! limiting and retries are the caller's job.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::trace;

use super::store::{
    ChildBlock, ChildrenPage, Parent, ParentKind, RemoteStore, StoreError, StoreResult,
};
use crate::config::NotionSettings;
use crate::error::{Error, Result};

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest page size the children endpoint accepts.
const PAGE_SIZE: u32 = 100;

/// Notion API client.
#[derive(Debug, Clone)]
pub struct NotionClient {
    client: Client,
    base_url: String,
    token: String,
    api_version: String,
}

impl NotionClient {
    /// Build a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(settings: &NotionSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("mkdocs2notion/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            api_version: settings.api_version.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        trace!(status = status.as_u16(), url = %response.url(), "Notion response");

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| StoreError::InvalidResponse(e.to_string()));
        }

        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let message = if parsed.message.is_empty() { body } else { parsed.message };
    StoreError::from_status(status, &parsed.code, message, retry_after)
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ObjectRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    results: Vec<T>,
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type", default)]
    kind: String,
    child_page: Option<TitledBody>,
    child_database: Option<TitledBody>,
}

#[derive(Debug, Deserialize)]
struct TitledBody {
    title: String,
}

impl From<RawBlock> for ChildBlock {
    fn from(raw: RawBlock) -> Self {
        let title = raw.child_page.or(raw.child_database).map(|body| body.title);
        Self {
            id: raw.id,
            kind: raw.kind,
            title,
        }
    }
}

fn title_property(title: &str) -> Value {
    json!({
        "title": {
            "title": [{ "type": "text", "text": { "content": title } }]
        }
    })
}

/// Request body for creating a page.
#[must_use]
pub fn create_page_body(parent: &Parent, title: &str) -> Value {
    let parent_ref = match parent.kind {
        ParentKind::Page => json!({ "page_id": parent.id }),
        ParentKind::Database => json!({ "database_id": parent.id }),
    };
    json!({ "parent": parent_ref, "properties": title_property(title) })
}

/// Request body for appending children.
#[must_use]
pub fn append_body(batch: &[Value], after: Option<&str>) -> Value {
    let mut body = json!({ "children": batch });
    if let Some(after) = after {
        body["after"] = Value::from(after);
    }
    body
}

/// Request body for starting a single-part file upload.
#[must_use]
pub fn file_upload_body(filename: &str, content_type: &str) -> Value {
    json!({ "mode": "single_part", "filename": filename, "content_type": content_type })
}

impl RemoteStore for NotionClient {
    async fn retrieve_parent(&self, id: &str, kind: ParentKind) -> StoreResult<Parent> {
        let collection = match kind {
            ParentKind::Page => "pages",
            ParentKind::Database => "databases",
        };
        let request = self.client.get(self.url(&format!("{collection}/{id}")));
        let object: ObjectRef = self.send(request).await?;
        Ok(Parent { id: object.id, kind })
    }

    async fn create_page(&self, parent: &Parent, title: &str) -> StoreResult<String> {
        let request = self
            .client
            .post(self.url("pages"))
            .json(&create_page_body(parent, title));
        let page: ObjectRef = self.send(request).await?;
        Ok(page.id)
    }

    async fn update_page_title(&self, page_id: &str, title: &str) -> StoreResult<()> {
        let request = self
            .client
            .patch(self.url(&format!("pages/{page_id}")))
            .json(&json!({ "properties": title_property(title) }));
        let _: ObjectRef = self.send(request).await?;
        Ok(())
    }

    async fn append_blocks(
        &self,
        block_id: &str,
        batch: &[Value],
        after: Option<&str>,
    ) -> StoreResult<Vec<String>> {
        let request = self
            .client
            .patch(self.url(&format!("blocks/{block_id}/children")))
            .json(&append_body(batch, after));
        let response: ListResponse<ObjectRef> = self.send(request).await?;
        if response.results.len() < batch.len() {
            return Err(StoreError::InvalidResponse(format!(
                "appended {} blocks but {} ids came back",
                batch.len(),
                response.results.len()
            )));
        }
        // With `after`, Notion may echo siblings that follow the insertion
        // point; the created blocks come first.
        Ok(response.results.into_iter().take(batch.len()).map(|r| r.id).collect())
    }

    async fn list_block_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> StoreResult<ChildrenPage> {
        let mut request = self
            .client
            .get(self.url(&format!("blocks/{block_id}/children")))
            .query(&[("page_size", PAGE_SIZE.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("start_cursor", cursor)]);
        }
        let response: ListResponse<RawBlock> = self.send(request).await?;
        Ok(ChildrenPage {
            results: response.results.into_iter().map(ChildBlock::from).collect(),
            next_cursor: response.next_cursor.filter(|_| response.has_more),
        })
    }

    async fn delete_block(&self, block_id: &str) -> StoreResult<()> {
        let request = self.client.delete(self.url(&format!("blocks/{block_id}")));
        let _: ObjectRef = self.send(request).await?;
        Ok(())
    }

    async fn delete_page(&self, page_id: &str) -> StoreResult<()> {
        let request = self
            .client
            .patch(self.url(&format!("pages/{page_id}")))
            .json(&json!({ "archived": true }));
        let _: ObjectRef = self.send(request).await?;
        Ok(())
    }

    async fn create_file_upload(&self, filename: &str, content_type: &str) -> StoreResult<String> {
        let request = self
            .client
            .post(self.url("file_uploads"))
            .json(&file_upload_body(filename, content_type));
        let upload: ObjectRef = self.send(request).await?;
        Ok(upload.id)
    }

    async fn send_file_upload(
        &self,
        upload_id: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> StoreResult<()> {
        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let request = self
            .client
            .post(self.url(&format!("file_uploads/{upload_id}/send")))
            .multipart(Form::new().part("file", part));
        let _: ObjectRef = self.send(request).await?;
        Ok(())
    }
}
