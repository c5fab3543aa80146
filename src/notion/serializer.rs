//! Element tree to Notion block payloads.
//!
//! Serialization is stateless and deterministic: the same blocks and options
//! always produce byte-identical JSON. Every [`Block`] becomes exactly one
//! payload, except definition lists, which become one paragraph per term.
//! Children of quotes, toggles, callouts and definition terms are not
//! embedded in their parent's payload; they are returned as deferred children
//! and must be appended under the id Notion assigns to the parent.
//!
//! Table rows are the exception: Notion rejects a table created without rows,
//! so the first rows travel inside the table payload and only the overflow
//! beyond [`MAX_BATCH_SIZE`] is deferred.
//!
//! Images that resolve to neither a URL nor the asset base URL but exist on
//! disk next to the document are emitted as `file_upload` images carrying
//! [`RemoteBlock::upload`]; the publisher uploads the file and fills in the
//! upload id before sending.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::markdown::elements::{Block, Cell, Definition, Document, InlineSpan};
use crate::markdown::warning::{ParseWarning, WarningKind};

/// Most children Notion accepts in one append request.
pub const MAX_BATCH_SIZE: usize = 100;

/// Longest `text.content` Notion accepts in a single rich text object.
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Notion's code block language for anything it does not recognize.
pub const PLAIN_TEXT_LANGUAGE: &str = "plain text";

/// Settings that influence payload content.
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// Base URL that relative image sources are resolved against.
    pub asset_base_url: Option<String>,
    /// Docs directory local image paths are read from.
    pub docs_root: Option<PathBuf>,
}

/// Index path of the element that produced a payload, from the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }
}

/// One Notion block payload with the children to append under it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteBlock {
    pub origin: NodePath,
    pub payload: Value,
    pub children: Vec<RemoteBlock>,
    /// Local file to upload into this image block before it is sent.
    #[serde(skip)]
    pub upload: Option<PathBuf>,
}

impl RemoteBlock {
    fn leaf(origin: NodePath, payload: Value) -> Self {
        Self::parent(origin, payload, Vec::new())
    }

    fn parent(origin: NodePath, payload: Value, children: Vec<RemoteBlock>) -> Self {
        Self {
            origin,
            payload,
            children,
            upload: None,
        }
    }

    /// Notion block type of the payload.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.payload.get("type").and_then(Value::as_str).unwrap_or_default()
    }

    /// Point this image block at a completed file upload.
    pub fn attach_upload(&mut self, upload_id: &str) {
        self.payload["image"]["file_upload"] = json!({ "id": upload_id });
    }
}

/// Serializer output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Serialized {
    pub blocks: Vec<RemoteBlock>,
    #[serde(skip)]
    pub warnings: Vec<ParseWarning>,
}

/// Split sibling payloads into append-sized batches, preserving order.
pub fn batches(blocks: &[RemoteBlock]) -> std::slice::Chunks<'_, RemoteBlock> {
    blocks.chunks(MAX_BATCH_SIZE)
}

/// Serialize a block sequence. Local images are not looked up.
#[must_use]
pub fn serialize_blocks(blocks: &[Block], options: &SerializeOptions) -> Serialized {
    Serializer::new(options, None).run(blocks)
}

/// Serialize a parsed document, reading local images relative to its source
/// file under [`SerializeOptions::docs_root`].
#[must_use]
pub fn serialize_document(document: &Document, options: &SerializeOptions) -> Serialized {
    let local_dir = options
        .docs_root
        .as_ref()
        .and_then(|root| root.join(&document.source_path).parent().map(Path::to_path_buf));
    Serializer::new(options, local_dir).run(&document.children)
}

struct Serializer<'a> {
    options: &'a SerializeOptions,
    local_dir: Option<PathBuf>,
    warnings: Vec<ParseWarning>,
}

impl<'a> Serializer<'a> {
    fn new(options: &'a SerializeOptions, local_dir: Option<PathBuf>) -> Self {
        Self {
            options,
            local_dir,
            warnings: Vec::new(),
        }
    }

    fn run(mut self, blocks: &[Block]) -> Serialized {
        let blocks = self.sequence(blocks, &NodePath::default());
        Serialized {
            blocks,
            warnings: self.warnings,
        }
    }

    fn sequence(&mut self, blocks: &[Block], parent: &NodePath) -> Vec<RemoteBlock> {
        let mut out = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            self.block(block, parent.child(index), &mut out);
        }
        out
    }

    fn block(&mut self, block: &Block, origin: NodePath, out: &mut Vec<RemoteBlock>) {
        let remote = match block {
            Block::Heading { level, spans } => {
                let kind = match level {
                    1 => "heading_1",
                    2 => "heading_2",
                    _ => "heading_3",
                };
                RemoteBlock::leaf(origin, payload(kind, json!({ "rich_text": rich_text(spans) })))
            }
            Block::Paragraph { spans } => RemoteBlock::leaf(origin, paragraph(rich_text(spans))),
            Block::BulletedListItem { spans } => RemoteBlock::leaf(
                origin,
                payload("bulleted_list_item", json!({ "rich_text": rich_text(spans) })),
            ),
            Block::NumberedListItem { spans } => RemoteBlock::leaf(
                origin,
                payload("numbered_list_item", json!({ "rich_text": rich_text(spans) })),
            ),
            Block::TodoListItem { checked, spans } => RemoteBlock::leaf(
                origin,
                payload("to_do", json!({ "rich_text": rich_text(spans), "checked": checked })),
            ),
            Block::Quote { children } => {
                let (text, rest, offset) = match children.split_first() {
                    Some((Block::Paragraph { spans }, rest)) => (rich_text(spans), rest, 1),
                    _ => (Vec::new(), children.as_slice(), 0),
                };
                let mut deferred = Vec::with_capacity(rest.len());
                for (index, child) in rest.iter().enumerate() {
                    self.block(child, origin.child(index + offset), &mut deferred);
                }
                let body = json!({ "rich_text": text });
                RemoteBlock::parent(origin, payload("quote", body), deferred)
            }
            Block::Toggle { title, children } => {
                let body = json!({ "rich_text": text_objects(title, None, false) });
                let children = self.sequence(children, &origin);
                RemoteBlock::parent(origin, payload("toggle", body), children)
            }
            Block::Callout {
                kind,
                title,
                icon,
                children,
            } => {
                let label = title.clone().unwrap_or_else(|| capitalize(kind));
                let emoji = icon.clone().unwrap_or_else(|| callout_icon(kind).to_string());
                let body = json!({
                    "rich_text": text_objects(&label, None, false),
                    "icon": { "type": "emoji", "emoji": emoji },
                });
                let children = self.sequence(children, &origin);
                RemoteBlock::parent(origin, payload("callout", body), children)
            }
            Block::CodeBlock { language, code } => {
                let language = language.as_deref().map_or(PLAIN_TEXT_LANGUAGE, code_language);
                RemoteBlock::leaf(origin, code_block(code, language))
            }
            Block::Table { header, rows } => table(header, rows, origin),
            Block::DefinitionList { items } => {
                out.extend(
                    items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| definition(item, origin.child(index))),
                );
                return;
            }
            Block::Divider => RemoteBlock::leaf(origin, payload("divider", json!({}))),
            Block::Image { source, alt } => self.image(source, alt, origin),
            Block::RawMarkdown { text, .. } => {
                RemoteBlock::leaf(origin, code_block(text, "markdown"))
            }
        };
        out.push(remote);
    }

    fn image(&mut self, source: &str, alt: &str, origin: NodePath) -> RemoteBlock {
        if let Some(url) = resolve_asset(source, self.options.asset_base_url.as_deref()) {
            let body = json!({ "type": "external", "external": { "url": url } });
            return RemoteBlock::leaf(origin, image_payload(body, alt));
        }

        if let Some(path) = self.local_file(source) {
            match fs::read(&path) {
                Ok(bytes) => {
                    let digest = format!("{:x}", Sha256::digest(&bytes));
                    let body = json!({
                        "type": "file_upload",
                        "file_upload": { "source": source, "sha256": digest },
                    });
                    let mut block = RemoteBlock::leaf(origin, image_payload(body, alt));
                    block.upload = Some(path);
                    return block;
                }
                Err(e) => self.warnings.push(ParseWarning::new(
                    WarningKind::UnresolvedLink,
                    0,
                    "image",
                    format!("image '{source}' could not be read: {e}"),
                )),
            }
        } else {
            self.warnings.push(ParseWarning::new(
                WarningKind::UnresolvedLink,
                0,
                "image",
                format!(
                    "image '{source}' is not a URL, and no asset base URL or local file \
                     resolves it"
                ),
            ));
        }

        let label = if alt.is_empty() {
            format!("[image: {source}]")
        } else {
            format!("[image: {alt}] ({source})")
        };
        RemoteBlock::leaf(origin, paragraph(text_objects(&label, None, false)))
    }

    /// Existing file an image source points at, relative to the document or,
    /// with a leading `/`, to the docs root.
    fn local_file(&self, source: &str) -> Option<PathBuf> {
        if Url::parse(source).is_ok() {
            return None;
        }
        let path = match source.strip_prefix('/') {
            Some(rooted) => self.options.docs_root.as_ref()?.join(rooted),
            None => self.local_dir.as_ref()?.join(source),
        };
        path.is_file().then_some(path)
    }
}

fn image_payload(mut body: Value, alt: &str) -> Value {
    if !alt.is_empty() {
        body["caption"] = Value::Array(text_objects(alt, None, false));
    }
    payload("image", body)
}

/// Bold term paragraph with one nested paragraph per description.
fn definition(item: &Definition, origin: NodePath) -> RemoteBlock {
    let mut term = rich_text(&item.term);
    for part in &mut term {
        part["annotations"]["bold"] = Value::Bool(true);
    }
    let descriptions = item
        .descriptions
        .iter()
        .enumerate()
        .map(|(index, spans)| RemoteBlock::leaf(origin.child(index), paragraph(rich_text(spans))))
        .collect();
    RemoteBlock::parent(origin, paragraph(term), descriptions)
}

fn table(header: &[Cell], rows: &[Vec<Cell>], origin: NodePath) -> RemoteBlock {
    let width = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(1)
        .max(1);

    let mut all_rows = std::iter::once(header)
        .chain(rows.iter().map(Vec::as_slice))
        .map(|cells| table_row(cells, width));
    let inline: Vec<Value> = all_rows.by_ref().take(MAX_BATCH_SIZE).collect();
    let overflow = all_rows.map(|row| RemoteBlock::leaf(origin.clone(), row)).collect();

    let body = json!({
        "table_width": width,
        "has_column_header": true,
        "has_row_header": false,
        "children": inline,
    });
    RemoteBlock::parent(origin, payload("table", body), overflow)
}

fn table_row(cells: &[Cell], width: usize) -> Value {
    let mut rendered: Vec<Value> = cells
        .iter()
        .take(width)
        .map(|cell| Value::Array(rich_text(&cell.spans)))
        .collect();
    rendered.resize(width, Value::Array(Vec::new()));
    payload("table_row", json!({ "cells": rendered }))
}

fn payload(kind: &str, body: Value) -> Value {
    let mut map = Map::new();
    map.insert("object".to_string(), Value::from("block"));
    map.insert("type".to_string(), Value::from(kind));
    map.insert(kind.to_string(), body);
    Value::Object(map)
}

fn paragraph(text: Vec<Value>) -> Value {
    payload("paragraph", json!({ "rich_text": text }))
}

fn code_block(code: &str, language: &str) -> Value {
    payload(
        "code",
        json!({
            "rich_text": text_objects(code, None, false),
            "language": language,
        }),
    )
}

/// Rich text objects for a span sequence.
#[must_use]
pub fn rich_text(spans: &[InlineSpan]) -> Vec<Value> {
    let mut out = Vec::new();
    push_spans(spans, false, &mut out);
    out
}

fn push_spans(spans: &[InlineSpan], strike: bool, out: &mut Vec<Value>) {
    for span in spans {
        match span {
            InlineSpan::Text { text } => out.extend(text_objects(text, None, strike)),
            InlineSpan::Link { label, target, .. } => {
                let url = http_url(target);
                out.extend(text_objects(label, url.as_deref(), strike));
            }
            InlineSpan::Image { alt, source } => {
                let label = if alt.is_empty() { source } else { alt };
                let url = http_url(source);
                out.extend(text_objects(label, url.as_deref(), strike));
            }
            InlineSpan::Strikethrough { children } => push_spans(children, true, out),
        }
    }
}

/// Text objects for `content`, split to respect [`MAX_TEXT_LENGTH`].
fn text_objects(content: &str, link: Option<&str>, strike: bool) -> Vec<Value> {
    chunk_text(content, MAX_TEXT_LENGTH)
        .into_iter()
        .map(|chunk| {
            let mut text = json!({ "content": chunk });
            if let Some(url) = link {
                text["link"] = json!({ "url": url });
            }
            let mut object = json!({ "type": "text", "text": text });
            if strike {
                object["annotations"] = json!({ "strikethrough": true });
            }
            object
        })
        .collect()
}

fn chunk_text(content: &str, max_chars: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in content.char_indices() {
        if count == max_chars {
            chunks.push(&content[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < content.len() {
        chunks.push(&content[start..]);
    }
    chunks
}

/// `target` if it is an absolute http(s) URL.
#[must_use]
pub fn http_url(target: &str) -> Option<String> {
    Url::parse(target)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .map(String::from)
}

fn resolve_asset(source: &str, base: Option<&str>) -> Option<String> {
    if let Some(url) = http_url(source) {
        return Some(url);
    }
    let base = Url::parse(base?).ok()?;
    let base = if base.path().ends_with('/') {
        base
    } else {
        Url::parse(&format!("{base}/")).ok()?
    };
    let joined = base.join(source.trim_start_matches("./")).ok()?;
    http_url(joined.as_str())
}

/// Emoji shown on a callout of the given kind.
#[must_use]
pub fn callout_icon(kind: &str) -> &'static str {
    match kind.to_ascii_lowercase().as_str() {
        "warning" | "caution" | "attention" => "⚠️",
        "note" | "tip" | "hint" | "success" => "💡",
        "info" | "abstract" | "summary" => "ℹ️",
        "danger" | "error" | "failure" | "bug" | "important" => "❗",
        _ => "💬",
    }
}

/// Notion language name for a fence info word.
#[must_use]
pub fn code_language(language: &str) -> &'static str {
    const SUPPORTED: &[&str] = &[
        "abap", "arduino", "bash", "basic", "c", "clojure", "coffeescript", "c++", "c#", "css",
        "dart", "diff", "docker", "elixir", "elm", "erlang", "flow", "fortran", "f#", "gherkin",
        "glsl", "go", "graphql", "groovy", "haskell", "html", "java", "javascript", "json",
        "julia", "kotlin", "latex", "less", "lisp", "livescript", "lua", "makefile", "markdown",
        "markup", "matlab", "mermaid", "nix", "objective-c", "ocaml", "pascal", "perl", "php",
        "powershell", "prolog", "protobuf", "python", "r", "reason", "ruby", "rust", "sass",
        "scala", "scheme", "scss", "shell", "sql", "swift", "typescript", "vb.net", "verilog",
        "vhdl", "visual basic", "webassembly", "xml", "yaml",
    ];

    let lower = language.to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "sh" | "zsh" | "console" | "shell-session" => "shell",
        "py" | "python3" => "python",
        "js" | "jsx" | "node" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "yml" => "yaml",
        "rs" => "rust",
        "cpp" | "cxx" | "hpp" => "c++",
        "cs" | "csharp" => "c#",
        "fsharp" => "f#",
        "dockerfile" => "docker",
        "md" => "markdown",
        "ps1" | "pwsh" | "ps" => "powershell",
        "kt" | "kts" => "kotlin",
        "rb" => "ruby",
        "golang" => "go",
        "jsonc" | "json5" => "json",
        "make" => "makefile",
        "proto" => "protobuf",
        "objc" => "objective-c",
        "tex" => "latex",
        "wasm" | "wat" => "webassembly",
        other => other,
    };

    SUPPORTED
        .iter()
        .find(|&&name| name == canonical)
        .copied()
        .unwrap_or(PLAIN_TEXT_LANGUAGE)
}

fn capitalize(kind: &str) -> String {
    let lower = kind.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parser::parse_markdown;
    use tempfile::TempDir;

    fn serialize(src: &str) -> Serialized {
        let outcome = parse_markdown(src, "doc.md");
        serialize_blocks(&outcome.document.children, &SerializeOptions::default())
    }

    fn text_of(block: &RemoteBlock) -> String {
        block.payload[block.kind()]["rich_text"]
            .as_array()
            .unwrap()
            .iter()
            .map(|part| part["text"]["content"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_heading_levels() {
        let out = serialize("# One\n## Two\n#### Four");
        let kinds: Vec<_> = out.blocks.iter().map(RemoteBlock::kind).collect();
        assert_eq!(kinds, ["heading_1", "heading_2", "heading_3"]);
        assert_eq!(text_of(&out.blocks[2]), "Four");
    }

    #[test]
    fn test_link_url_only_for_http_targets() {
        let out = serialize("[ext](https://example.com/a) and [rel](../b.md)");
        let text = &out.blocks[0].payload["paragraph"]["rich_text"];
        assert_eq!(text[0]["text"]["link"]["url"], "https://example.com/a");
        assert!(text[2]["text"].get("link").is_none());
        assert_eq!(text[2]["text"]["content"], "rel");
    }

    #[test]
    fn test_strikethrough_annotation_applies_to_nested_link() {
        let out = serialize("~~[gone](https://old.example)~~");
        let part = &out.blocks[0].payload["paragraph"]["rich_text"][0];
        assert_eq!(part["annotations"]["strikethrough"], true);
        assert_eq!(part["text"]["link"]["url"], "https://old.example/");
    }

    #[test]
    fn test_callout_children_are_deferred() {
        let out = serialize("!!! warning \"Heads up\"\n    Inside\n\n    - item");
        let callout = &out.blocks[0];
        assert_eq!(callout.kind(), "callout");
        assert_eq!(callout.payload["callout"]["icon"]["emoji"], "⚠️");
        assert!(callout.payload["callout"].get("children").is_none());
        assert_eq!(callout.children.len(), 2);
        assert_eq!(callout.children[1].origin.0, vec![0, 1]);
    }

    #[test]
    fn test_callout_default_label_and_icon() {
        let out = serialize("> [!CUSTOM]\n> body");
        assert_eq!(text_of(&out.blocks[0]), "Custom");
        assert_eq!(out.blocks[0].payload["callout"]["icon"]["emoji"], "💬");
    }

    #[test]
    fn test_quote_promotes_leading_paragraph() {
        let out = serialize("> Said once\n>\n> ## Later");
        let quote = &out.blocks[0];
        assert_eq!(text_of(quote), "Said once");
        assert_eq!(quote.children.len(), 1);
        assert_eq!(quote.children[0].origin.0, vec![0, 1]);
    }

    #[test]
    fn test_code_language_mapping() {
        assert_eq!(code_language("py"), "python");
        assert_eq!(code_language("Rust"), "rust");
        assert_eq!(code_language("toml"), PLAIN_TEXT_LANGUAGE);
        let out = serialize("```\nx\n```");
        assert_eq!(out.blocks[0].payload["code"]["language"], PLAIN_TEXT_LANGUAGE);
    }

    #[test]
    fn test_raw_markdown_becomes_markdown_code() {
        let out = serialize("```\nnever closed");
        assert_eq!(out.blocks[0].payload["code"]["language"], "markdown");
    }

    #[test]
    fn test_table_rows_inline_and_padded() {
        let out = serialize("| a | b |\n|---|---|\n| 1 |\n| 2 | 3 | 4 |");
        let table = &out.blocks[0].payload["table"];
        assert_eq!(table["table_width"], 3);
        assert_eq!(table["has_column_header"], true);
        let rows = table["children"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        for row in rows {
            assert_eq!(row["table_row"]["cells"].as_array().unwrap().len(), 3);
        }
        assert!(out.blocks[0].children.is_empty());
    }

    #[test]
    fn test_large_table_defers_overflow_rows() {
        let mut src = String::from("| n |\n|---|\n");
        for i in 0..150 {
            src.push_str(&format!("| {i} |\n"));
        }
        let out = serialize(&src);
        let inline = out.blocks[0].payload["table"]["children"].as_array().unwrap().len();
        assert_eq!(inline, MAX_BATCH_SIZE);
        assert_eq!(out.blocks[0].children.len(), 151 - MAX_BATCH_SIZE);
        assert_eq!(out.blocks[0].children[0].kind(), "table_row");
    }

    #[test]
    fn test_image_external_and_unresolved() {
        let out = serialize("![logo](https://cdn.example/logo.png)\n\n![local](img/a.png)");
        let image = &out.blocks[0].payload["image"];
        assert_eq!(image["external"]["url"], "https://cdn.example/logo.png");
        assert_eq!(out.blocks[0].payload["image"]["caption"][0]["text"]["content"], "logo");
        assert_eq!(out.blocks[1].kind(), "paragraph");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::UnresolvedLink);
    }

    #[test]
    fn test_image_resolved_against_asset_base() {
        let outcome = parse_markdown("![a](./img/a.png)", "doc.md");
        let options = SerializeOptions {
            asset_base_url: Some("https://docs.example.com/assets".into()),
            ..SerializeOptions::default()
        };
        let out = serialize_blocks(&outcome.document.children, &options);
        assert_eq!(
            out.blocks[0].payload["image"]["external"]["url"],
            "https://docs.example.com/assets/img/a.png"
        );
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_local_image_becomes_upload() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("guide/img")).unwrap();
        std::fs::write(dir.path().join("guide/img/arch.png"), b"png bytes").unwrap();
        std::fs::write(dir.path().join("logo.png"), b"logo").unwrap();

        let src = "![Architecture](img/arch.png)\n\n![](/logo.png)";
        let outcome = parse_markdown(src, "guide/setup.md");
        let options = SerializeOptions {
            docs_root: Some(dir.path().to_path_buf()),
            ..SerializeOptions::default()
        };
        let out = serialize_document(&outcome.document, &options);

        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        let image = &out.blocks[0];
        assert_eq!(image.kind(), "image");
        assert_eq!(image.payload["image"]["type"], "file_upload");
        assert_eq!(image.payload["image"]["caption"][0]["text"]["content"], "Architecture");
        assert_eq!(image.upload.as_deref(), Some(dir.path().join("guide/img/arch.png").as_path()));
        assert_eq!(out.blocks[1].upload.as_deref(), Some(dir.path().join("logo.png").as_path()));

        let mut attached = image.clone();
        attached.attach_upload("upload-1");
        assert_eq!(attached.payload["image"]["file_upload"], json!({ "id": "upload-1" }));
    }

    #[test]
    fn test_changed_local_image_changes_payload() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), b"first").unwrap();
        let outcome = parse_markdown("![](a.png)", "doc.md");
        let options = SerializeOptions {
            docs_root: Some(dir.path().to_path_buf()),
            ..SerializeOptions::default()
        };
        let before = serialize_document(&outcome.document, &options);
        std::fs::write(dir.path().join("a.png"), b"second").unwrap();
        let after = serialize_document(&outcome.document, &options);
        assert_ne!(before.blocks[0].payload, after.blocks[0].payload);
    }

    #[test]
    fn test_missing_local_image_is_placeholder() {
        let dir = TempDir::new().unwrap();
        let outcome = parse_markdown("![gone](img/missing.png)", "doc.md");
        let options = SerializeOptions {
            docs_root: Some(dir.path().to_path_buf()),
            ..SerializeOptions::default()
        };
        let out = serialize_document(&outcome.document, &options);
        assert_eq!(out.blocks[0].kind(), "paragraph");
        assert!(out.blocks[0].upload.is_none());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_definition_list_terms_and_descriptions() {
        let out = serialize("Cache\n: Fast storage\n: Second meaning\n\nTTL\n: Time to live");
        assert_eq!(out.blocks.len(), 2);

        let cache = &out.blocks[0];
        assert_eq!(cache.kind(), "paragraph");
        assert_eq!(text_of(cache), "Cache");
        assert_eq!(cache.payload["paragraph"]["rich_text"][0]["annotations"]["bold"], true);
        assert_eq!(cache.children.len(), 2);
        assert_eq!(text_of(&cache.children[1]), "Second meaning");
        assert_eq!(cache.children[1].origin.0, vec![0, 0, 1]);

        assert_eq!(text_of(&out.blocks[1]), "TTL");
        assert_eq!(out.blocks[1].origin.0, vec![0, 1]);
    }

    #[test]
    fn test_long_text_is_chunked() {
        let long = "é".repeat(MAX_TEXT_LENGTH * 2 + 5);
        let parts = text_objects(&long, None, false);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2]["text"]["content"].as_str().unwrap().chars().count(), 5);
    }

    #[test]
    fn test_batches_respect_limit() {
        let src = "- x\n".repeat(250);
        let out = serialize(&src);
        let sizes: Vec<_> = batches(&out.blocks).map(<[RemoteBlock]>::len).collect();
        assert_eq!(sizes, [100, 100, 50]);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let src = "# T\n\n=== \"Tab\"\n    | a |\n    |---|\n    | b |\n";
        assert_eq!(serialize(src), serialize(src));
    }
}
