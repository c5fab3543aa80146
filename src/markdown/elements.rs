//! Typed element tree produced by the block parser.
//!
//! Every value here is built once per parse and never mutated afterwards.
//! Consumers match exhaustively on [`Block`] and [`InlineSpan`], so adding a
//! variant is a compile error everywhere it needs handling.

use serde::Serialize;

/// Title used when a document has no level-1 heading.
pub const DEFAULT_TITLE: &str = "Document";

/// A parsed source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    pub source_path: String,
    pub children: Vec<Block>,
}

impl Document {
    /// Whether the title came from the fallback rather than a heading.
    #[must_use]
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    /// Total number of blocks, counting nested children.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.children.iter().map(Block::subtree_len).sum()
    }
}

/// A term and its descriptions in a definition list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub term: Vec<InlineSpan>,
    pub descriptions: Vec<Vec<InlineSpan>>,
}

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub spans: Vec<InlineSpan>,
}

/// Block-level element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        spans: Vec<InlineSpan>,
    },
    Paragraph {
        spans: Vec<InlineSpan>,
    },
    BulletedListItem {
        spans: Vec<InlineSpan>,
    },
    NumberedListItem {
        spans: Vec<InlineSpan>,
    },
    TodoListItem {
        checked: bool,
        spans: Vec<InlineSpan>,
    },
    Quote {
        children: Vec<Block>,
    },
    /// A content tab (`=== "Title"`), rendered as a collapsible toggle.
    Toggle {
        title: String,
        children: Vec<Block>,
    },
    /// GitHub callout or MkDocs admonition. `kind` is upper-cased.
    Callout {
        kind: String,
        title: Option<String>,
        icon: Option<String>,
        children: Vec<Block>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    Table {
        header: Vec<Cell>,
        rows: Vec<Vec<Cell>>,
    },
    /// `Term` lines each followed by `: description` lines.
    DefinitionList {
        items: Vec<Definition>,
    },
    Divider,
    Image {
        source: String,
        alt: String,
    },
    /// Verbatim text of a region the parser could not recognize.
    RawMarkdown {
        text: String,
        reason: String,
    },
}

impl Block {
    /// Nested child blocks, empty for leaf variants.
    #[must_use]
    pub fn children(&self) -> &[Block] {
        match self {
            Self::Quote { children }
            | Self::Toggle { children, .. }
            | Self::Callout { children, .. } => children,
            Self::Heading { .. }
            | Self::Paragraph { .. }
            | Self::BulletedListItem { .. }
            | Self::NumberedListItem { .. }
            | Self::TodoListItem { .. }
            | Self::CodeBlock { .. }
            | Self::Table { .. }
            | Self::DefinitionList { .. }
            | Self::Divider
            | Self::Image { .. }
            | Self::RawMarkdown { .. } => &[],
        }
    }

    fn subtree_len(&self) -> usize {
        1 + self.children().iter().map(Self::subtree_len).sum::<usize>()
    }
}

/// Inline element inside a text run.
///
/// Only [`InlineSpan::Strikethrough`] nests other spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineSpan {
    Text {
        text: String,
    },
    Link {
        label: String,
        target: String,
        title: Option<String>,
    },
    Image {
        alt: String,
        source: String,
    },
    Strikethrough {
        children: Vec<InlineSpan>,
    },
}

impl InlineSpan {
    /// Convenience constructor for a literal text span.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Flat text of this span: literal text, link labels and image alt text.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Link { label, .. } => label.clone(),
            Self::Image { alt, .. } => alt.clone(),
            Self::Strikethrough { children } => plain_text(children),
        }
    }
}

/// Concatenated flat text of a span sequence, trimmed.
#[must_use]
pub fn plain_text(spans: &[InlineSpan]) -> String {
    spans
        .iter()
        .map(InlineSpan::plain_text)
        .collect::<String>()
        .trim()
        .to_string()
}
