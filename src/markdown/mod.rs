//! Markdown parsing.
//!
//! - [`parser`] - line-oriented block parser with per-region recovery
//! - [`inline`] - inline span tokenizer (links, images, strikethrough)
//! - [`elements`] - the immutable element tree both produce
//! - [`warning`] - diagnostics collected during parsing

pub mod elements;
pub mod inline;
pub mod parser;
pub mod warning;

pub use elements::{Block, Cell, Definition, Document, InlineSpan};
pub use parser::{parse_markdown, ParseOutcome};
pub use warning::{ParseWarning, SourceWarning, WarningKind};
