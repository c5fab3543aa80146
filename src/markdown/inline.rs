//! Inline tokenizer.
//!
//! Splits a line of text into [`InlineSpan`]s. Recognized constructs:
//!
//! - images `![alt](src)`
//! - links `[label](target "optional title")`, with balanced brackets in the
//!   label and balanced parentheses in the target
//! - strikethrough `~~...~~`, whose interior is tokenized again
//!
//! Anything else, including emphasis and code spans, stays literal text.
//! Tokenizing never fails: an incomplete construct is emitted as text.

use std::sync::LazyLock;

use regex::Regex;

use super::elements::{plain_text, InlineSpan};

static TARGET_WITH_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?P<target>.+?)\s+(?P<title>"[^"]*"|'[^']*')$"#).expect("valid regex")
});

/// Result of tokenizing one run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineRun {
    pub spans: Vec<InlineSpan>,
    /// Trimmed concatenation of literal text, labels and alt text.
    pub normalized: String,
}

/// Tokenize `text` into inline spans.
#[must_use]
pub fn tokenize(text: &str) -> InlineRun {
    let spans = tokenize_spans(text);
    let normalized = plain_text(&spans);
    InlineRun { spans, normalized }
}

fn tokenize_spans(text: &str) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    let mut buffer = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        if let Some(after) = rest.strip_prefix("~~") {
            if let Some(end) = after.find("~~").filter(|&end| end > 0) {
                flush(&mut buffer, &mut spans);
                spans.push(InlineSpan::Strikethrough {
                    children: tokenize_spans(&after[..end]),
                });
                i += 2 + end + 2;
                continue;
            }
            buffer.push_str("~~");
            i += 2;
            continue;
        }

        if let Some(after) = rest.strip_prefix('!') {
            if let Some(link) = parse_link(after) {
                flush(&mut buffer, &mut spans);
                spans.push(InlineSpan::Image {
                    alt: link.label.to_string(),
                    source: link.target,
                });
                i += 1 + link.consumed;
                continue;
            }
        }

        if let Some(link) = parse_link(rest) {
            flush(&mut buffer, &mut spans);
            let label = if link.label.trim().is_empty() {
                link.target.clone()
            } else {
                link.label.to_string()
            };
            spans.push(InlineSpan::Link {
                label,
                target: link.target,
                title: link.title,
            });
            i += link.consumed;
            continue;
        }

        let Some(ch) = rest.chars().next() else { break };
        buffer.push(ch);
        i += ch.len_utf8();
    }

    flush(&mut buffer, &mut spans);
    spans
}

fn flush(buffer: &mut String, spans: &mut Vec<InlineSpan>) {
    if !buffer.is_empty() {
        spans.push(InlineSpan::Text {
            text: std::mem::take(buffer),
        });
    }
}

struct ParsedLink<'a> {
    label: &'a str,
    target: String,
    title: Option<String>,
    consumed: usize,
}

/// Parse `[label](inner)` at the start of `s`.
fn parse_link(s: &str) -> Option<ParsedLink<'_>> {
    if !s.starts_with('[') {
        return None;
    }
    let label_end = matching_close(s, '[', ']')?;
    let after_label = &s[label_end + 1..];
    if !after_label.starts_with('(') {
        return None;
    }
    let paren_end = matching_close(after_label, '(', ')')?;
    let inner = after_label[1..paren_end].trim();
    let (target, title) = split_target(inner)?;

    Some(ParsedLink {
        label: &s[1..label_end],
        target,
        title,
        consumed: label_end + 1 + paren_end + 1,
    })
}

/// Byte index of the delimiter closing the one at index 0.
fn matching_close(s: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in s.char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

fn split_target(inner: &str) -> Option<(String, Option<String>)> {
    let (target, title) = match TARGET_WITH_TITLE.captures(inner) {
        Some(caps) => {
            let quoted = &caps["title"];
            (
                caps["target"].trim().to_string(),
                Some(quoted[1..quoted.len() - 1].to_string()),
            )
        }
        None => (inner.to_string(), None),
    };

    let target = target
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .map_or(target.clone(), str::to_string);

    if target.is_empty() {
        None
    } else {
        Some((target, title))
    }
}
