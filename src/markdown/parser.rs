//! Line-oriented block parser.
//!
//! The parser walks the source one line at a time and tries each block
//! matcher in a fixed priority order; the first matcher that claims a line
//! consumes its region and parsing continues after it:
//!
//! 1. fenced code (```` ``` ```` / `~~~`)
//! 2. content tabs (`=== "Title"`)
//! 3. callouts (`> [!NOTE]`) and admonitions (`!!! note "Title"`)
//! 4. block quotes (`>`)
//! 5. tables (header row followed by a divider row)
//! 6. dividers (`---`, `***`, `___`)
//! 7. definition lists (`Term` followed by `: description`)
//! 8. numbered list items
//! 9. to-do items (`- [ ]`, `- [x]`)
//! 10. bulleted list items
//! 11. headings
//! 12. paragraphs
//!
//! Nested bodies (tabs, admonitions) are the following lines indented by at
//! least four columns; they are de-indented and parsed by the same routine.
//! Quote and callout bodies are the `>`-prefixed lines with the marker
//! removed.
//!
//! Parsing is total. A region that starts like a construct but cannot be
//! completed becomes a single [`Block::RawMarkdown`] plus a
//! [`ParseWarning`], and parsing resumes on the next line after the region.

use std::sync::LazyLock;

use regex::Regex;

use super::elements::{
    plain_text, Block, Cell, Definition, Document, InlineSpan, DEFAULT_TITLE,
};
use super::inline::tokenize;
use super::warning::{ParseWarning, WarningKind};

/// Column width of one nesting level.
pub const INDENT_WIDTH: usize = 4;

/// Deepest container nesting parsed structurally. Deeper bodies are kept
/// verbatim as raw markdown.
pub const MAX_NESTING_DEPTH: usize = 32;

static TABLE_DIVIDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?(?:\s*:?-+:?\s*\|)+(?:\s*:?-+:?)?\s*$").expect("valid regex")
});

static TAB_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^===[+!]?\s+"(?P<title>[^"]*)"\s*$"#).expect("valid regex"));

static CALLOUT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[!(?P<kind>[A-Za-z]+)\][+-]?(?:\s+(?P<title>.*))?$").expect("valid regex")
});

static ADMONITION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        concat!(
            r"^(?:!!!|\?\?\?\+?)\s+(?P<kind>[A-Za-z][\w-]*)",
            r#"(?:\s+[A-Za-z][\w-]*)*(?:\s+"(?P<title>[^"]*)")?\s*$"#,
        ),
    )
    .expect("valid regex")
});

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,9}[.)]\s+(?P<text>\S.*)$").expect("valid regex"));

static TODO_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-*+]\s+\[(?P<mark>[ xX])\](?:\s+(?P<text>.*))?$").expect("valid regex")
});

static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+]\s+(?P<text>\S.*)$").expect("valid regex"));

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<hashes>#{1,6})(?:[ \t]+(?P<text>.*?))?(?:[ \t]+#+)?[ \t]*$")
        .expect("valid regex")
});

static HEADING_ATTRS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\{[#.][^}]*\}$").expect("valid regex"));

/// Parsed document plus everything the parser noticed along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub document: Document,
    pub warnings: Vec<ParseWarning>,
    /// `title` from a leading YAML front matter block, if any.
    pub front_matter_title: Option<String>,
}

/// Parse a Markdown document.
///
/// Never fails: malformed regions are preserved as raw markdown and
/// reported through [`ParseOutcome::warnings`].
#[must_use]
pub fn parse_markdown(text: &str, source_path: &str) -> ParseOutcome {
    let lines: Vec<Line<'_>> = text
        .lines()
        .enumerate()
        .map(|(idx, text)| Line {
            number: idx + 1,
            text,
        })
        .collect();

    let (front_matter_title, body_start) = split_front_matter(&lines);

    let mut parser = BlockParser::default();
    let children = parser.parse_blocks(&lines[body_start..], 0);
    let title = infer_title(&children);

    ParseOutcome {
        document: Document {
            title,
            source_path: source_path.to_string(),
            children,
        },
        warnings: parser.warnings,
        front_matter_title,
    }
}

/// Text of the first top-level level-1 heading, else [`DEFAULT_TITLE`].
#[must_use]
pub fn infer_title(blocks: &[Block]) -> String {
    blocks
        .iter()
        .find_map(|block| match block {
            Block::Heading { level: 1, spans } => {
                Some(plain_text(spans)).filter(|t| !t.is_empty())
            }
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    text: &'a str,
}

#[derive(Default)]
struct BlockParser {
    warnings: Vec<ParseWarning>,
}

impl BlockParser {
    fn parse_blocks(&mut self, lines: &[Line<'_>], depth: usize) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            if is_blank(lines[i].text) {
                i += 1;
                continue;
            }
            i = self.parse_block(lines, i, depth, &mut blocks);
        }
        blocks
    }

    /// Parse one block starting at `i`, returning the index after it.
    fn parse_block(
        &mut self,
        lines: &[Line<'_>],
        i: usize,
        depth: usize,
        out: &mut Vec<Block>,
    ) -> usize {
        let line = lines[i];
        let indent = indent_width(line.text);
        let trimmed = line.text.trim_start();

        if indent < INDENT_WIDTH {
            if let Some(fence) = Fence::open(line.text) {
                return self.parse_fence(lines, i, &fence, out);
            }
            if trimmed.starts_with("===") && is_tab_marker(trimmed) {
                return self.parse_tab(lines, i, depth, out);
            }
            if trimmed.starts_with('>') {
                return self.parse_quote(lines, i, depth, out);
            }
            if trimmed.starts_with("!!!") || trimmed.starts_with("???") {
                return self.parse_admonition(lines, i, depth, out);
            }
            if let Some(next) = self.parse_table(lines, i, out) {
                return next;
            }
            if is_divider(trimmed) {
                out.push(Block::Divider);
                return i + 1;
            }
            if is_definition_start(lines, i) {
                return self.parse_definition_list(lines, i, out);
            }
        }

        if let Some(next) = self.parse_list_item(lines, i, out) {
            return next;
        }

        // Indented content outside any container (typically the body of a
        // list item) is parsed on its own and published alongside.
        if indent >= INDENT_WIDTH {
            let (body, end) = collect_indented_body(lines, i);
            out.extend(self.parse_body(&body, depth));
            return end;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            let level = u8::try_from(caps["hashes"].len()).unwrap_or(6);
            let text = caps.name("text").map_or("", |m| m.as_str());
            let text = HEADING_ATTRS.replace(text, "");
            out.push(Block::Heading {
                level,
                spans: tokenize(&text).spans,
            });
            return i + 1;
        }

        self.parse_paragraph(lines, i, out)
    }

    fn parse_fence(
        &mut self,
        lines: &[Line<'_>],
        i: usize,
        fence: &Fence,
        out: &mut Vec<Block>,
    ) -> usize {
        let close = lines[i + 1..]
            .iter()
            .position(|l| fence.closes(l.text))
            .map(|offset| i + 1 + offset);

        match close {
            Some(close) => {
                let code = lines[i + 1..close]
                    .iter()
                    .map(|l| strip_indent(l.text, fence.indent))
                    .collect::<Vec<_>>()
                    .join("\n");
                out.push(Block::CodeBlock {
                    language: fence.language.clone(),
                    code,
                });
                close + 1
            }
            None => {
                let end = lines[i + 1..]
                    .iter()
                    .position(|l| is_blank(l.text))
                    .map_or(lines.len(), |offset| i + 1 + offset);
                self.raw(
                    &lines[i..end],
                    WarningKind::UnterminatedFence,
                    "code",
                    "code fence is never closed",
                    out,
                );
                end
            }
        }
    }

    fn parse_tab(
        &mut self,
        lines: &[Line<'_>],
        i: usize,
        depth: usize,
        out: &mut Vec<Block>,
    ) -> usize {
        let header = lines[i].text.trim();
        let (mut body, mut end) = collect_indented_body(lines, i + 1);
        if body.is_empty() {
            // Unindented tab content runs to the next blank line.
            let lazy_end = lines[i + 1..]
                .iter()
                .position(|l| is_blank(l.text) || is_tab_marker(l.text.trim_start()))
                .map_or(lines.len(), |offset| i + 1 + offset);
            body = lines[i + 1..lazy_end].to_vec();
            end = lazy_end;
        }

        let title = TAB_HEADER
            .captures(header)
            .map(|caps| caps["title"].trim().to_string())
            .filter(|t| !t.is_empty());

        match title {
            Some(title) if !body.is_empty() => {
                let children = self.parse_body(&body, depth);
                out.push(Block::Toggle { title, children });
            }
            Some(_) => self.raw(
                &lines[i..end],
                WarningKind::MalformedTab,
                "tab",
                "tab has no content",
                out,
            ),
            None => self.raw(
                &lines[i..end],
                WarningKind::MalformedTab,
                "tab",
                "tab header must look like === \"Title\"",
                out,
            ),
        }
        end
    }

    fn parse_quote(
        &mut self,
        lines: &[Line<'_>],
        i: usize,
        depth: usize,
        out: &mut Vec<Block>,
    ) -> usize {
        let end = lines[i..]
            .iter()
            .position(|l| !l.text.trim_start().starts_with('>'))
            .map_or(lines.len(), |offset| i + offset);
        let body: Vec<Line<'_>> = lines[i..end]
            .iter()
            .map(|l| Line {
                number: l.number,
                text: strip_quote_marker(l.text),
            })
            .collect();

        let first = body[0].text.trim();
        if !first.starts_with("[!") {
            let children = self.parse_body(&body, depth);
            out.push(Block::Quote { children });
            return end;
        }

        let Some(caps) = CALLOUT_HEADER.captures(first) else {
            self.raw(
                &lines[i..end],
                WarningKind::MalformedCallout,
                "callout",
                "callout header must look like [!TYPE]",
                out,
            );
            return end;
        };

        let kind = caps["kind"].to_uppercase();
        let title = caps
            .name("title")
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty());
        let children = self.parse_body(&body[1..], depth);
        out.push(Block::Callout {
            kind,
            title,
            icon: None,
            children,
        });
        end
    }

    fn parse_admonition(
        &mut self,
        lines: &[Line<'_>],
        i: usize,
        depth: usize,
        out: &mut Vec<Block>,
    ) -> usize {
        let header = lines[i].text.trim();
        let (body, end) = collect_indented_body(lines, i + 1);
        let end = end.max(i + 1);

        let Some(caps) = ADMONITION_HEADER.captures(header) else {
            self.raw(
                &lines[i..end],
                WarningKind::MalformedCallout,
                "callout",
                "admonition needs a type, like !!! note \"Title\"",
                out,
            );
            return end;
        };

        let kind = caps["kind"].to_uppercase();
        let (icon, title) = match caps.name("title").map(|m| m.as_str().trim()) {
            Some(raw) => split_icon(raw),
            None => (None, None),
        };
        let children = self.parse_body(&body, depth);
        out.push(Block::Callout {
            kind,
            title,
            icon,
            children,
        });
        end
    }

    fn parse_table(&mut self, lines: &[Line<'_>], i: usize, out: &mut Vec<Block>) -> Option<usize> {
        let header = lines[i].text.trim();
        let next = lines.get(i + 1)?.text.trim();
        if !header.contains('|') {
            return None;
        }

        let end = lines[i..]
            .iter()
            .position(|l| is_blank(l.text) || !l.text.contains('|'))
            .map_or(lines.len(), |offset| i + offset);

        if TABLE_DIVIDER.is_match(next) {
            let header = split_row(header);
            let rows = lines[i + 2..end].iter().map(|l| split_row(l.text.trim())).collect();
            out.push(Block::Table { header, rows });
            return Some(end);
        }

        if header.starts_with('|') && next.starts_with('|') {
            let end = lines[i..]
                .iter()
                .position(|l| !l.text.trim_start().starts_with('|'))
                .map_or(lines.len(), |offset| i + offset);
            self.raw(
                &lines[i..end],
                WarningKind::MalformedTable,
                "table",
                "table is missing its divider row",
                out,
            );
            return Some(end);
        }

        None
    }

    fn parse_definition_list(
        &mut self,
        lines: &[Line<'_>],
        mut i: usize,
        out: &mut Vec<Block>,
    ) -> usize {
        let mut items = Vec::new();
        while i < lines.len() && is_definition_start(lines, i) {
            let term = tokenize(lines[i].text.trim()).spans;
            i += 1;

            let mut descriptions = Vec::new();
            while let Some(text) = lines.get(i).and_then(|l| definition_text(l.text)) {
                descriptions.push(tokenize(text).spans);
                i += 1;
            }
            items.push(Definition { term, descriptions });

            if lines.get(i).is_some_and(|l| is_blank(l.text)) {
                i += 1;
            }
        }
        out.push(Block::DefinitionList { items });
        i
    }

    fn parse_list_item(
        &mut self,
        lines: &[Line<'_>],
        i: usize,
        out: &mut Vec<Block>,
    ) -> Option<usize> {
        let line = lines[i];
        let trimmed = line.text.trim_start();

        let (kind, text) = if let Some(caps) = NUMBERED_ITEM.captures(trimmed) {
            (ListKind::Numbered, caps["text"].to_string())
        } else if let Some(caps) = TODO_ITEM.captures(trimmed) {
            let checked = matches!(&caps["mark"], "x" | "X");
            let text = caps.name("text").map_or("", |m| m.as_str()).to_string();
            (ListKind::Todo { checked }, text)
        } else if let Some(caps) = BULLET_ITEM.captures(trimmed) {
            (ListKind::Bulleted, caps["text"].to_string())
        } else {
            return None;
        };

        if indent_width(line.text) >= 2 {
            self.warnings.push(ParseWarning::new(
                WarningKind::FlattenedList,
                line.number,
                "list",
                "nested list item published at the top list level",
            ));
        }

        // Indented lines that start no block of their own continue the item.
        let mut text = text.trim().to_string();
        let mut j = i + 1;
        while j < lines.len() {
            let next = lines[j];
            if is_blank(next.text) || indent_width(next.text) == 0 || starts_block(lines, j) {
                break;
            }
            text.push(' ');
            text.push_str(next.text.trim());
            j += 1;
        }

        out.push(kind.block(tokenize(&text).spans));
        Some(j)
    }

    fn parse_paragraph(&mut self, lines: &[Line<'_>], i: usize, out: &mut Vec<Block>) -> usize {
        let mut j = i + 1;
        while j < lines.len() && !is_blank(lines[j].text) && !starts_block(lines, j) {
            j += 1;
        }
        let text = lines[i..j]
            .iter()
            .map(|l| l.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        lift_images(tokenize(&text).spans, out);
        j
    }

    /// Parse a container body one level deeper, or keep it verbatim once the
    /// nesting bound is reached.
    fn parse_body(&mut self, body: &[Line<'_>], depth: usize) -> Vec<Block> {
        if depth + 1 < MAX_NESTING_DEPTH {
            return self.parse_blocks(body, depth + 1);
        }
        let mut out = Vec::new();
        if !body.is_empty() {
            self.raw(
                body,
                WarningKind::NestingTooDeep,
                "container",
                "nesting is too deep to convert",
                &mut out,
            );
        }
        out
    }

    fn raw(
        &mut self,
        region: &[Line<'_>],
        kind: WarningKind,
        element: &'static str,
        reason: &str,
        out: &mut Vec<Block>,
    ) {
        let line = region.first().map_or(0, |l| l.number);
        self.warnings.push(ParseWarning::new(kind, line, element, reason));
        out.push(Block::RawMarkdown {
            text: region.iter().map(|l| l.text).collect::<Vec<_>>().join("\n"),
            reason: reason.to_string(),
        });
    }
}

#[derive(Clone, Copy)]
enum ListKind {
    Numbered,
    Bulleted,
    Todo { checked: bool },
}

impl ListKind {
    fn block(self, spans: Vec<InlineSpan>) -> Block {
        match self {
            Self::Numbered => Block::NumberedListItem { spans },
            Self::Bulleted => Block::BulletedListItem { spans },
            Self::Todo { checked } => Block::TodoListItem { checked, spans },
        }
    }
}

/// Opening code fence.
struct Fence {
    marker: char,
    len: usize,
    indent: usize,
    language: Option<String>,
}

impl Fence {
    fn open(text: &str) -> Option<Self> {
        let trimmed = text.trim_start();
        let marker = trimmed.chars().next().filter(|c| matches!(c, '`' | '~'))?;
        let len = trimmed.chars().take_while(|&c| c == marker).count();
        if len < 3 {
            return None;
        }
        let info = trimmed[len..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }
        let language = info
            .split_whitespace()
            .next()
            .map(|word| word.trim_matches(|c| matches!(c, '{' | '}' | '.')).to_string())
            .filter(|word| !word.is_empty());
        Some(Self {
            marker,
            len,
            indent: indent_width(text),
            language,
        })
    }

    fn closes(&self, text: &str) -> bool {
        let trimmed = text.trim();
        let run = trimmed.chars().take_while(|&c| c == self.marker).count();
        run >= self.len && run == trimmed.chars().count()
    }
}

/// Whether line `j` would start a block other than a paragraph.
fn starts_block(lines: &[Line<'_>], j: usize) -> bool {
    let text = lines[j].text;
    let trimmed = text.trim_start();
    let indent = indent_width(text);

    if indent < INDENT_WIDTH {
        if Fence::open(text).is_some()
            || (trimmed.starts_with("===") && is_tab_marker(trimmed))
            || trimmed.starts_with('>')
            || ADMONITION_HEADER.is_match(trimmed.trim_end())
            || is_divider(trimmed)
            || HEADING.is_match(trimmed)
            || is_definition_start(lines, j)
        {
            return true;
        }
        if trimmed.contains('|') {
            if let Some(next) = lines.get(j + 1) {
                let next = next.text.trim();
                let piped = trimmed.starts_with('|') && next.starts_with('|');
                if TABLE_DIVIDER.is_match(next) || piped {
                    return true;
                }
            }
        }
    }

    NUMBERED_ITEM.is_match(trimmed) || TODO_ITEM.is_match(trimmed) || BULLET_ITEM.is_match(trimmed)
}

/// Text after the `:` of a definition line.
fn definition_text(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix(':')?;
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then(|| rest.trim())
}

/// A non-blank term line directly followed by a definition line.
fn is_definition_start(lines: &[Line<'_>], i: usize) -> bool {
    let term = lines[i].text;
    indent_width(term) < INDENT_WIDTH
        && !is_blank(term)
        && definition_text(term).is_none()
        && lines.get(i + 1).is_some_and(|next| definition_text(next.text).is_some())
}

fn is_tab_marker(trimmed: &str) -> bool {
    let Some(rest) = trimmed.strip_prefix("===") else {
        return false;
    };
    let rest = rest.strip_prefix(['+', '!']).unwrap_or(rest);
    rest.is_empty() || rest.starts_with(char::is_whitespace)
}

fn is_divider(trimmed: &str) -> bool {
    let mut chars = trimmed.chars().filter(|c| !c.is_whitespace());
    let Some(first) = chars.next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_') {
        return false;
    }
    let mut count = 1;
    for c in chars {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Leading whitespace width in columns; a tab advances to the next stop.
fn indent_width(text: &str) -> usize {
    let mut col = 0;
    for ch in text.chars() {
        match ch {
            ' ' => col += 1,
            '\t' => col += INDENT_WIDTH - col % INDENT_WIDTH,
            _ => break,
        }
    }
    col
}

/// Remove up to `width` columns of leading whitespace.
fn strip_indent(text: &str, width: usize) -> &str {
    let mut col = 0;
    for (idx, ch) in text.char_indices() {
        if col >= width {
            return &text[idx..];
        }
        match ch {
            ' ' => col += 1,
            '\t' => col += INDENT_WIDTH - col % INDENT_WIDTH,
            _ => return &text[idx..],
        }
    }
    ""
}

fn strip_quote_marker(text: &str) -> &str {
    let trimmed = text.trim_start();
    let rest = trimmed.strip_prefix('>').unwrap_or(trimmed);
    rest.strip_prefix(' ').unwrap_or(rest)
}

/// Lines indented by at least one level, de-indented, with interior blank
/// lines kept and trailing ones dropped. Returns the body and the index of
/// the first line after it.
fn collect_indented_body<'a>(lines: &[Line<'a>], start: usize) -> (Vec<Line<'a>>, usize) {
    let mut body = Vec::new();
    let mut end = start;
    let mut kept = 0;

    for (offset, line) in lines[start..].iter().enumerate() {
        if is_blank(line.text) {
            body.push(Line {
                number: line.number,
                text: "",
            });
        } else if indent_width(line.text) >= INDENT_WIDTH {
            body.push(Line {
                number: line.number,
                text: strip_indent(line.text, INDENT_WIDTH),
            });
            end = start + offset + 1;
            kept = body.len();
        } else {
            break;
        }
    }

    body.truncate(kept);
    (body, end)
}

fn split_row(row: &str) -> Vec<Cell> {
    let inner = row.strip_prefix('|').unwrap_or(row);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);

    cells
        .iter()
        .map(|cell| Cell {
            spans: tokenize(cell.trim()).spans,
        })
        .collect()
}

/// `"📚 Navigation"` becomes icon `📚` and title `Navigation`.
fn split_icon(raw: &str) -> (Option<String>, Option<String>) {
    if raw.is_empty() {
        return (None, None);
    }
    let starts_with_symbol = raw
        .chars()
        .next()
        .is_some_and(|c| !c.is_ascii() && !c.is_alphanumeric());
    if starts_with_symbol {
        if let Some((icon, title)) = raw.split_once(char::is_whitespace) {
            let title = title.trim();
            return (
                Some(icon.to_string()),
                (!title.is_empty()).then(|| title.to_string()),
            );
        }
        return (Some(raw.to_string()), None);
    }
    (None, Some(raw.to_string()))
}

/// Emit a paragraph, moving its direct image spans out into sibling
/// [`Block::Image`] blocks in reading order.
fn lift_images(spans: Vec<InlineSpan>, out: &mut Vec<Block>) {
    let mut pending = Vec::new();
    for span in spans {
        match span {
            InlineSpan::Image { alt, source } => {
                push_paragraph(&mut pending, out);
                out.push(Block::Image { source, alt });
            }
            other => pending.push(other),
        }
    }
    push_paragraph(&mut pending, out);
}

fn push_paragraph(pending: &mut Vec<InlineSpan>, out: &mut Vec<Block>) {
    if pending.is_empty() {
        return;
    }
    let spans = std::mem::take(pending);
    if !plain_text(&spans).is_empty() {
        out.push(Block::Paragraph { spans });
    }
}

/// Strip a leading `---` YAML block whose content is a mapping.
fn split_front_matter(lines: &[Line<'_>]) -> (Option<String>, usize) {
    if lines.first().map(|l| l.text.trim_end()) != Some("---") {
        return (None, 0);
    }
    let Some(close) = lines[1..]
        .iter()
        .position(|l| matches!(l.text.trim_end(), "---" | "..."))
        .map(|offset| offset + 1)
    else {
        return (None, 0);
    };

    let yaml = lines[1..close].iter().map(|l| l.text).collect::<Vec<_>>().join("\n");
    match serde_yaml::from_str::<serde_yaml::Value>(&yaml) {
        Ok(serde_yaml::Value::Mapping(map)) => {
            let title = map
                .get("title")
                .and_then(serde_yaml::Value::as_str)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());
            (title, close + 1)
        }
        _ => (None, 0),
    }
}
