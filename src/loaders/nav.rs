//! MkDocs navigation (`nav:` in `mkdocs.yml`).
//!
//! Entries may be a bare path (`- index.md`), a titled page
//! (`- Home: index.md`) or a titled section (`- Guide: [...]`).

use std::collections::HashSet;
use std::path::Path;

use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::loaders::directory::DocsDirectory;
use crate::markdown::{SourceWarning, WarningKind};
use crate::sync::normalize_key;

/// One nav entry. The root node is synthetic and titled `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavNode {
    pub title: String,
    /// Docs-relative path, forward slashes.
    pub file: Option<String>,
    pub children: Vec<NavNode>,
}

impl NavNode {
    fn root(children: Vec<NavNode>) -> Self {
        Self {
            title: "root".to_string(),
            file: None,
            children,
        }
    }

    /// Files referenced anywhere below this node, in nav order.
    #[must_use]
    pub fn referenced_files(&self) -> Vec<&str> {
        let mut files = Vec::new();
        self.walk(&mut |node| {
            if let Some(file) = &node.file {
                files.push(file.as_str());
            }
        });
        files
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a NavNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Missing files, duplicate entries and empty sections.
    #[must_use]
    pub fn validate(&self, docs: &DocsDirectory) -> Vec<SourceWarning> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        self.walk(&mut |node| {
            match &node.file {
                Some(file) => {
                    if docs.get(file).is_none() {
                        warnings.push(SourceWarning::for_file(
                            file.as_str(),
                            WarningKind::MissingPage,
                            "nav",
                            format!("nav entry '{}' references a missing file", node.title),
                        ));
                    }
                    if !seen.insert(file.as_str()) {
                        warnings.push(SourceWarning::for_file(
                            file.as_str(),
                            WarningKind::Structure,
                            "nav",
                            "duplicate nav entry",
                        ));
                    }
                }
                None if node.children.is_empty() && node.title != "root" => {
                    warnings.push(SourceWarning::for_file(
                        "mkdocs.yml",
                        WarningKind::Structure,
                        "nav",
                        format!("empty nav section '{}'", node.title),
                    ));
                }
                None => {}
            }
        });
        warnings
    }

    /// Indented rendering of the nav below this node.
    #[must_use]
    pub fn pretty(&self) -> String {
        let mut lines = vec!["Navigation:".to_string()];
        render(&self.children, 1, &mut lines);
        lines.join("\n")
    }
}

fn render(nodes: &[NavNode], depth: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let target = node.file.as_ref().map(|f| format!(" → {f}")).unwrap_or_default();
        lines.push(format!("{}- {}{target}", "  ".repeat(depth), node.title));
        render(&node.children, depth + 1, lines);
    }
}

/// Build the nav tree from a parsed `mkdocs.yml`.
///
/// Returns `None` when the config has no `nav` key.
///
/// # Errors
///
/// Returns [`Error::Nav`] for entries of an unsupported shape.
pub fn nav_from_config(config: &Value, config_path: &Path) -> Result<Option<NavNode>> {
    let Some(nav) = config.get("nav") else {
        return Ok(None);
    };
    let invalid = |message: String| Error::Nav {
        path: config_path.to_path_buf(),
        message,
    };
    let items = nav
        .as_sequence()
        .ok_or_else(|| invalid("nav must be a list".to_string()))?;
    Ok(Some(NavNode::root(parse_entries(items).map_err(invalid)?)))
}

/// Read `mkdocs.yml` and return its nav tree.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not YAML, or has an
/// invalid nav.
pub fn load_navigation(config_path: &Path) -> Result<Option<NavNode>> {
    let text = std::fs::read_to_string(config_path)?;
    let config: Value = serde_yaml::from_str(&text)?;
    nav_from_config(&config, config_path)
}

fn parse_entries(items: &[Value]) -> std::result::Result<Vec<NavNode>, String> {
    items.iter().map(parse_entry).collect()
}

fn parse_entry(item: &Value) -> std::result::Result<NavNode, String> {
    match item {
        Value::String(path) => Ok(NavNode {
            title: nav_title_from_path(path),
            file: Some(normalize_key(path)),
            children: Vec::new(),
        }),
        Value::Mapping(map) => {
            let mut entries = map.iter();
            let (Some((key, value)), None) = (entries.next(), entries.next()) else {
                return Err("each nav entry must have a single key".to_string());
            };
            let title = scalar_string(key).ok_or_else(|| "nav titles must be strings".to_string())?;
            match value {
                Value::String(path) => Ok(NavNode {
                    title,
                    file: Some(normalize_key(path)),
                    children: Vec::new(),
                }),
                Value::Sequence(children) => Ok(NavNode {
                    title,
                    file: None,
                    children: parse_entries(children)?,
                }),
                _ => Err(format!("unsupported nav entry for '{title}'")),
            }
        }
        other => Err(format!("unsupported nav entry: {other:?}")),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Nav title for a bare path entry: the stem with separators as spaces,
/// first letter capitalized.
fn nav_title_from_path(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .replace(['_', '-'], " ");
    let mut chars = stem.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}
