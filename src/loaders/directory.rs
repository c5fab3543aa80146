//! Markdown source discovery.
//!
//! Walks a docs root for `.md` files, skipping hidden files and directories,
//! and keeps them sorted by relative path. A file that cannot be read is
//! still listed, with its error, so one bad file never aborts a run.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::markdown::{parse_markdown, SourceWarning, WarningKind};
use crate::sync::normalize_key;

/// One Markdown file found under the docs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Forward-slash path relative to the docs root.
    pub relative_path: String,
    pub title: String,
    pub content: String,
    /// Why the file could not be read, if it could not.
    pub read_error: Option<String>,
}

/// All Markdown files under a docs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsDirectory {
    pub root: PathBuf,
    pub files: Vec<SourceFile>,
}

/// Read a source document as UTF-8 text.
///
/// # Errors
///
/// Returns an IO error if the file cannot be read or is not UTF-8.
pub fn read_document(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Title from a filename: `no-title_file.md` → `No Title File`.
#[must_use]
pub fn title_from_filename(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path);
    stem.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title declared by the document itself: front matter, then the first H1.
#[must_use]
pub fn extract_title(content: &str) -> Option<String> {
    let outcome = parse_markdown(content, "");
    outcome.front_matter_title.or_else(|| {
        (!outcome.document.has_default_title()).then_some(outcome.document.title)
    })
}

impl DocsDirectory {
    /// Load every Markdown file under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceNotFound`] if `root` is not a directory.
    pub fn load(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::SourceNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut paths = Vec::new();
        collect_markdown(root, &mut paths)?;

        let mut files: Vec<SourceFile> = paths
            .into_iter()
            .map(|path| {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                let relative_path = normalize_key(&relative.to_string_lossy());
                let (content, read_error) = match read_document(&path) {
                    Ok(content) => (content, None),
                    Err(e) => {
                        warn!(path = %relative_path, error = %e, "Could not read source file");
                        (String::new(), Some(e.to_string()))
                    }
                };
                let title = extract_title(&content)
                    .unwrap_or_else(|| title_from_filename(&relative_path));
                SourceFile {
                    path,
                    relative_path,
                    title,
                    content,
                    read_error,
                }
            })
            .collect();
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        debug!(root = %root.display(), files = files.len(), "Loaded docs directory");
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Look up a file by relative path (either separator style).
    #[must_use]
    pub fn get(&self, relative_path: &str) -> Option<&SourceFile> {
        let key = normalize_key(relative_path);
        self.files.iter().find(|f| f.relative_path == key)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.relative_path.as_str())
    }

    /// Missing titles, duplicate titles, invalid paths and unreadable files.
    #[must_use]
    pub fn validate(&self) -> Vec<SourceWarning> {
        let mut warnings = Vec::new();
        let mut seen_titles: Vec<(&str, &str)> = Vec::new();

        for file in &self.files {
            let path = file.relative_path.as_str();
            if file.title.trim().is_empty() {
                warnings.push(SourceWarning::for_file(
                    path,
                    WarningKind::Structure,
                    "document",
                    "missing title",
                ));
            }
            if let Some((_, first)) = seen_titles.iter().find(|(title, _)| *title == file.title) {
                warnings.push(SourceWarning::for_file(
                    path,
                    WarningKind::Structure,
                    "document",
                    format!("duplicate title '{}' (also used by {first})", file.title),
                ));
            } else {
                seen_titles.push((&file.title, path));
            }
            if !is_valid_relative(path) {
                warnings.push(SourceWarning::for_file(
                    path,
                    WarningKind::Structure,
                    "document",
                    "invalid relative path",
                ));
            }
            if let Some(error) = &file.read_error {
                warnings.push(SourceWarning::for_file(
                    path,
                    WarningKind::FileIo,
                    "document",
                    format!("unreadable file: {error}"),
                ));
            }
        }
        warnings
    }

    /// Indented tree of folders and files with their titles.
    #[must_use]
    pub fn pretty(&self) -> String {
        let root_name = self
            .root
            .file_name()
            .map_or_else(|| self.root.display().to_string(), |n| n.to_string_lossy().into_owned());
        let mut lines = vec![format!("{root_name}/")];
        let mut open_dirs: Vec<&str> = Vec::new();

        let mut files: Vec<&SourceFile> = self.files.iter().collect();
        files.sort_by(|a, b| tree_key(&a.relative_path).cmp(&tree_key(&b.relative_path)));

        for file in files {
            let parts: Vec<&str> = file.relative_path.split('/').collect();
            let Some((name, dirs)) = parts.split_last() else {
                continue;
            };
            let common = open_dirs.iter().zip(dirs).take_while(|(a, b)| a == b).count();
            open_dirs.truncate(common);
            for dir in &dirs[common..] {
                lines.push(format!("{}{dir}/", "  ".repeat(open_dirs.len() + 1)));
                open_dirs.push(*dir);
            }
            lines.push(format!("{}{name} ({})", "  ".repeat(dirs.len() + 1), file.title));
        }
        lines.join("\n")
    }
}

/// Sort key placing a folder's files before its subfolders.
fn tree_key(path: &str) -> (Vec<&str>, &str) {
    let mut parts: Vec<&str> = path.split('/').collect();
    let name = parts.pop().unwrap_or_default();
    (parts, name)
}

fn is_valid_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_markdown(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_title_from_filename() {
        assert_eq!(title_from_filename("no-title-file.md"), "No Title File");
        assert_eq!(title_from_filename("guide/getting_started.md"), "Getting Started");
        assert_eq!(title_from_filename("API.md"), "Api");
    }

    #[test]
    fn test_extract_title_precedence() {
        assert_eq!(
            extract_title("---\ntitle: From Front\n---\n# Heading\n").as_deref(),
            Some("From Front")
        );
        assert_eq!(extract_title("intro\n\n# Heading\n").as_deref(), Some("Heading"));
        assert_eq!(extract_title("```\n# not a heading\n```\n"), None);
    }

    #[test]
    fn test_load_skips_hidden_and_sorts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.md", "# B\n");
        write(dir.path(), "a/z.md", "# Z\n");
        write(dir.path(), "a/c.md", "body only\n");
        write(dir.path(), ".hidden.md", "# Hidden\n");
        write(dir.path(), ".cache/x.md", "# X\n");
        write(dir.path(), "notes.txt", "not markdown\n");

        let docs = DocsDirectory::load(dir.path()).unwrap();
        let paths: Vec<&str> = docs.paths().collect();
        assert_eq!(paths, vec!["a/c.md", "a/z.md", "b.md"]);
        assert_eq!(docs.get("a\\c.md").unwrap().title, "C");
        assert_eq!(docs.get("b.md").unwrap().title, "B");
    }

    #[test]
    fn test_load_missing_root() {
        let dir = TempDir::new().unwrap();
        let result = DocsDirectory::load(&dir.path().join("nope"));
        assert!(matches!(result, Err(Error::SourceNotFound { .. })));
    }

    #[test]
    fn test_unreadable_file_is_recorded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();
        write(dir.path(), "good.md", "# Good\n");

        let docs = DocsDirectory::load(dir.path()).unwrap();
        let bad = docs.get("bad.md").unwrap();
        assert!(bad.read_error.is_some());
        assert_eq!(bad.title, "Bad");

        let warnings = docs.validate();
        assert!(warnings
            .iter()
            .any(|w| w.warning.kind == WarningKind::FileIo && w.source_path == "bad.md"));
    }

    #[test]
    fn test_validate_duplicate_titles() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "one.md", "# Same\n");
        write(dir.path(), "two.md", "# Same\n");

        let warnings = DocsDirectory::load(dir.path()).unwrap().validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].source_path, "two.md");
        assert!(warnings[0].warning.message.contains("one.md"));
    }

    #[test]
    fn test_pretty_tree() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.md", "# Home\n");
        write(dir.path(), "guide/intro.md", "# Intro\n");

        let docs = DocsDirectory::load(dir.path()).unwrap();
        let pretty = docs.pretty();
        let lines: Vec<&str> = pretty.lines().collect();
        assert!(lines[0].ends_with('/'));
        assert_eq!(lines[1], "  index.md (Home)");
        assert_eq!(lines[2], "  guide/");
        assert_eq!(lines[3], "    intro.md (Intro)");
    }
}
