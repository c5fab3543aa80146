//! Publish plan: which documents to push, in what order, under which parent.

use crate::loaders::directory::{title_from_filename, SourceFile};
use crate::loaders::nav::NavNode;
use crate::loaders::project::DocsProject;
use crate::markdown::ParseOutcome;

/// One document ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishItem {
    /// Docs-relative path; the identity-map key.
    pub source_path: String,
    /// Title from the nav entry, which overrides the document's own.
    pub nav_title: Option<String>,
    /// Source path of the nearest ancestor nav entry that has a file.
    /// `None` publishes directly under the root parent page.
    pub parent_path: Option<String>,
    pub text: String,
    pub read_error: Option<String>,
}

impl PublishItem {
    fn from_file(
        file: &SourceFile,
        nav_title: Option<String>,
        parent_path: Option<String>,
    ) -> Self {
        Self {
            source_path: file.relative_path.clone(),
            nav_title,
            parent_path,
            text: file.content.clone(),
            read_error: file.read_error.clone(),
        }
    }

    /// Page title: nav title, front matter title, first H1, then filename.
    #[must_use]
    pub fn resolve_title(&self, parsed: &ParseOutcome) -> String {
        self.nav_title
            .clone()
            .or_else(|| parsed.front_matter_title.clone())
            .or_else(|| {
                (!parsed.document.has_default_title()).then(|| parsed.document.title.clone())
            })
            .unwrap_or_else(|| title_from_filename(&self.source_path))
    }
}

/// Order documents for publishing.
///
/// With a nav, documents appear in nav order and nest under the nearest
/// ancestor entry with a file. A section whose first entry is an
/// `index.md` (or `README.md`) publishes that page under the section's
/// title and nests the rest of the section under it. Nav entries without a
/// matching file are skipped. Without a nav, every document goes under the
/// root in directory order.
#[must_use]
pub fn build_publish_plan(project: &DocsProject) -> Vec<PublishItem> {
    let Some(nav) = &project.nav else {
        return project
            .directory
            .files
            .iter()
            .map(|file| PublishItem::from_file(file, None, None))
            .collect();
    };

    let mut plan = Vec::new();
    walk(project, &nav.children, None, &mut plan);
    plan
}

fn is_index_page(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    name == "index.md" || name.eq_ignore_ascii_case("readme.md")
}

fn walk(
    project: &DocsProject,
    nodes: &[NavNode],
    parent_path: Option<&str>,
    plan: &mut Vec<PublishItem>,
) {
    for node in nodes {
        let mut file = node.file.as_deref();
        let mut children = node.children.as_slice();
        if file.is_none() {
            if let Some((first, rest)) = children.split_first() {
                if first.children.is_empty() && first.file.as_deref().is_some_and(is_index_page) {
                    file = first.file.as_deref();
                    children = rest;
                }
            }
        }

        let mut next_parent = parent_path;
        if let Some(source) = file.and_then(|f| project.directory.get(f)) {
            if plan.iter().all(|item| item.source_path != source.relative_path) {
                plan.push(PublishItem::from_file(
                    source,
                    Some(node.title.clone()),
                    parent_path.map(str::to_string),
                ));
            }
            next_parent = Some(source.relative_path.as_str());
        }
        walk(project, children, next_parent, plan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse_markdown;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_directory_order_without_nav() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.md", "# B\n");
        write(dir.path(), "a.md", "# A\n");
        let project = DocsProject::load(dir.path(), None).unwrap();

        let plan = build_publish_plan(&project);
        let paths: Vec<&str> = plan.iter().map(|i| i.source_path.as_str()).collect();
        assert_eq!(paths, vec!["a.md", "b.md"]);
        assert!(plan.iter().all(|i| i.parent_path.is_none() && i.nav_title.is_none()));
    }

    #[test]
    fn test_nav_order_and_section_index_parents() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "mkdocs.yml",
            concat!(
                "nav:\n",
                "  - Home: index.md\n",
                "  - Guide:\n",
                "      - Overview: guide/index.md\n",
                "      - Section:\n",
                "          - Deep: guide/deep.md\n",
                "  - Missing: gone.md\n",
            ),
        );
        write(dir.path(), "docs/index.md", "# Home\n");
        write(dir.path(), "docs/guide/index.md", "# Guide\n");
        write(dir.path(), "docs/guide/deep.md", "# Deep\n");
        let project = DocsProject::load(dir.path(), None).unwrap();

        let plan = build_publish_plan(&project);
        let summary: Vec<(&str, Option<&str>)> = plan
            .iter()
            .map(|i| (i.source_path.as_str(), i.parent_path.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("index.md", None),
                ("guide/index.md", None),
                ("guide/deep.md", Some("guide/index.md")),
            ]
        );
        assert_eq!(plan[1].nav_title.as_deref(), Some("Guide"));
        assert_eq!(plan[2].nav_title.as_deref(), Some("Deep"));
    }

    #[test]
    fn test_sections_without_index_stay_flat() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "mkdocs.yml",
            concat!(
                "nav:\n",
                "  - Home: index.md\n",
                "  - Guide:\n",
                "      - guide/intro.md\n",
                "      - More:\n",
                "          - guide/more.md\n",
            ),
        );
        write(dir.path(), "docs/index.md", "# Home\n");
        write(dir.path(), "docs/guide/intro.md", "# Intro\n");
        write(dir.path(), "docs/guide/more.md", "# More\n");
        let project = DocsProject::load(dir.path(), None).unwrap();

        let plan = build_publish_plan(&project);
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|i| i.parent_path.is_none()));
    }

    #[test]
    fn test_title_precedence() {
        let item = PublishItem {
            source_path: "guide/no-title.md".into(),
            nav_title: None,
            parent_path: None,
            text: String::new(),
            read_error: None,
        };
        let with_front = parse_markdown("---\ntitle: Front\n---\n# Heading\n", "x.md");
        let with_h1 = parse_markdown("# Heading\n", "x.md");
        let bare = parse_markdown("just text\n", "x.md");

        assert_eq!(item.resolve_title(&with_front), "Front");
        assert_eq!(item.resolve_title(&with_h1), "Heading");
        assert_eq!(item.resolve_title(&bare), "No Title");

        let nav_item = PublishItem {
            nav_title: Some("From Nav".into()),
            ..item
        };
        assert_eq!(nav_item.resolve_title(&with_front), "From Nav");
    }
}
