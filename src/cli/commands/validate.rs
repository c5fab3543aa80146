//! Validate command: structure and Markdown checks, offline.

use colored::Colorize;

use crate::cli::commands::print_warnings;
use crate::cli::SourceArgs;
use crate::config::resolve_asset_base_url;
use crate::error::{Error, Result};
use crate::loaders::{DocsProject, PublishItem};
use crate::markdown::SourceWarning;
use crate::notion::SerializeOptions;
use crate::sync::prepare;

/// Every warning a push of `project` would raise, structure first.
#[must_use]
pub fn collect_warnings(
    project: &DocsProject,
    options: &SerializeOptions,
) -> Vec<SourceWarning> {
    let mut warnings = project.validate_structure();
    for file in project.directory.files.iter().filter(|f| f.read_error.is_none()) {
        let item = PublishItem {
            source_path: file.relative_path.clone(),
            nav_title: None,
            parent_path: None,
            text: file.content.clone(),
            read_error: None,
        };
        warnings.extend(prepare(&item, options).warnings);
    }
    warnings
}

/// Execute the validate command.
///
/// # Errors
///
/// Returns an error if the docs tree cannot be loaded, or `--strict` is set
/// and warnings were raised.
pub fn execute(args: &SourceArgs, json: bool, quiet: bool) -> Result<()> {
    let project = DocsProject::load(&args.path, args.mkdocs.as_deref())?;
    let options = SerializeOptions {
        asset_base_url: resolve_asset_base_url()?,
        docs_root: Some(project.docs_path.clone()),
    };
    let warnings = collect_warnings(&project, &options);

    if json {
        let output = serde_json::json!({
            "docs_path": project.docs_path.display().to_string(),
            "mkdocs_yml": project.mkdocs_yml.as_ref().map(|p| p.display().to_string()),
            "documents": project.directory.files.len(),
            "valid": warnings.is_empty(),
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else if !quiet {
        println!("{}", project.pretty());
        println!();
        if warnings.is_empty() {
            let count = project.directory.files.len();
            println!("{} {count} documents, no warnings", "✓".green());
        } else {
            println!("{}", format!("{} warnings", warnings.len()).yellow());
            print_warnings(&warnings);
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(Error::StrictWarnings { count: warnings.len() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_warnings_covers_structure_and_markdown() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.md"), "# Home\n\n```rust\nfn main() {}\n").unwrap();
        fs::write(dir.path().join("other.md"), "# Other\n\nFine.\n").unwrap();
        fs::write(
            dir.path().join("mkdocs.yml"),
            "docs_dir: .\nnav:\n  - Home: index.md\n  - Gone: missing.md\n",
        )
        .unwrap();

        let project = DocsProject::load(dir.path(), None).unwrap();
        let warnings = collect_warnings(&project, &SerializeOptions::default());
        let lines: Vec<String> = warnings.iter().map(ToString::to_string).collect();

        assert!(lines.iter().any(|l| l.contains("missing.md")), "{lines:?}");
        let has = |file: &str, text: &str| {
            lines.iter().any(|l| l.starts_with(file) && l.contains(text))
        };
        assert!(has("other.md", "not listed"), "{lines:?}");
        assert!(has("index.md", "W003"), "{lines:?}");
    }

    #[test]
    fn test_local_images_resolve_against_docs_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("guide/img")).unwrap();
        fs::write(dir.path().join("guide/img/flow.png"), b"png").unwrap();
        fs::write(
            dir.path().join("guide/setup.md"),
            "# Setup\n\n![flow](img/flow.png)\n\n![gone](img/gone.png)\n",
        )
        .unwrap();

        let project = DocsProject::load(dir.path(), None).unwrap();
        let options = SerializeOptions {
            docs_root: Some(project.docs_path.clone()),
            ..SerializeOptions::default()
        };
        let warnings = collect_warnings(&project, &options);
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].to_string().contains("img/gone.png"));
    }

    #[test]
    fn test_clean_tree_has_no_warnings() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.md"), "# Home\n\nHello.\n").unwrap();
        let project = DocsProject::load(dir.path(), None).unwrap();
        assert!(collect_warnings(&project, &SerializeOptions::default()).is_empty());
    }
}
