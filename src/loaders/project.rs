//! Docs project resolution.
//!
//! The source argument may be an MkDocs project root, the `mkdocs.yml`
//! itself, or a plain directory of Markdown files.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::loaders::directory::DocsDirectory;
use crate::loaders::nav::{nav_from_config, NavNode};
use crate::markdown::{SourceWarning, WarningKind};

pub const MKDOCS_CONFIG: &str = "mkdocs.yml";
pub const DEFAULT_DOCS_DIR: &str = "docs";

/// Loaded documents plus the optional nav that orders them.
#[derive(Debug, Clone)]
pub struct DocsProject {
    pub docs_path: PathBuf,
    pub mkdocs_yml: Option<PathBuf>,
    pub directory: DocsDirectory,
    pub nav: Option<NavNode>,
}

impl DocsProject {
    /// Resolve and load a project.
    ///
    /// `mkdocs_override` wins over a `mkdocs.yml` found at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceNotFound`] if `target` or the resolved docs
    /// directory does not exist, or a YAML/nav error for a bad config.
    pub fn load(target: &Path, mkdocs_override: Option<&Path>) -> Result<Self> {
        if !target.exists() {
            return Err(Error::SourceNotFound {
                path: target.to_path_buf(),
            });
        }

        let config_path = resolve_config(target, mkdocs_override);
        let (docs_path, nav) = match &config_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::SourceNotFound { path: path.clone() });
                }
                let config: Value = serde_yaml::from_str(&std::fs::read_to_string(path)?)?;
                let docs_dir = config
                    .get("docs_dir")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_DOCS_DIR);
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                info!(config = %path.display(), docs_dir, "Using MkDocs configuration");
                (base.join(docs_dir), nav_from_config(&config, path)?)
            }
            None => (target.to_path_buf(), None),
        };

        let directory = DocsDirectory::load(&docs_path)?;
        debug!(docs = %docs_path.display(), has_nav = nav.is_some(), "Loaded project");
        Ok(Self {
            docs_path,
            mkdocs_yml: config_path,
            directory,
            nav,
        })
    }

    /// Name used for log files: the docs directory name.
    #[must_use]
    pub fn root_name(&self) -> String {
        self.docs_path
            .file_name()
            .map_or_else(|| "docs".to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// Directory warnings, nav warnings, and documents missing from the nav.
    #[must_use]
    pub fn validate_structure(&self) -> Vec<SourceWarning> {
        let mut warnings = self.directory.validate();
        if let Some(nav) = &self.nav {
            warnings.extend(nav.validate(&self.directory));
            let referenced = nav.referenced_files();
            for path in self.directory.paths() {
                if !referenced.contains(&path) {
                    warnings.push(SourceWarning::for_file(
                        path,
                        WarningKind::Structure,
                        "nav",
                        "document not listed in mkdocs nav",
                    ));
                }
            }
        }
        warnings
    }

    /// Nav view with document titles, or the directory tree without a nav.
    #[must_use]
    pub fn pretty(&self) -> String {
        match &self.nav {
            Some(nav) => nav.pretty(),
            None => self.directory.pretty(),
        }
    }
}

fn resolve_config(target: &Path, mkdocs_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = mkdocs_override {
        return Some(path.to_path_buf());
    }
    if target.is_file() && target.file_name().is_some_and(|n| n == MKDOCS_CONFIG) {
        return Some(target.to_path_buf());
    }
    let candidate = target.join(MKDOCS_CONFIG);
    candidate.is_file().then_some(candidate)
}
