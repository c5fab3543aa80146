//! Configuration management.
//!
//! Settings resolve per key with the priority env var > config file >
//! default. The config file lives at `~/.mkdocs2notion/config.json`:
//!
//! ```json
//! {
//!   "notion_token": "secret_...",
//!   "parent_page_id": "https://www.notion.so/team/Docs-0123456789abcdef0123456789abcdef",
//!   "asset_base_url": "https://docs.example.com/",
//!   "rate_limit": 3
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::notion::rate_limit::DEFAULT_CALLS_PER_SECOND;
use crate::notion::retry::DEFAULT_MAX_ATTEMPTS;

pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

pub const ENV_TOKEN: &str = "NOTION_TOKEN";
pub const ENV_PARENT: &str = "NOTION_PARENT_PAGE_ID";
pub const ENV_VERSION: &str = "NOTION_VERSION";
pub const ENV_BASE_URL: &str = "NOTION_BASE_URL";
pub const ENV_ASSET_BASE_URL: &str = "MKDOCS2NOTION_ASSET_BASE_URL";
pub const ENV_RATE_LIMIT: &str = "MKDOCS2NOTION_RATE_LIMIT";
pub const ENV_MAX_RETRIES: &str = "MKDOCS2NOTION_MAX_RETRIES";

/// Contents of the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub notion_token: Option<String>,
    pub parent_page_id: Option<String>,
    pub notion_version: Option<String>,
    pub base_url: Option<String>,
    pub asset_base_url: Option<String>,
    pub rate_limit: Option<u32>,
    pub max_retries: Option<u32>,
}

/// Fully resolved settings for talking to Notion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionSettings {
    pub token: String,
    /// Normalized, dashed page id.
    pub parent_page_id: Option<String>,
    pub api_version: String,
    pub base_url: String,
    pub asset_base_url: Option<String>,
    /// Calls per second.
    pub rate_limit: u32,
    /// Attempts per remote call, including the first.
    pub max_attempts: u32,
}

impl NotionSettings {
    /// Defaults for everything except the token.
    #[must_use]
    pub fn for_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            parent_page_id: None,
            api_version: DEFAULT_NOTION_VERSION.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            asset_base_url: None,
            rate_limit: DEFAULT_CALLS_PER_SECOND,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Resolve settings from the environment and the config file.
    ///
    /// `parent_override` (from the command line) beats both.
    ///
    /// # Errors
    ///
    /// Returns a config error if the token is missing, the parent id cannot
    /// be normalized, or the config file is unreadable.
    pub fn resolve(parent_override: Option<&str>) -> Result<Self> {
        let file = load_config()?;
        Self::from_sources(|key| std::env::var(key).ok(), &file, parent_override)
    }

    /// Resolve settings from an env lookup and a parsed config file.
    ///
    /// # Errors
    ///
    /// See [`NotionSettings::resolve`].
    pub fn from_sources(
        env: impl Fn(&str) -> Option<String>,
        file: &FileConfig,
        parent_override: Option<&str>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let token = env(ENV_TOKEN)
            .or_else(|| file.notion_token.clone())
            .ok_or(Error::MissingToken)?;

        let parent = parent_override
            .map(str::to_string)
            .or_else(|| env(ENV_PARENT))
            .or_else(|| file.parent_page_id.clone())
            .map(|raw| normalize_parent_id(&raw))
            .transpose()?;

        let rate_limit = match env(ENV_RATE_LIMIT) {
            Some(raw) => parse_number(ENV_RATE_LIMIT, &raw)?,
            None => file.rate_limit.unwrap_or(DEFAULT_CALLS_PER_SECOND),
        };
        let max_attempts = match env(ENV_MAX_RETRIES) {
            Some(raw) => parse_number(ENV_MAX_RETRIES, &raw)?,
            None => file.max_retries.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        }
        .max(1);

        Ok(Self {
            token,
            parent_page_id: parent,
            api_version: env(ENV_VERSION)
                .or_else(|| file.notion_version.clone())
                .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            base_url: env(ENV_BASE_URL)
                .or_else(|| file.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            asset_base_url: env(ENV_ASSET_BASE_URL).or_else(|| file.asset_base_url.clone()),
            rate_limit,
            max_attempts,
        })
    }

    /// The parent page id, or a config error naming how to supply one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParent`] when no parent was configured.
    pub fn require_parent(&self) -> Result<&str> {
        self.parent_page_id.as_deref().ok_or(Error::MissingParent)
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got '{raw}'")))
}

/// Normalize a Notion page id or URL to dashed UUID form.
///
/// Accepts a raw 32-character id, a dashed UUID, or a page URL whose last
/// path segment ends in the id.
///
/// # Errors
///
/// Returns an invalid-argument error if no 32-hex-digit id can be found.
pub fn normalize_parent_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    let segment = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query);
    let compact: String = segment.chars().filter(|c| *c != '-').collect();

    let candidate = compact
        .char_indices()
        .rev()
        .nth(31)
        .map(|(idx, _)| &compact[idx..])
        .ok_or_else(|| invalid_parent(raw))?;

    uuid::Uuid::try_parse(candidate)
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| invalid_parent(raw))
}

fn invalid_parent(raw: &str) -> Error {
    Error::InvalidArgument(format!("'{raw}' is not a Notion page id or URL"))
}

/// Path of the user config file.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|b| b.home_dir().join(".mkdocs2notion").join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the user config file, or defaults when it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<FileConfig> {
    load_config_from(&config_path()?)
}

/// Asset base URL for commands that never talk to Notion.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
pub fn resolve_asset_base_url() -> Result<Option<String>> {
    if let Some(url) = std::env::var(ENV_ASSET_BASE_URL).ok().filter(|v| !v.trim().is_empty()) {
        return Ok(Some(url));
    }
    Ok(load_config()?.asset_base_url)
}

/// Load a config file from an explicit path.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_from(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_normalize_raw_and_dashed_ids() {
        let dashed = "01234567-89ab-cdef-0123-456789abcdef";
        assert_eq!(normalize_parent_id("0123456789abcdef0123456789abcdef").unwrap(), dashed);
        assert_eq!(normalize_parent_id(dashed).unwrap(), dashed);
        assert_eq!(normalize_parent_id("0123456789ABCDEF0123456789ABCDEF").unwrap(), dashed);
    }

    #[test]
    fn test_normalize_notion_url() {
        let url = "https://www.notion.so/team/Docs-Home-0123456789abcdef0123456789abcdef?pvs=4";
        assert_eq!(
            normalize_parent_id(url).unwrap(),
            "01234567-89ab-cdef-0123-456789abcdef"
        );
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(normalize_parent_id("not-an-id").is_err());
        assert!(normalize_parent_id("").is_err());
        assert!(normalize_parent_id("zzzz56789abcdef0123456789abcdef0").is_err());
    }

    #[test]
    fn test_env_beats_file_beats_default() {
        let file = FileConfig {
            notion_token: Some("file-token".into()),
            notion_version: Some("2099-01-01".into()),
            rate_limit: Some(10),
            ..FileConfig::default()
        };
        let env = env_of(&[(ENV_TOKEN, "env-token")]);
        let settings = NotionSettings::from_sources(env, &file, None).unwrap();
        assert_eq!(settings.token, "env-token");
        assert_eq!(settings.api_version, "2099-01-01");
        assert_eq!(settings.rate_limit, 10);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_missing_token_is_error() {
        let env = env_of(&[(ENV_TOKEN, "  ")]);
        let result = NotionSettings::from_sources(env, &FileConfig::default(), None);
        assert!(matches!(result, Err(Error::MissingToken)));
    }

    #[test]
    fn test_parent_override_wins() {
        let env = env_of(&[
            (ENV_TOKEN, "t"),
            (ENV_PARENT, "ffffffffffffffffffffffffffffffff"),
        ]);
        let parent = Some("0123456789abcdef0123456789abcdef");
        let settings = NotionSettings::from_sources(env, &FileConfig::default(), parent).unwrap();
        assert_eq!(settings.require_parent().unwrap(), "01234567-89ab-cdef-0123-456789abcdef");
    }

    #[test]
    fn test_bad_rate_limit_is_config_error() {
        let env = env_of(&[(ENV_TOKEN, "t"), (ENV_RATE_LIMIT, "fast")]);
        let result = NotionSettings::from_sources(env, &FileConfig::default(), None);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(load_config_from(&path).unwrap(), FileConfig::default());

        fs::write(&path, r#"{"notion_token": "abc", "max_retries": 2}"#).unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.notion_token.as_deref(), Some("abc"));
        assert_eq!(config.max_retries, Some(2));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_config_from(&path), Err(Error::Config(_))));
    }
}
