//! Atomic file operations for sync.
//!
//! The identity map and warning logs are written with [`atomic_write`]:
//! write to a temp file, sync to disk, then rename. A crash mid-write
//! leaves the previous file intact.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::markdown::SourceWarning;
use crate::sync::types::SyncResult;

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file (same path with `.tmp` appended)
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> SyncResult<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Log file path for a run over `root_name`: `<root>_<YYYY-MM-DD-HHMM>.log`.
///
/// Characters outside `[A-Za-z0-9_-]` in the root name become `_`.
#[must_use]
pub fn warning_log_path(dir: &Path, root_name: &str, now: DateTime<Local>) -> PathBuf {
    let mut sanitized: String = root_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        sanitized = "docs".to_string();
    }
    dir.join(format!("{sanitized}_{}.log", now.format("%Y-%m-%d-%H%M")))
}

/// Write one warning per line to a timestamped log file under `dir`.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_warning_log(
    dir: &Path,
    root_name: &str,
    warnings: &[SourceWarning],
) -> SyncResult<PathBuf> {
    let path = warning_log_path(dir, root_name, Local::now());
    let mut content = String::new();
    for warning in warnings {
        content.push_str(&warning.to_string());
        content.push('\n');
    }
    atomic_write(&path, &content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::WarningKind;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ids.json");

        atomic_write(&path, "{}\n").unwrap();
        atomic_write(&path, "{\"a.md\": \"1\"}\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a.md\": \"1\"}\n");
        assert!(!temp_dir.path().join("ids.json.tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("logs").join("x.log");
        atomic_write(&path, "line\n").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_warning_log_path_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let path = warning_log_path(Path::new("logs"), "my docs!", now);
        assert_eq!(path, Path::new("logs").join("my_docs__2024-03-09-1405.log"));

        let path = warning_log_path(Path::new("logs"), "", now);
        assert!(path.ends_with("docs_2024-03-09-1405.log"));
    }

    #[test]
    fn test_write_warning_log() {
        let temp_dir = TempDir::new().unwrap();
        let warnings = vec![SourceWarning::for_file(
            "guide.md",
            WarningKind::FileIo,
            "document",
            "unreadable",
        )];
        let path = write_warning_log(temp_dir.path(), "docs", &warnings).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "guide.md W005 [document] unreadable\n");
    }
}
