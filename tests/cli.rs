use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn docs_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("index.md"), "# Home\n\nWelcome.\n").unwrap();
    fs::create_dir(dir.path().join("guide")).unwrap();
    let setup = "# Setup\n\n1. Install\n2. Run\n";
    fs::write(dir.path().join("guide").join("setup.md"), setup).unwrap();
    dir
}

/// Command with no ambient Notion configuration.
fn isolated(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("mkdocs2notion");
    cmd.env("HOME", home)
        .env_remove("NOTION_TOKEN")
        .env_remove("NOTION_PARENT_PAGE_ID")
        .env_remove("MKDOCS2NOTION_ASSET_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version_json() {
    let home = TempDir::new().unwrap();
    isolated(home.path())
        .args(["version", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"version\""));
}

#[test]
fn test_validate_clean_tree() {
    let home = TempDir::new().unwrap();
    let docs = docs_tree();
    isolated(home.path())
        .arg("validate")
        .arg(docs.path())
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\":true"))
        .stdout(predicate::str::contains("\"documents\":2"));
}

#[test]
fn test_validate_strict_fails_on_warnings() {
    let home = TempDir::new().unwrap();
    let docs = docs_tree();
    fs::write(docs.path().join("broken.md"), "# Broken\n\n```python\nprint(1)\n").unwrap();
    isolated(home.path())
        .arg("validate")
        .arg(docs.path())
        .args(["--strict", "--json"])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("W003"))
        .stderr(predicate::str::contains("STRICT_WARNINGS"));
}

#[test]
fn test_dry_run_plans_creates_without_writing() {
    let home = TempDir::new().unwrap();
    let docs = docs_tree();
    isolated(home.path())
        .arg("dry-run")
        .arg(docs.path())
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"create\":2"))
        .stdout(predicate::str::contains("guide/setup.md"));
    assert!(!docs.path().join(".mkdocs2notion_ids.json").exists());
}

#[test]
fn test_push_without_token_exits_with_config_code() {
    let home = TempDir::new().unwrap();
    let docs = docs_tree();
    isolated(home.path())
        .arg("push")
        .arg(docs.path())
        .arg("--json")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("MISSING_TOKEN"));
}

#[test]
fn test_push_without_parent_exits_with_config_code() {
    let home = TempDir::new().unwrap();
    let docs = docs_tree();
    isolated(home.path())
        .env("NOTION_TOKEN", "secret_test")
        .arg("push")
        .arg(docs.path())
        .arg("--json")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("MISSING_PARENT"));
}

#[test]
fn test_push_missing_source_exits_with_source_code() {
    let home = TempDir::new().unwrap();
    isolated(home.path())
        .args(["push", "/definitely/not/here", "--json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SOURCE_NOT_FOUND"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    isolated(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mkdocs2notion"));
}
