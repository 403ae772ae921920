//! CLI integration tests
//!
//! These tests verify that the CLI works correctly with various options.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the path to the test fixtures directory
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn depsweep() -> Command {
    Command::cargo_bin("depsweep").unwrap()
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_help() {
    depsweep()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--verify-cmd"))
        .stdout(predicate::str::contains("--package-manager"));
}

#[test]
fn test_version() {
    depsweep()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_invalid_format_is_rejected() {
    depsweep()
        .args(["--format", "sarif", "--dry-run"])
        .arg(fixtures_path().join("webapp"))
        .assert()
        .failure();
}

// ============================================================================
// Dry Run Tests
// ============================================================================

#[test]
fn test_dry_run_json_report() {
    let output = depsweep()
        .args(["--dry-run", "--quiet", "--format", "json"])
        .arg(fixtures_path().join("webapp"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let unused: Vec<_> = report["unused"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(unused, vec!["leftpad", "moment"]);
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["transactions"].as_array().unwrap().len(), 0);
    assert_eq!(report["dynamic_imports"].as_array().unwrap().len(), 1);
    assert!(report["caveat"].as_str().unwrap().contains("configuration"));
}

#[test]
fn test_dry_run_terminal_report() {
    depsweep()
        .args(["--dry-run", "--quiet"])
        .arg(fixtures_path().join("webapp"))
        .assert()
        .success()
        .stdout(predicate::str::contains("leftpad"))
        .stdout(predicate::str::contains("moment"))
        .stdout(predicate::str::contains("Dry run"));
}

#[test]
fn test_dev_and_retain_flags() {
    let output = depsweep()
        .args(["--dry-run", "-q", "-f", "json", "--dev", "-r", "@types/*"])
        .arg(fixtures_path().join("webapp"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["unused"], 3);
    assert_eq!(report["retained"][0], "@types/node");
}

#[test]
fn test_output_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("cleanup_report.json");

    depsweep()
        .args(["--dry-run", "-q", "-f", "json", "-o"])
        .arg(&out)
        .arg(fixtures_path().join("webapp"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["summary"]["declared"], 5);
}

#[test]
fn test_log_file() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("depsweep.log");

    depsweep()
        .args(["--dry-run", "-f", "json", "--log-file"])
        .arg(&log)
        .arg(fixtures_path().join("webapp"))
        .assert()
        .success();

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("declared dependencies"));
}

#[test]
fn test_config_file_retain() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{"dependencies": {"leftpad": "^1.0", "react-dom": "^18.0.0"}}"#,
    );
    write(dir.path(), ".depsweep.yml", "retain:\n  - react-dom\n");

    let output = depsweep()
        .args(["--dry-run", "-q", "-f", "json"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["retained"][0], "react-dom");
}

// ============================================================================
// Error Handling
// ============================================================================

#[test]
fn test_missing_manifest_fails() {
    let dir = TempDir::new().unwrap();

    depsweep()
        .args(["--dry-run", "-q"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ManifestParseError"));
}

#[test]
fn test_malformed_manifest_fails() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", "{ \"dependencies\": ");

    depsweep()
        .args(["--dry-run", "-q"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ManifestParseError"));
}

// ============================================================================
// Removal
// ============================================================================

#[cfg(unix)]
fn git(root: &Path, args: &[&str]) -> bool {
    std::process::Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(unix)]
#[test]
fn test_manifest_only_removal_end_to_end() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "package.json",
        "{\n  \"dependencies\": {\n    \"lodash\": \"^4.0\",\n    \"leftpad\": \"^1.0\"\n  }\n}\n",
    );
    write(root, "src/a.js", "import _ from 'lodash';\n");
    if !git(root, &["init", "-q"]) {
        return;
    }
    git(root, &["checkout", "-q", "-b", "main"]);
    git(root, &["config", "user.email", "dev@example.com"]);
    git(root, &["config", "user.name", "Dev"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    git(root, &["add", "."]);
    assert!(git(root, &["commit", "-q", "-m", "initial"]));

    let output = depsweep()
        .args(["-q", "-f", "json", "--package-manager", "manifest-only", "--verify-cmd", "true"])
        .arg(root)
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["transactions"][0]["resolution"], "committed");
    assert_eq!(report["summary"]["committed"], 1);
    let manifest = std::fs::read_to_string(root.join("package.json")).unwrap();
    assert!(!manifest.contains("leftpad"));
}

#[cfg(unix)]
#[test]
fn test_failed_verification_keeps_dependency() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let manifest = "{\n  \"dependencies\": {\n    \"leftpad\": \"^1.0\"\n  }\n}\n";
    write(root, "package.json", manifest);
    if !git(root, &["init", "-q"]) {
        return;
    }
    git(root, &["checkout", "-q", "-b", "main"]);
    git(root, &["config", "user.email", "dev@example.com"]);
    git(root, &["config", "user.name", "Dev"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    git(root, &["add", "."]);
    assert!(git(root, &["commit", "-q", "-m", "initial"]));

    let output = depsweep()
        .args(["-q", "-f", "json", "--package-manager", "manifest-only", "--verify-cmd", "exit 1"])
        .arg(root)
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["transactions"][0]["resolution"], "reverted");
    assert_eq!(report["errors"][0]["kind"], "FailedVerify");
    assert_eq!(std::fs::read_to_string(root.join("package.json")).unwrap(), manifest);
}
