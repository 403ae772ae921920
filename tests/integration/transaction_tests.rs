//! Integration tests for transactional dependency removal
//!
//! Removals are applied with the manifest-only package manager and verified
//! with real shell commands. Version control is either an in-memory stand-in
//! or git itself when it is installed.

#![cfg(unix)]

use depsweep::cleanup::{Cleanup, CleanupOptions};
use depsweep::config::{Config, FinishMode, PackageManagerKind};
use depsweep::manifest::DependencyRecord;
use depsweep::queue::{ErrorKind, ErrorQueue};
use depsweep::transaction::{
    CommandError, CommandVerifier, ExecutorSettings, FatalError, GitVcs, ManifestOnly, Resolution,
    RevertPhase, TransactionExecutor, TransactionState, VersionControl,
};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

const MANIFEST: &str = r#"{
  "name": "demo",
  "version": "1.0.0",
  "dependencies": {
    "lodash": "^4.0",
    "leftpad": "^1.0"
  }
}
"#;

const LOCKFILE: &str = r#"{
  "name": "demo",
  "lockfileVersion": 3,
  "packages": {}
}
"#;

/// Version control that only records what it was asked to do
#[derive(Default)]
struct RecordingVcs {
    fail_discard: bool,
}

impl VersionControl for RecordingVcs {
    fn current_branch(&self) -> Result<String, CommandError> {
        Ok("main".to_string())
    }

    fn create_branch(&mut self, _branch: &str) -> Result<(), CommandError> {
        Ok(())
    }

    fn commit(&mut self, _branch: &str, _message: &str, _paths: &[PathBuf]) -> Result<(), CommandError> {
        Ok(())
    }

    fn finish(&mut self, _branch: &str) -> Result<(), CommandError> {
        Ok(())
    }

    fn discard(&mut self, _branch: &str) -> Result<(), CommandError> {
        if self.fail_discard {
            return Err(CommandError::Other("cannot leave branch".to_string()));
        }
        Ok(())
    }
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("package.json"), MANIFEST).unwrap();
    std::fs::write(dir.path().join("package-lock.json"), LOCKFILE).unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/a.js"), "import _ from 'lodash';\n").unwrap();
    dir
}

fn record(name: &str, range: &str) -> DependencyRecord {
    DependencyRecord {
        name: name.to_string(),
        declared_range: range.to_string(),
        section: "dependencies".to_string(),
    }
}

fn executor(root: &Path, vcs: RecordingVcs, verify: &str, queue: &ErrorQueue) -> TransactionExecutor {
    let manifest_path = root.join("package.json");
    let settings = ExecutorSettings {
        manifest_path: manifest_path.clone(),
        sections: vec!["dependencies".to_string()],
        branch_prefix: "depsweep".to_string(),
        resync_on_revert: true,
    };
    TransactionExecutor::new(
        settings,
        Box::new(vcs),
        Box::new(ManifestOnly::new(&manifest_path)),
        Box::new(CommandVerifier::new(verify, root, Duration::from_secs(30))),
        queue.sink(),
    )
}

fn read(root: &Path, name: &str) -> String {
    std::fs::read_to_string(root.join(name)).unwrap()
}

#[test]
fn test_passing_verification_commits_removal() {
    let dir = project();
    let queue = ErrorQueue::new();
    let mut exec = executor(dir.path(), RecordingVcs::default(), "true", &queue);

    let summary = exec.run(&[record("leftpad", "^1.0")]);

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.resolution, Resolution::Committed);
    assert_eq!(outcome.transaction.state, TransactionState::Committed);
    assert_eq!(outcome.transaction.branch_name, "depsweep/remove-leftpad");
    let manifest = read(dir.path(), "package.json");
    assert!(!manifest.contains("leftpad"));
    assert!(manifest.contains("\"lodash\": \"^4.0\""));
    assert!(queue.drain().is_empty());
}

#[test]
fn test_failing_verification_restores_exact_bytes() {
    let dir = project();
    let queue = ErrorQueue::new();
    let mut exec = executor(dir.path(), RecordingVcs::default(), "exit 1", &queue);

    let summary = exec.run(&[record("leftpad", "^1.0")]);

    let tx = &summary.outcomes[0].transaction;
    assert_eq!(tx.state, TransactionState::Closed);
    assert_eq!(
        tx.history,
        vec![
            TransactionState::Pending,
            TransactionState::Branched,
            TransactionState::Removed,
            TransactionState::FailedVerify,
            TransactionState::Reverted,
            TransactionState::Closed,
        ]
    );
    assert_eq!(read(dir.path(), "package.json"), MANIFEST);
    assert_eq!(read(dir.path(), "package-lock.json"), LOCKFILE);
    assert!(read(dir.path(), "package.json").contains("\"leftpad\": \"^1.0\""));

    let items = queue.drain();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, ErrorKind::FailedVerify);
    assert_eq!(items[0].subject.to_string(), "leftpad");
}

#[test]
fn test_build_that_needs_the_dependency_is_reverted() {
    let dir = project();
    let queue = ErrorQueue::new();
    // Stands in for a build that breaks without leftpad
    let mut exec = executor(
        dir.path(),
        RecordingVcs::default(),
        "grep -q leftpad package.json",
        &queue,
    );

    let summary = exec.run(&[record("leftpad", "^1.0")]);

    assert!(matches!(summary.outcomes[0].resolution, Resolution::Reverted { .. }));
    assert_eq!(read(dir.path(), "package.json"), MANIFEST);
}

#[test]
fn test_revert_failure_halts_remaining_candidates() {
    let dir = project();
    let queue = ErrorQueue::new();
    let vcs = RecordingVcs { fail_discard: true };
    let mut exec = executor(dir.path(), vcs, "exit 1", &queue);

    let summary = exec.run(&[record("leftpad", "^1.0"), record("lodash", "^4.0")]);

    assert!(summary.outcomes.is_empty());
    assert_eq!(summary.skipped, vec!["lodash".to_string()]);
    match summary.fatal {
        Some(FatalError::RevertFailure {
            dependency,
            transaction_id,
            phase,
            ..
        }) => {
            assert_eq!(dependency, "leftpad");
            assert_eq!(transaction_id, 1);
            assert_eq!(phase, RevertPhase::DiscardBranch);
        }
        other => panic!("expected a revert failure, got {:?}", other),
    }
    // lodash was never touched
    assert!(read(dir.path(), "package.json").contains("\"lodash\": \"^4.0\""));
}

#[test]
fn test_transactions_never_overlap() {
    let dir = project();
    let queue = ErrorQueue::new();
    let mut exec = executor(dir.path(), RecordingVcs::default(), "exit 1", &queue);

    let summary = exec.run(&[record("leftpad", "^1.0"), record("lodash", "^4.0")]);

    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.peak_open, 1);
    assert_eq!(exec.peak_open_transactions(), 1);
    assert!(summary.outcomes.iter().all(|o| o.transaction.attempts == 1));
    assert_eq!(queue.drain().len(), 2);
}

#[test]
fn test_cleanup_run_reports_transactions_and_errors() {
    let dir = project();
    let mut config = Config::default();
    config.transaction.package_manager = PackageManagerKind::ManifestOnly;

    let report = Cleanup::new(&config, dir.path())
        .with_options(CleanupOptions::default())
        .run_with(|config, root, errors| {
            let settings = ExecutorSettings::from_config(config, root);
            let manifest_path = settings.manifest_path.clone();
            TransactionExecutor::new(
                settings,
                Box::new(RecordingVcs::default()),
                Box::new(ManifestOnly::new(&manifest_path)),
                Box::new(CommandVerifier::new("exit 3", root, Duration::from_secs(30))),
                errors,
            )
        })
        .unwrap();

    assert_eq!(report.unused.len(), 1);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::FailedVerify);
    assert_eq!(report.peak_open, 1);
    assert_eq!(read(dir.path(), "package.json"), MANIFEST);
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(root: &Path, args: &[&str]) -> String {
    let output = Command::new("git").args(args).current_dir(root).output().unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn git_project() -> TempDir {
    let dir = project();
    let root = dir.path();
    git(root, &["init", "-q"]);
    git(root, &["checkout", "-q", "-b", "main"]);
    git(root, &["config", "user.email", "dev@example.com"]);
    git(root, &["config", "user.name", "Dev"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "initial"]);
    dir
}

fn git_executor(root: &Path, verify: &str, queue: &ErrorQueue) -> TransactionExecutor {
    let manifest_path = root.join("package.json");
    let settings = ExecutorSettings {
        manifest_path: manifest_path.clone(),
        sections: vec!["dependencies".to_string()],
        branch_prefix: "depsweep".to_string(),
        resync_on_revert: false,
    };
    TransactionExecutor::new(
        settings,
        Box::new(GitVcs::new(root, FinishMode::Merge)),
        Box::new(ManifestOnly::new(&manifest_path)),
        Box::new(CommandVerifier::new(verify, root, Duration::from_secs(30))),
        queue.sink(),
    )
}

#[test]
fn test_git_commit_lands_on_base_branch() {
    if !git_available() {
        return;
    }
    let dir = git_project();
    let root = dir.path();
    let queue = ErrorQueue::new();

    let summary = git_executor(root, "true", &queue).run(&[record("leftpad", "^1.0")]);

    assert_eq!(summary.outcomes[0].resolution, Resolution::Committed);
    assert_eq!(git(root, &["rev-parse", "--abbrev-ref", "HEAD"]), "main");
    assert_eq!(
        git(root, &["log", "-1", "--format=%s"]),
        "Remove unused dependency leftpad"
    );
    assert!(git(root, &["status", "--porcelain"]).is_empty());
    assert!(!read(root, "package.json").contains("leftpad"));
}

#[test]
fn test_git_commit_with_ignored_lockfile() {
    if !git_available() {
        return;
    }
    let dir = project();
    let root = dir.path();
    std::fs::write(root.join(".gitignore"), "package-lock.json\n").unwrap();
    git(root, &["init", "-q"]);
    git(root, &["checkout", "-q", "-b", "main"]);
    git(root, &["config", "user.email", "dev@example.com"]);
    git(root, &["config", "user.name", "Dev"]);
    git(root, &["config", "commit.gpgsign", "false"]);
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "initial"]);
    let queue = ErrorQueue::new();

    let summary = git_executor(root, "true", &queue).run(&[record("leftpad", "^1.0")]);

    assert_eq!(summary.outcomes[0].resolution, Resolution::Committed);
    assert_eq!(
        git(root, &["show", "--name-only", "--format=", "HEAD"]),
        "package.json"
    );
    assert!(git(root, &["status", "--porcelain"]).is_empty());
    assert!(queue.drain().is_empty());
}

#[test]
fn test_git_revert_leaves_no_trace() {
    if !git_available() {
        return;
    }
    let dir = git_project();
    let root = dir.path();
    let head = git(root, &["rev-parse", "HEAD"]);
    let queue = ErrorQueue::new();

    let summary = git_executor(root, "exit 1", &queue).run(&[record("leftpad", "^1.0")]);

    assert!(matches!(summary.outcomes[0].resolution, Resolution::Reverted { .. }));
    assert_eq!(git(root, &["rev-parse", "--abbrev-ref", "HEAD"]), "main");
    assert_eq!(git(root, &["rev-parse", "HEAD"]), head);
    assert!(git(root, &["branch", "--list", "depsweep/*"]).is_empty());
    assert!(git(root, &["status", "--porcelain"]).is_empty());
    assert_eq!(read(root, "package.json"), MANIFEST);
}

#[test]
fn test_missing_repository_is_branch_error() {
    if !git_available() {
        return;
    }
    let dir = project();
    let queue = ErrorQueue::new();

    let summary = git_executor(dir.path(), "true", &queue).run(&[record("leftpad", "^1.0")]);

    let tx = &summary.outcomes[0].transaction;
    assert_eq!(
        tx.history,
        vec![
            TransactionState::Pending,
            TransactionState::FailedBranch,
            TransactionState::Closed,
        ]
    );
    assert_eq!(queue.drain()[0].kind, ErrorKind::BranchError);
    assert_eq!(read(dir.path(), "package.json"), MANIFEST);
}
