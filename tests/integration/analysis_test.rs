//! Integration tests for dependency usage analysis
//!
//! These tests run discovery, scanning and the usage analyzer against the
//! fixture project and small generated projects.

use depsweep::cleanup::Cleanup;
use depsweep::config::Config;
use depsweep::discovery::FileFinder;
use depsweep::manifest::Manifest;
use depsweep::queue::{ErrorKind, ErrorQueue};
use depsweep::scanner::SourceScanner;
use depsweep::usage::UsageAnalyzer;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the path to the test fixtures directory
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn webapp() -> PathBuf {
    fixtures_path().join("webapp")
}

fn write(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_fixture_unused_dependencies() {
    let config = Config::default();
    let queue = ErrorQueue::new();

    let analysis = Cleanup::new(&config, &webapp()).analyze(&queue.sink()).unwrap();

    assert_eq!(analysis.unused.names(), vec!["leftpad", "moment"]);
    assert_eq!(analysis.index.count("lodash"), 2);
    assert!(analysis.index.is_used("react"));
    assert!(analysis.index.is_used("@scope/widgets"));
    assert_eq!(analysis.index.files_scanned(), 4);
    assert!(queue.drain().is_empty());
}

#[test]
fn test_ignored_build_output_is_not_scanned() {
    let config = Config::default();
    let queue = ErrorQueue::new();

    let analysis = Cleanup::new(&config, &webapp()).analyze(&queue.sink()).unwrap();

    // dist/bundle.js requires moment, but dist is on the ignore list
    assert_eq!(analysis.index.count("moment"), 0);
    assert!(analysis
        .index
        .files_for("lodash")
        .iter()
        .all(|p| !p.to_string_lossy().contains("dist")));
}

#[test]
fn test_dev_dependencies_and_retain() {
    let mut config = Config::default();
    config.sections.push("devDependencies".to_string());
    config.retain.push("@types/*".to_string());
    let queue = ErrorQueue::new();

    let analysis = Cleanup::new(&config, &webapp()).analyze(&queue.sink()).unwrap();

    assert!(analysis.index.is_used("jest"));
    assert_eq!(analysis.unused.names(), vec!["leftpad", "moment", "@types/node"]);
    let candidates: Vec<_> = analysis.candidates.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(candidates, vec!["leftpad", "moment"]);
    assert_eq!(analysis.retained, vec!["@types/node".to_string()]);
}

#[test]
fn test_dynamic_import_sites_are_reported() {
    let config = Config::default();
    let queue = ErrorQueue::new();

    let analysis = Cleanup::new(&config, &webapp()).analyze(&queue.sink()).unwrap();

    let sites = analysis.index.dynamic_imports();
    assert_eq!(sites.len(), 1);
    assert!(sites[0].source_file.ends_with("src/components/Toolbar.tsx"));
    assert_eq!(sites[0].line_number, 4);
}

#[test]
fn test_unused_exactly_when_unreferenced() {
    let mut config = Config::default();
    config.sections.push("devDependencies".to_string());
    let queue = ErrorQueue::new();

    let analysis = Cleanup::new(&config, &webapp()).analyze(&queue.sink()).unwrap();

    for record in analysis.manifest.records() {
        assert_eq!(
            analysis.unused.contains(&record.name),
            analysis.index.count(&record.name) == 0,
            "mismatch for {}",
            record.name
        );
    }
}

#[test]
fn test_scanning_twice_gives_identical_results() {
    let config = Config::default();
    let files = FileFinder::new(&config).find_files(&webapp()).unwrap();

    let first = SourceScanner::new()
        .with_jobs(4)
        .scan(&files, &ErrorQueue::new().sink())
        .unwrap()
        .index;
    let second = SourceScanner::new()
        .with_jobs(1)
        .scan(&files, &ErrorQueue::new().sink())
        .unwrap()
        .index;

    assert_eq!(first.dependencies(), second.dependencies());
    for name in first.dependencies() {
        assert_eq!(first.count(name), second.count(name));
        assert_eq!(first.files_for(name), second.files_for(name));
    }
}

#[test]
fn test_lodash_leftpad_scenario() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        br#"{"dependencies": {"lodash": "^4.0", "leftpad": "^1.0"}}"#,
    );
    write(dir.path(), "src/a.js", b"import _ from 'lodash';\n");
    let config = Config::default();

    let manifest = Manifest::load(&config.manifest_path(dir.path()), &config.sections).unwrap();
    let files = FileFinder::new(&config).find_files(dir.path()).unwrap();
    let outcome = SourceScanner::new().scan(&files, &ErrorQueue::new().sink()).unwrap();
    let unused = UsageAnalyzer::new().unused(&manifest, &outcome.index);

    assert_eq!(unused.names(), vec!["leftpad"]);
}

#[test]
fn test_unreadable_file_becomes_scan_error() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        br#"{"dependencies": {"lodash": "^4.0", "react": "^18.0.0"}}"#,
    );
    write(dir.path(), "src/ok.js", b"const _ = require('lodash');\n");
    write(dir.path(), "src/broken.js", &[0xc3, 0x28, 0xff, b'\n']);
    write(dir.path(), "src/app.jsx", b"import React from 'react';\n");
    let config = Config::default();
    let queue = ErrorQueue::new();

    let analysis = Cleanup::new(&config, dir.path()).analyze(&queue.sink()).unwrap();

    assert!(analysis.unused.is_empty());
    assert_eq!(analysis.index.files_scanned(), 2);

    let items = queue.drain();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, ErrorKind::ScanError);
    assert!(items[0].subject.to_string().ends_with("broken.js"));
}

#[test]
fn test_malformed_manifest_stops_analysis() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", br#"{"dependencies": ["lodash"]}"#);
    let config = Config::default();

    let result = Cleanup::new(&config, dir.path()).analyze(&ErrorQueue::new().sink());

    assert!(result.is_err());
}

#[test]
fn test_excluded_paths_are_skipped() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "package.json",
        br#"{"dependencies": {"lodash": "^4.0"}}"#,
    );
    write(dir.path(), "scripts/release.js", b"require('lodash');\n");
    let mut config = Config::default();
    config.exclude.push("/scripts/*".to_string());

    let analysis = Cleanup::new(&config, dir.path())
        .analyze(&ErrorQueue::new().sink())
        .unwrap();

    assert_eq!(analysis.unused.names(), vec!["lodash"]);
}
