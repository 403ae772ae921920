//! Dependency manifest handling
//!
//! Loads the declared dependencies of a `package.json` and edits the file in
//! place without disturbing any unrelated text.

mod editor;
mod package_json;

pub use editor::{remove_entry, ManifestEditor};
pub use package_json::Manifest;

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// A dependency exactly as the manifest declares it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    /// Package name, e.g. `lodash` or `@scope/pkg`
    pub name: String,
    /// Declared version range, e.g. `^4.0`
    pub declared_range: String,
    /// Manifest block the entry lives in
    pub section: String,
}

/// Manifest errors. Any of these makes the run impossible.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse manifest {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Malformed manifest {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("Failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
