//! Usage tracking: which declared dependencies the source tree references

mod analyzer;
mod index;

pub use analyzer::{UnusedSet, UsageAnalyzer};
pub use index::{UsageEntry, UsageIndex};

use std::path::PathBuf;

/// One observed reference to a dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    pub dependency_name: String,
    pub source_file: PathBuf,
    pub line_number: usize,
}

/// An import whose target is computed at runtime and cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicImport {
    pub source_file: PathBuf,
    pub line_number: usize,
    /// The matched expression, e.g. `require(name`
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}
