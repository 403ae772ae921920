use super::UsageIndex;
use crate::config::Config;
use crate::manifest::{DependencyRecord, Manifest};
use std::collections::HashSet;
use tracing::debug;

/// Declared dependencies with no observed reference, in manifest order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnusedSet {
    records: Vec<DependencyRecord>,
}

impl UnusedSet {
    pub fn records(&self) -> &[DependencyRecord] {
        &self.records
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.iter().any(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Diffs the manifest against the usage index.
///
/// Only direct references count. A dependency that is used solely through
/// another package, or solely from config and build scripts, lands in the
/// unused set; verification is what catches those.
pub struct UsageAnalyzer;

impl UsageAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn unused(&self, manifest: &Manifest, index: &UsageIndex) -> UnusedSet {
        let mut seen = HashSet::new();
        let records: Vec<DependencyRecord> = manifest
            .records()
            .iter()
            .filter(|r| !index.is_used(&r.name))
            .filter(|r| seen.insert(r.name.clone()))
            .cloned()
            .collect();

        debug!(
            "{} of {} declared dependencies are unreferenced",
            records.len(),
            manifest.len()
        );

        UnusedSet { records }
    }

    /// Split the unused set into removal candidates and retained names
    pub fn candidates(&self, unused: &UnusedSet, config: &Config) -> (Vec<DependencyRecord>, Vec<String>) {
        let mut candidates = Vec::new();
        let mut retained = Vec::new();

        for record in unused.records() {
            if config.should_retain(&record.name) {
                retained.push(record.name.clone());
            } else {
                candidates.push(record.clone());
            }
        }

        (candidates, retained)
    }
}

impl Default for UsageAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
