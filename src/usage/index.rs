use super::{DynamicImport, Location, UsageEvent};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// References recorded for one dependency
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageEntry {
    pub count: usize,
    /// Every reference site, in recording order
    pub locations: Vec<Location>,
}

/// Dependency name -> references, built from scanner events.
///
/// Scanner workers each fill a private index; the coordinator combines them
/// with [`UsageIndex::merge`] once every worker is done.
#[derive(Debug, Clone, Default)]
pub struct UsageIndex {
    entries: HashMap<String, UsageEntry>,
    dynamic_imports: Vec<DynamicImport>,
    files_scanned: usize,
}

impl UsageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: UsageEvent) {
        let entry = self.entries.entry(event.dependency_name).or_default();
        entry.count += 1;
        entry.locations.push(Location {
            file: event.source_file,
            line: event.line_number,
        });
    }

    pub fn record_dynamic(&mut self, import: DynamicImport) {
        self.dynamic_imports.push(import);
    }

    pub fn mark_file_scanned(&mut self) {
        self.files_scanned += 1;
    }

    /// Fold another partial index into this one: counts add, locations append
    pub fn merge(&mut self, other: UsageIndex) {
        for (name, entry) in other.entries {
            let target = self.entries.entry(name).or_default();
            target.count += entry.count;
            target.locations.extend(entry.locations);
        }
        self.dynamic_imports.extend(other.dynamic_imports);
        self.files_scanned += other.files_scanned;
    }

    pub fn count(&self, name: &str) -> usize {
        self.entries.get(name).map(|e| e.count).unwrap_or(0)
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.count(name) > 0
    }

    pub fn get(&self, name: &str) -> Option<&UsageEntry> {
        self.entries.get(name)
    }

    /// Distinct files that reference `name`
    pub fn files_for(&self, name: &str) -> BTreeSet<&Path> {
        self.entries
            .get(name)
            .map(|e| e.locations.iter().map(|l| l.file.as_path()).collect())
            .unwrap_or_default()
    }

    /// Every referenced package name, sorted
    pub fn dependencies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn dynamic_imports(&self) -> &[DynamicImport] {
        &self.dynamic_imports
    }

    pub fn files_scanned(&self) -> usize {
        self.files_scanned
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
