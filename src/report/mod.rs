mod json;
mod terminal;

pub use json::JsonReporter;
pub use terminal::TerminalReporter;

use crate::manifest::{DependencyRecord, Manifest};
use crate::queue::ErrorQueueItem;
use crate::transaction::{ExecutionSummary, FatalError, TransactionOutcome};
use crate::usage::{DynamicImport, UnusedSet, UsageIndex};
use miette::Result;
use std::path::{Path, PathBuf};

/// Usage that only appears in configuration or build scripts is invisible to
/// the scanner
pub const CONFIG_USAGE_CAVEAT: &str = "Dependencies referenced only from configuration files, package.json scripts or build tooling (babel, eslint, webpack plugins, CLIs) are not detected as used. Review removals of such packages.";

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

impl ReportFormat {
    /// Parse the configuration file spelling
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "terminal" | "text" => Some(ReportFormat::Terminal),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedDependency {
    pub name: String,
    pub references: usize,
    pub files: usize,
}

/// Everything a run found and did
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub project_root: PathBuf,
    pub declared: usize,
    pub files_scanned: usize,
    pub used: Vec<UsedDependency>,
    pub unused: Vec<DependencyRecord>,
    pub retained: Vec<String>,
    pub outcomes: Vec<TransactionOutcome>,
    pub skipped: Vec<String>,
    pub errors: Vec<ErrorQueueItem>,
    pub dynamic_imports: Vec<DynamicImport>,
    pub fatal: Option<FatalError>,
    pub cancelled: bool,
    pub dry_run: bool,
    pub peak_open: usize,
}

impl RunReport {
    pub fn from_analysis(
        project_root: &Path,
        manifest: &Manifest,
        index: &UsageIndex,
        unused: &UnusedSet,
        retained: Vec<String>,
    ) -> Self {
        let used = manifest
            .records()
            .iter()
            .filter(|r| index.is_used(&r.name))
            .map(|r| UsedDependency {
                name: r.name.clone(),
                references: index.count(&r.name),
                files: index.files_for(&r.name).len(),
            })
            .collect();

        Self {
            project_root: project_root.to_path_buf(),
            declared: manifest.len(),
            files_scanned: index.files_scanned(),
            used,
            unused: unused.records().to_vec(),
            retained,
            dynamic_imports: index.dynamic_imports().to_vec(),
            ..Default::default()
        }
    }

    pub fn with_execution(mut self, summary: ExecutionSummary) -> Self {
        self.outcomes = summary.outcomes;
        self.skipped = summary.skipped;
        self.fatal = summary.fatal;
        self.cancelled |= summary.cancelled;
        self.peak_open = summary.peak_open;
        self
    }

    pub fn with_errors(mut self, errors: Vec<ErrorQueueItem>) -> Self {
        self.errors = errors;
        self
    }

    pub fn caveat(&self) -> &'static str {
        CONFIG_USAGE_CAVEAT
    }
}

/// Renders a [`RunReport`] in the chosen format
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self { format, output_path }
    }

    pub fn report(&self, report: &RunReport) -> Result<()> {
        match self.format {
            ReportFormat::Terminal => TerminalReporter::new().report(report),
            ReportFormat::Json => JsonReporter::new(self.output_path.clone()).report(report),
        }
    }
}
