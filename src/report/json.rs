use super::RunReport;
use crate::transaction::{FatalError, Resolution};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

/// JSON reporter for programmatic output
pub struct JsonReporter {
    output_path: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn report(&self, report: &RunReport) -> Result<()> {
        let json = self.render(report)?;

        if let Some(path) = &self.output_path {
            std::fs::write(path, &json).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }

        Ok(())
    }

    pub fn render(&self, report: &RunReport) -> Result<String> {
        serde_json::to_string_pretty(&JsonReport::from_report(report)).into_diagnostic()
    }
}

#[derive(Serialize)]
struct JsonReport {
    version: &'static str,
    project_root: String,
    dry_run: bool,
    cancelled: bool,
    summary: JsonSummary,
    used: Vec<JsonUsed>,
    unused: Vec<JsonUnused>,
    retained: Vec<String>,
    transactions: Vec<JsonTransaction>,
    skipped: Vec<String>,
    errors: Vec<JsonError>,
    dynamic_imports: Vec<JsonDynamicImport>,
    caveat: &'static str,
    fatal: Option<JsonFatal>,
    peak_open_transactions: usize,
}

#[derive(Serialize)]
struct JsonSummary {
    files_scanned: usize,
    declared: usize,
    used: usize,
    unused: usize,
    committed: usize,
    reverted: usize,
    failed: usize,
}

#[derive(Serialize)]
struct JsonUsed {
    name: String,
    references: usize,
    files: usize,
}

#[derive(Serialize)]
struct JsonUnused {
    name: String,
    declared_range: String,
    section: String,
}

#[derive(Serialize)]
struct JsonTransaction {
    id: usize,
    dependency: String,
    branch: String,
    state: &'static str,
    resolution: &'static str,
    reason: Option<String>,
    attempts: u32,
    history: Vec<&'static str>,
}

#[derive(Serialize)]
struct JsonError {
    kind: &'static str,
    subject: String,
    message: String,
    transaction_id: Option<usize>,
}

#[derive(Serialize)]
struct JsonDynamicImport {
    file: String,
    line: usize,
    expression: String,
}

#[derive(Serialize)]
struct JsonFatal {
    kind: &'static str,
    dependency: Option<String>,
    transaction_id: Option<usize>,
    phase: Option<String>,
    message: String,
}

impl JsonReport {
    fn from_report(report: &RunReport) -> Self {
        let mut committed = 0;
        let mut reverted = 0;
        let mut failed = 0;

        let transactions = report
            .outcomes
            .iter()
            .map(|outcome| {
                let tx = &outcome.transaction;
                let (resolution, reason) = match &outcome.resolution {
                    Resolution::Committed => {
                        committed += 1;
                        ("committed", None)
                    }
                    Resolution::Reverted { reason } => {
                        reverted += 1;
                        ("reverted", Some(reason.clone()))
                    }
                    Resolution::Failed { reason } => {
                        failed += 1;
                        ("failed", Some(reason.clone()))
                    }
                };
                JsonTransaction {
                    id: tx.id,
                    dependency: tx.dependency_name.clone(),
                    branch: tx.branch_name.clone(),
                    state: tx.state.as_str(),
                    resolution,
                    reason,
                    attempts: tx.attempts,
                    history: tx.history.iter().map(|s| s.as_str()).collect(),
                }
            })
            .collect();

        let fatal = report.fatal.as_ref().map(|fatal| match fatal {
            FatalError::RevertFailure {
                dependency,
                transaction_id,
                phase,
                ..
            } => JsonFatal {
                kind: "RevertFailure",
                dependency: Some(dependency.clone()),
                transaction_id: Some(*transaction_id),
                phase: Some(phase.to_string()),
                message: fatal.to_string(),
            },
            FatalError::Transition(_) => JsonFatal {
                kind: "InvalidTransition",
                dependency: None,
                transaction_id: None,
                phase: None,
                message: fatal.to_string(),
            },
        });

        Self {
            version: "1.0",
            project_root: report.project_root.to_string_lossy().to_string(),
            dry_run: report.dry_run,
            cancelled: report.cancelled,
            summary: JsonSummary {
                files_scanned: report.files_scanned,
                declared: report.declared,
                used: report.used.len(),
                unused: report.unused.len(),
                committed,
                reverted,
                failed,
            },
            used: report
                .used
                .iter()
                .map(|u| JsonUsed {
                    name: u.name.clone(),
                    references: u.references,
                    files: u.files,
                })
                .collect(),
            unused: report
                .unused
                .iter()
                .map(|r| JsonUnused {
                    name: r.name.clone(),
                    declared_range: r.declared_range.clone(),
                    section: r.section.clone(),
                })
                .collect(),
            retained: report.retained.clone(),
            transactions,
            skipped: report.skipped.clone(),
            errors: report
                .errors
                .iter()
                .map(|e| JsonError {
                    kind: e.kind.code(),
                    subject: e.subject.to_string(),
                    message: e.message.clone(),
                    transaction_id: e.transaction_id,
                })
                .collect(),
            dynamic_imports: report
                .dynamic_imports
                .iter()
                .map(|d| JsonDynamicImport {
                    file: d.source_file.to_string_lossy().to_string(),
                    line: d.line_number,
                    expression: d.expression.clone(),
                })
                .collect(),
            caveat: report.caveat(),
            fatal,
            peak_open_transactions: report.peak_open,
        }
    }
}
