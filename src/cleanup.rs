use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::discovery::FileFinder;
use crate::manifest::{DependencyRecord, Manifest};
use crate::queue::{ErrorQueue, ErrorSink};
use crate::report::RunReport;
use crate::scanner::SourceScanner;
use crate::transaction::TransactionExecutor;
use crate::usage::{UnusedSet, UsageAnalyzer, UsageIndex};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, MultiSelect};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupOptions {
    /// Analyse and report only
    pub dry_run: bool,
    /// Pick which candidates enter transactions
    pub interactive: bool,
    pub show_progress: bool,
}

/// Result of the read-only half of a run
#[derive(Debug)]
pub struct Analysis {
    pub manifest: Manifest,
    pub index: UsageIndex,
    pub unused: UnusedSet,
    pub candidates: Vec<DependencyRecord>,
    pub retained: Vec<String>,
    pub cancelled: bool,
}

/// Analyse a project, then remove unused dependencies one transaction at a time
pub struct Cleanup<'a> {
    config: &'a Config,
    root: PathBuf,
    options: CleanupOptions,
    cancel: CancellationToken,
}

impl<'a> Cleanup<'a> {
    pub fn new(config: &'a Config, root: &Path) -> Self {
        Self {
            config,
            root: root.to_path_buf(),
            options: CleanupOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: CleanupOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Full run against git and the configured package manager
    pub fn run(&self) -> Result<RunReport> {
        self.run_with(|config, root, errors| TransactionExecutor::for_project(config, root, errors))
    }

    /// Full run with a caller-built executor
    pub fn run_with<F>(&self, make_executor: F) -> Result<RunReport>
    where
        F: FnOnce(&Config, &Path, ErrorSink) -> TransactionExecutor,
    {
        let queue = ErrorQueue::new();
        let analysis = self.analyze(&queue.sink())?;

        let mut report = RunReport::from_analysis(
            &self.root,
            &analysis.manifest,
            &analysis.index,
            &analysis.unused,
            analysis.retained.clone(),
        );
        report.dry_run = self.options.dry_run;
        report.cancelled = analysis.cancelled;

        if !self.options.dry_run && !analysis.cancelled && !analysis.candidates.is_empty() {
            let selected = if self.options.interactive {
                select_candidates(&analysis.candidates)?
            } else {
                analysis.candidates.clone()
            };

            if !selected.is_empty() {
                info!("Attempting removal of {} dependencies...", selected.len());
                let mut executor = make_executor(self.config, &self.root, queue.sink())
                    .with_cancellation(self.cancel.clone());
                let summary = executor.run(&selected);
                report = report.with_execution(summary);
            }
        }

        Ok(report.with_errors(queue.drain()))
    }

    /// Load the manifest, scan sources and compute the unused set
    pub fn analyze(&self, errors: &ErrorSink) -> Result<Analysis> {
        let manifest_path = self.config.manifest_path(&self.root);
        info!("Loading {}...", manifest_path.display());
        let manifest = Manifest::load(&manifest_path, &self.config.sections)
            .into_diagnostic()
            .wrap_err("ManifestParseError")?;
        info!("{} declared dependencies", manifest.len());

        info!("Discovering files...");
        let files = FileFinder::new(self.config)
            .with_errors(errors.clone())
            .find_files(&self.root)?;
        info!("Found {} source files", files.len());

        let mut scanner = SourceScanner::new()
            .with_jobs(self.config.jobs)
            .with_cancellation(self.cancel.clone());
        let progress = if self.options.show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                    .into_diagnostic()?
                    .progress_chars("#>-"),
            );
            scanner = scanner.with_progress(pb.clone());
            Some(pb)
        } else {
            None
        };

        let outcome = scanner.scan(&files, errors)?;
        if let Some(pb) = progress {
            pb.finish_with_message("Scan complete");
        }

        let analyzer = UsageAnalyzer::new();
        let unused = analyzer.unused(&manifest, &outcome.index);
        let (candidates, retained) = analyzer.candidates(&unused, self.config);
        info!(
            "{} unused, {} retained by configuration",
            unused.len(),
            retained.len()
        );

        Ok(Analysis {
            manifest,
            index: outcome.index,
            unused,
            candidates,
            retained,
            cancelled: outcome.cancelled,
        })
    }
}

/// Let the user choose which candidates to attempt
fn select_candidates(candidates: &[DependencyRecord]) -> Result<Vec<DependencyRecord>> {
    let items: Vec<String> = candidates
        .iter()
        .map(|r| format!("{} {} ({})", r.name, r.declared_range, r.section))
        .collect();

    println!();
    println!("{}", "Select dependencies to remove:".cyan().bold());
    println!("{}", "(Space to toggle, Enter to confirm)".dimmed());
    println!();

    let selections = MultiSelect::with_theme(&ColorfulTheme::default())
        .items(&items)
        .interact()
        .into_diagnostic()?;

    let selected: Vec<DependencyRecord> = selections
        .into_iter()
        .map(|i| candidates[i].clone())
        .collect();

    if !selected.is_empty() {
        println!();
        let confirm = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Remove {} dependencies? Each is verified and reverted on failure.",
                selected.len()
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;

        if !confirm {
            return Ok(Vec::new());
        }
    }

    Ok(selected)
}
