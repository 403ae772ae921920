// Parallel source scanner using rayon

use super::events::{Finding, UsageEvents};
use super::matcher::{ImportMatcher, RegexImportMatcher};
use crate::cancel::CancellationToken;
use crate::discovery::SourceFile;
use crate::queue::{ErrorQueueItem, ErrorSink};
use crate::usage::UsageIndex;
use indicatif::ProgressBar;
use miette::{IntoDiagnostic, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Result of scanning a file list
#[derive(Debug)]
pub struct ScanOutcome {
    pub index: UsageIndex,
    /// Set when cancellation stopped the scan before every file was read
    pub cancelled: bool,
}

/// Scans source files on a bounded worker pool.
///
/// Each worker folds its files into a private [`UsageIndex`]; the partial
/// indexes are merged on the calling thread after the pool is done, so no
/// map is shared while workers run.
pub struct SourceScanner {
    matcher: Box<dyn ImportMatcher>,
    jobs: usize,
    cancel: CancellationToken,
    progress: Option<ProgressBar>,
}

impl SourceScanner {
    pub fn new() -> Self {
        Self {
            matcher: Box::new(RegexImportMatcher::new()),
            jobs: 0,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_matcher(mut self, matcher: Box<dyn ImportMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Worker count; 0 lets rayon pick one per core
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Scan every file; unreadable files go to `errors` and are skipped
    pub fn scan(&self, files: &[SourceFile], errors: &ErrorSink) -> Result<ScanOutcome> {
        info!("Scanning {} files...", files.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .into_diagnostic()?;

        let partials: Vec<UsageIndex> = pool.install(|| {
            files
                .par_iter()
                .fold(UsageIndex::new, |mut partial, file| {
                    // In-flight files finish; nothing new starts after cancel
                    if self.cancel.is_cancelled() {
                        return partial;
                    }
                    match self.scan_file(file) {
                        Ok(index) => partial.merge(index),
                        Err(message) => {
                            warn!("Failed to read {}: {}", file.path.display(), message);
                            errors.push(ErrorQueueItem::scan(&file.path, message));
                        }
                    }
                    if let Some(progress) = &self.progress {
                        progress.inc(1);
                    }
                    partial
                })
                .collect()
        });

        let mut index = UsageIndex::new();
        for partial in partials {
            index.merge(partial);
        }

        let cancelled = self.cancel.is_cancelled();

        debug!(
            "Scanned {} files, {} distinct packages referenced",
            index.files_scanned(),
            index.len()
        );

        Ok(ScanOutcome { index, cancelled })
    }

    /// Scan one file into a fresh index
    pub fn scan_file(&self, file: &SourceFile) -> std::result::Result<UsageIndex, String> {
        let contents = std::fs::read_to_string(&file.path).map_err(|e| e.to_string())?;

        let mut index = UsageIndex::new();
        for finding in UsageEvents::new(&file.path, &contents, &*self.matcher) {
            match finding {
                Finding::Usage(event) => index.record(event),
                Finding::Dynamic(import) => index.record_dynamic(import),
            }
        }
        index.mark_file_scanned();

        Ok(index)
    }
}

impl Default for SourceScanner {
    fn default() -> Self {
        Self::new()
    }
}
