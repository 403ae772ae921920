use super::package_manager::{self, PackageManager};
use super::snapshot::FileSnapshot;
use super::state::{branch_name, Transaction, TransactionId, TransactionState};
use super::vcs::{GitVcs, VersionControl};
use super::verify::{CommandVerifier, Verifier, VerifyOutcome};
use super::{FatalError, RevertPhase};
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::manifest::{DependencyRecord, Manifest};
use crate::queue::{ErrorKind, ErrorQueueItem, ErrorSink};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// How a transaction ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Committed,
    /// Rolled back after a failure or cancellation
    Reverted { reason: String },
    /// Never got a branch; nothing to roll back
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    pub transaction: Transaction,
    pub resolution: Resolution,
}

#[derive(Debug, Default)]
pub struct ExecutionSummary {
    pub outcomes: Vec<TransactionOutcome>,
    pub fatal: Option<FatalError>,
    pub cancelled: bool,
    /// Candidates never started because the run stopped early
    pub skipped: Vec<String>,
    pub peak_open: usize,
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub manifest_path: PathBuf,
    pub sections: Vec<String>,
    pub branch_prefix: String,
    pub resync_on_revert: bool,
}

impl ExecutorSettings {
    pub fn from_config(config: &Config, project_root: &Path) -> Self {
        Self {
            manifest_path: config.manifest_path(project_root),
            sections: config.sections.clone(),
            branch_prefix: config.transaction.branch_prefix.clone(),
            resync_on_revert: config.transaction.resync_on_revert,
        }
    }
}

/// Runs removal transactions strictly one after another
pub struct TransactionExecutor {
    settings: ExecutorSettings,
    vcs: Box<dyn VersionControl>,
    package_manager: Box<dyn PackageManager>,
    verifier: Box<dyn Verifier>,
    errors: ErrorSink,
    cancel: CancellationToken,
    next_id: TransactionId,
    open: usize,
    peak_open: usize,
}

impl TransactionExecutor {
    pub fn new(
        settings: ExecutorSettings,
        vcs: Box<dyn VersionControl>,
        package_manager: Box<dyn PackageManager>,
        verifier: Box<dyn Verifier>,
        errors: ErrorSink,
    ) -> Self {
        Self {
            settings,
            vcs,
            package_manager,
            verifier,
            errors,
            cancel: CancellationToken::new(),
            next_id: 1,
            open: 0,
            peak_open: 0,
        }
    }

    /// git, the configured package manager and the verify command
    pub fn for_project(config: &Config, project_root: &Path, errors: ErrorSink) -> Self {
        let settings = ExecutorSettings::from_config(config, project_root);
        let vcs = GitVcs::new(project_root, config.transaction.finish);
        let pm = package_manager::for_kind(
            config.transaction.package_manager,
            project_root,
            &settings.manifest_path,
            &settings.sections,
        );
        let verifier = CommandVerifier::new(&config.verify.command, project_root, config.verify.timeout())
            .with_mode(config.verify.mode, config.verify.grace());

        Self::new(settings, Box::new(vcs), pm, Box::new(verifier), errors)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Most transactions ever open at once
    pub fn peak_open_transactions(&self) -> usize {
        self.peak_open
    }

    /// Attempt each candidate once, in order.
    ///
    /// Stops early on cancellation (between transactions) or on a fatal
    /// revert failure; remaining candidates are reported as skipped.
    pub fn run(&mut self, candidates: &[DependencyRecord]) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();

        for (i, record) in candidates.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Cancelled; {} candidates not attempted", candidates.len() - i);
                summary.skipped = candidates[i..].iter().map(|r| r.name.clone()).collect();
                break;
            }

            match self.execute(record) {
                Ok(outcome) => summary.outcomes.push(outcome),
                Err(fatal) => {
                    error!("{}", fatal);
                    summary.fatal = Some(fatal);
                    summary.skipped = candidates[i + 1..].iter().map(|r| r.name.clone()).collect();
                    break;
                }
            }
        }

        summary.cancelled = self.cancel.is_cancelled();
        summary.peak_open = self.peak_open;
        summary
    }

    /// One full transaction for `record`
    pub fn execute(&mut self, record: &DependencyRecord) -> Result<TransactionOutcome, FatalError> {
        let id = self.next_id;
        self.next_id += 1;

        let mut tx = Transaction::new(id, &record.name, branch_name(&self.settings.branch_prefix, &record.name));
        tx.attempts += 1;
        info!("Transaction {}: removing {} on {}", id, record.name, tx.branch_name);

        self.open += 1;
        self.peak_open = self.peak_open.max(self.open);
        debug_assert!(self.open <= 1, "more than one open transaction");

        let result = self.drive(&mut tx, record);
        self.open -= 1;

        let resolution = result?;
        debug!("Transaction {} history: {:?}", id, tx.history);
        Ok(TransactionOutcome {
            transaction: tx,
            resolution,
        })
    }

    fn drive(&mut self, tx: &mut Transaction, record: &DependencyRecord) -> Result<Resolution, FatalError> {
        let snapshot = match FileSnapshot::capture_project(
            &self.settings.manifest_path,
            &self.package_manager.lockfiles(),
        ) {
            Ok(snapshot) => snapshot,
            Err(e) => return self.fail_branch(tx, format!("could not snapshot project files: {}", e)),
        };

        if let Err(e) = self.vcs.create_branch(&tx.branch_name) {
            return self.fail_branch(tx, e.to_string());
        }
        tx.advance(TransactionState::Branched)?;
        if self.cancel.is_cancelled() {
            return self.revert(tx, &snapshot, "cancelled".to_string());
        }

        if let Err(reason) = self.remove(record) {
            self.queue(ErrorKind::FailedRemove, tx, &reason);
            tx.advance(TransactionState::FailedRemove)?;
            return self.revert(tx, &snapshot, reason);
        }
        tx.advance(TransactionState::Removed)?;
        if self.cancel.is_cancelled() {
            return self.revert(tx, &snapshot, "cancelled".to_string());
        }

        match self.verifier.verify() {
            VerifyOutcome::Passed { elapsed } => {
                debug!("{} verified in {:.1}s", record.name, elapsed.as_secs_f64());
                tx.advance(TransactionState::Verified)?;
            }
            VerifyOutcome::Failed { reason, .. } => {
                self.queue(ErrorKind::FailedVerify, tx, &reason);
                tx.advance(TransactionState::FailedVerify)?;
                return self.revert(tx, &snapshot, reason);
            }
        }
        if self.cancel.is_cancelled() {
            return self.revert(tx, &snapshot, "cancelled".to_string());
        }

        let message = format!("Remove unused dependency {}", record.name);
        let committed = self
            .vcs
            .commit(&tx.branch_name, &message, &snapshot.touched_paths())
            .and_then(|()| self.vcs.finish(&tx.branch_name));
        if let Err(e) = committed {
            let reason = e.to_string();
            self.queue(ErrorKind::FailedCommit, tx, &reason);
            tx.advance(TransactionState::FailedCommit)?;
            return self.revert(tx, &snapshot, reason);
        }
        tx.advance(TransactionState::Committed)?;

        info!("Removed {}", record.name);
        Ok(Resolution::Committed)
    }

    /// Uninstall, then confirm the manifest no longer declares the name
    fn remove(&mut self, record: &DependencyRecord) -> Result<(), String> {
        self.package_manager
            .uninstall(record)
            .map_err(|e| format!("{} failed: {}", self.package_manager.name(), e))?;

        let manifest = Manifest::load(&self.settings.manifest_path, &self.settings.sections)
            .map_err(|e| format!("manifest unreadable after removal: {}", e))?;
        if manifest.declares(&record.name) {
            return Err(format!("{} is still declared after uninstall", record.name));
        }
        Ok(())
    }

    fn fail_branch(&mut self, tx: &mut Transaction, reason: String) -> Result<Resolution, FatalError> {
        warn!("Could not isolate {}: {}", tx.dependency_name, reason);
        self.queue(ErrorKind::BranchError, tx, &reason);
        tx.advance(TransactionState::FailedBranch)?;
        tx.advance(TransactionState::Closed)?;
        Ok(Resolution::Failed { reason })
    }

    /// Undo everything the transaction touched; any failure here is fatal
    fn revert(
        &mut self,
        tx: &mut Transaction,
        snapshot: &FileSnapshot,
        reason: String,
    ) -> Result<Resolution, FatalError> {
        warn!("Reverting removal of {}: {}", tx.dependency_name, reason);

        let fatal = |phase: RevertPhase, message: String| FatalError::RevertFailure {
            dependency: tx.dependency_name.clone(),
            transaction_id: tx.id,
            phase,
            message,
        };

        // Leaving the branch first carries uncommitted edits to the base,
        // where the snapshot then overwrites them
        self.vcs
            .discard(&tx.branch_name)
            .map_err(|e| fatal(RevertPhase::DiscardBranch, e.to_string()))?;
        snapshot
            .restore()
            .map_err(|e| fatal(RevertPhase::RestoreFiles, e.to_string()))?;
        if let Some(path) = snapshot.first_mismatch() {
            return Err(fatal(
                RevertPhase::VerifyRestore,
                format!("{} does not match its snapshot", path.display()),
            ));
        }
        if self.settings.resync_on_revert {
            self.package_manager
                .sync()
                .map_err(|e| fatal(RevertPhase::Resync, e.to_string()))?;
        }

        tx.advance(TransactionState::Reverted)?;
        tx.advance(TransactionState::Closed)?;
        Ok(Resolution::Reverted { reason })
    }

    fn queue(&self, kind: ErrorKind, tx: &Transaction, message: &str) {
        self.errors
            .push(ErrorQueueItem::transaction(kind, &tx.dependency_name, tx.id, message));
    }
}
