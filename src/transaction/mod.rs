//! Transactional dependency removal
//!
//! Every candidate goes through its own isolated attempt: snapshot, work
//! branch, uninstall, verify, then commit or revert. Backends sit behind the
//! [`VersionControl`], [`PackageManager`] and [`Verifier`] traits so the state
//! machine can be driven without git or npm.

mod command;
mod executor;
mod package_manager;
mod snapshot;
mod state;
mod vcs;
mod verify;

pub use command::CommandError;
pub use executor::{
    ExecutionSummary, ExecutorSettings, Resolution, TransactionExecutor, TransactionOutcome,
};
pub use package_manager::{for_kind, ManifestOnly, NpmFamily, PackageManager};
pub use snapshot::{FileSnapshot, LOCKFILES};
pub use state::{branch_name, Transaction, TransactionError, TransactionId, TransactionState};
pub use vcs::{GitVcs, VersionControl};
pub use verify::{CommandVerifier, Verifier, VerifyOutcome};

use std::fmt;
use thiserror::Error;

/// Step of a revert that went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertPhase {
    DiscardBranch,
    RestoreFiles,
    VerifyRestore,
    Resync,
}

impl fmt::Display for RevertPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            RevertPhase::DiscardBranch => "discard branch",
            RevertPhase::RestoreFiles => "restore files",
            RevertPhase::VerifyRestore => "verify restore",
            RevertPhase::Resync => "re-sync packages",
        };
        f.write_str(phase)
    }
}

/// Conditions that stop the whole run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("RevertFailure: could not revert removal of {dependency} (transaction {transaction_id}) during {phase}: {message}")]
    RevertFailure {
        dependency: String,
        transaction_id: TransactionId,
        phase: RevertPhase,
        message: String,
    },
    #[error(transparent)]
    Transition(#[from] TransactionError),
}
