//! Error queue
//!
//! Recoverable failures from scanning and transactions travel through an
//! explicit channel: producers hold cloned [`ErrorSink`]s, the single
//! consumer drains the [`ErrorQueue`] in arrival order once work is done.

use crate::transaction::TransactionId;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use tracing::trace;

/// Kind of recoverable failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A source file could not be read
    ScanError,
    /// The work branch for a dependency could not be created
    BranchError,
    /// Uninstalling did not cleanly remove the dependency
    FailedRemove,
    /// The verification command failed or timed out
    FailedVerify,
    /// The verified removal could not be committed
    FailedCommit,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ScanError => "ScanError",
            ErrorKind::BranchError => "BranchError",
            ErrorKind::FailedRemove => "FailedRemove",
            ErrorKind::FailedVerify => "FailedVerify",
            ErrorKind::FailedCommit => "FailedCommit",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What a queued failure is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Dependency(String),
    File(PathBuf),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Dependency(name) => f.write_str(name),
            Subject::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorQueueItem {
    pub kind: ErrorKind,
    pub subject: Subject,
    pub message: String,
    pub transaction_id: Option<TransactionId>,
}

impl ErrorQueueItem {
    pub fn scan(path: &Path, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ScanError,
            subject: Subject::File(path.to_path_buf()),
            message: message.into(),
            transaction_id: None,
        }
    }

    pub fn transaction(
        kind: ErrorKind,
        dependency: &str,
        transaction_id: TransactionId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            subject: Subject::Dependency(dependency.to_string()),
            message: message.into(),
            transaction_id: Some(transaction_id),
        }
    }
}

/// Producer handle; cheap to clone and safe to share across threads
#[derive(Debug, Clone)]
pub struct ErrorSink {
    sender: Sender<ErrorQueueItem>,
}

impl ErrorSink {
    pub fn push(&self, item: ErrorQueueItem) {
        trace!("Queueing {} for {}", item.kind, item.subject);
        // The consumer outlives every producer in a run; a send can only fail
        // after the queue was dropped, when nobody would read the item anyway.
        let _ = self.sender.send(item);
    }
}

/// The single consumer end
pub struct ErrorQueue {
    sender: Sender<ErrorQueueItem>,
    receiver: Receiver<ErrorQueueItem>,
}

impl ErrorQueue {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self { sender, receiver }
    }

    pub fn sink(&self) -> ErrorSink {
        ErrorSink {
            sender: self.sender.clone(),
        }
    }

    /// Take every queued item, oldest first
    pub fn drain(&self) -> Vec<ErrorQueueItem> {
        self.receiver.try_iter().collect()
    }
}

impl Default for ErrorQueue {
    fn default() -> Self {
        Self::new()
    }
}
