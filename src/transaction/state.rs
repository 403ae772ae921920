use std::fmt;
use thiserror::Error;

pub type TransactionId = usize;

/// Lifecycle of one dependency removal
///
/// ```text
/// Pending -> Branched -> Removed -> Verified -> Committed
///                                  \-> FailedVerify -> Reverted -> Closed
///                       \-> FailedRemove -> Reverted -> Closed
///                                 Verified -> FailedCommit -> Reverted -> Closed
/// Pending -> FailedBranch -> Closed
/// ```
///
/// Branched, Removed and Verified may also go straight to Reverted when the
/// run is cancelled mid-transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    Pending,
    Branched,
    Removed,
    Verified,
    Committed,
    FailedBranch,
    FailedRemove,
    FailedVerify,
    FailedCommit,
    Reverted,
    Closed,
}

impl TransactionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Pending => "PENDING",
            TransactionState::Branched => "BRANCHED",
            TransactionState::Removed => "REMOVED",
            TransactionState::Verified => "VERIFIED",
            TransactionState::Committed => "COMMITTED",
            TransactionState::FailedBranch => "FAILED_BRANCH",
            TransactionState::FailedRemove => "FAILED_REMOVE",
            TransactionState::FailedVerify => "FAILED_VERIFY",
            TransactionState::FailedCommit => "FAILED_COMMIT",
            TransactionState::Reverted => "REVERTED",
            TransactionState::Closed => "CLOSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::Closed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            TransactionState::FailedBranch
                | TransactionState::FailedRemove
                | TransactionState::FailedVerify
                | TransactionState::FailedCommit
        )
    }

    pub fn can_transition_to(&self, next: TransactionState) -> bool {
        use TransactionState::*;

        matches!(
            (self, next),
            (Pending, Branched)
                | (Pending, FailedBranch)
                | (Branched, Removed)
                | (Branched, FailedRemove)
                | (Removed, Verified)
                | (Removed, FailedVerify)
                | (Verified, Committed)
                | (Verified, FailedCommit)
                | (FailedRemove, Reverted)
                | (FailedVerify, Reverted)
                | (FailedCommit, Reverted)
                | (Branched, Reverted)
                | (Removed, Reverted)
                | (Verified, Reverted)
                | (FailedBranch, Closed)
                | (Reverted, Closed)
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: TransactionId,
        from: TransactionState,
        to: TransactionState,
    },
}

/// One dependency's removal attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub dependency_name: String,
    pub branch_name: String,
    pub state: TransactionState,
    pub attempts: u32,
    /// Every state visited, starting with Pending
    pub history: Vec<TransactionState>,
}

impl Transaction {
    pub fn new(id: TransactionId, dependency_name: &str, branch_name: String) -> Self {
        Self {
            id,
            dependency_name: dependency_name.to_string(),
            branch_name,
            state: TransactionState::Pending,
            attempts: 0,
            history: vec![TransactionState::Pending],
        }
    }

    pub fn advance(&mut self, next: TransactionState) -> Result<(), TransactionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransactionError::InvalidTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Deterministic work-branch name for a dependency
///
/// `@scope/pkg` becomes `<prefix>/remove-scope+pkg`. Characters that are not
/// safe in a ref are written as `=xx` hex escapes. Neither `+` nor `=` can
/// appear in an npm package name, so distinct packages never share a branch.
pub fn branch_name(prefix: &str, dependency: &str) -> String {
    let (scope, name) = match dependency
        .strip_prefix('@')
        .and_then(|rest| rest.split_once('/'))
    {
        Some((scope, name)) => (Some(scope), name),
        None => (None, dependency),
    };

    let mut slug = String::with_capacity(dependency.len() + 4);
    if let Some(scope) = scope {
        push_ref_safe(&mut slug, scope);
        slug.push('+');
    }
    push_ref_safe(&mut slug, name);

    // git refuses components ending in `.` or `.lock`
    if slug.ends_with(".lock") {
        slug.truncate(slug.len() - ".lock".len());
        slug.push_str("=2elock");
    } else if slug.ends_with('.') {
        slug.pop();
        slug.push_str("=2e");
    }

    format!("{}/remove-{}", prefix.trim_end_matches('/'), slug)
}

fn push_ref_safe(slug: &mut String, part: &str) {
    for c in part.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
        } else if c == '.' && !slug.ends_with('.') {
            slug.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                slug.push_str(&format!("={:02x}", byte));
            }
        }
    }
}
