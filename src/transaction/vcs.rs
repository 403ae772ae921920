use super::command::{self, CommandError};
use crate::config::FinishMode;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Isolation backend for one removal at a time
pub trait VersionControl {
    fn current_branch(&self) -> Result<String, CommandError>;

    /// Create `branch` from the current base and switch to it
    fn create_branch(&mut self, branch: &str) -> Result<(), CommandError>;

    /// Record the removal on `branch`
    fn commit(&mut self, branch: &str, message: &str, paths: &[PathBuf]) -> Result<(), CommandError>;

    /// Fold a committed `branch` back according to the finish mode
    fn finish(&mut self, branch: &str) -> Result<(), CommandError>;

    /// Abandon `branch` and return to the base
    fn discard(&mut self, branch: &str) -> Result<(), CommandError>;
}

/// `git` CLI backend rooted at the project directory
pub struct GitVcs {
    root: PathBuf,
    finish: FinishMode,
    base: Option<String>,
    /// Paths added to the index by a commit that has not landed yet
    staged: Vec<String>,
}

impl GitVcs {
    pub fn new(root: &Path, finish: FinishMode) -> Self {
        Self {
            root: root.to_path_buf(),
            finish,
            base: None,
            staged: Vec::new(),
        }
    }

    /// Branch every transaction starts from
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    fn git(&self, args: &[&str]) -> Result<String, CommandError> {
        command::run("git", args, &self.root)
    }

    /// `git add` rejects ignored paths named explicitly, e.g. an ignored lockfile
    fn is_ignored(&self, relative: &str) -> bool {
        self.git(&["check-ignore", "-q", "--", relative]).is_ok()
    }

    fn base_or_err(&self) -> Result<String, CommandError> {
        self.base
            .clone()
            .ok_or_else(|| CommandError::Other("no base branch recorded".to_string()))
    }
}

impl VersionControl for GitVcs {
    fn current_branch(&self) -> Result<String, CommandError> {
        let branch = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if branch == "HEAD" {
            return Err(CommandError::Other(
                "repository is in detached HEAD state".to_string(),
            ));
        }
        Ok(branch)
    }

    fn create_branch(&mut self, branch: &str) -> Result<(), CommandError> {
        if self.base.is_none() {
            let base = self.current_branch()?;
            debug!("Base branch is {}", base);
            self.base = Some(base);
        }
        self.git(&["checkout", "-b", branch])?;
        Ok(())
    }

    fn commit(&mut self, _branch: &str, message: &str, paths: &[PathBuf]) -> Result<(), CommandError> {
        let mut stage = Vec::new();
        for path in paths {
            let relative = path.strip_prefix(&self.root).unwrap_or(path).display().to_string();
            if self.is_ignored(&relative) {
                debug!("Not staging ignored {}", relative);
                continue;
            }
            stage.push(relative);
        }
        if stage.is_empty() {
            return Err(CommandError::Other("no tracked files to commit".to_string()));
        }

        let mut add = vec!["add", "-A", "--"];
        add.extend(stage.iter().map(String::as_str));
        self.git(&add)?;
        self.staged = stage;

        self.git(&["commit", "-m", message])?;
        self.staged.clear();
        Ok(())
    }

    fn finish(&mut self, branch: &str) -> Result<(), CommandError> {
        match self.finish {
            FinishMode::Merge => {
                let base = self.base_or_err()?;
                self.git(&["checkout", &base])?;
                self.git(&["merge", "--ff-only", branch])?;
                if let Err(e) = self.git(&["branch", "-d", branch]) {
                    // The removal is already on the base; a stale branch is harmless
                    warn!("Could not delete merged branch {}: {}", branch, e);
                }
                info!("Merged {} into {}", branch, base);
            }
            FinishMode::Keep => {
                info!("Keeping {}; it is the base for the next removal", branch);
                self.base = Some(branch.to_string());
            }
        }
        Ok(())
    }

    fn discard(&mut self, branch: &str) -> Result<(), CommandError> {
        let base = self.base_or_err()?;
        if !self.staged.is_empty() {
            // A failed commit leaves the removal in the index
            let mut reset = vec!["reset", "-q", "--"];
            reset.extend(self.staged.iter().map(String::as_str));
            self.git(&reset)?;
            self.staged.clear();
        }
        if self.current_branch()? != base {
            self.git(&["checkout", &base])?;
        }
        self.git(&["branch", "-D", branch])?;
        debug!("Discarded {}", branch);
        Ok(())
    }
}
