use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// A collaborator command that did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("failed to run `{command}`: {message}")]
    Spawn { command: String, message: String },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("{0}")]
    Other(String),
}

/// Run `program args...` in `cwd`, returning trimmed stdout on success
pub fn run(program: &str, args: &[&str], cwd: &Path) -> Result<String, CommandError> {
    let shown = format!("{} {}", program, args.join(" "));
    debug!("Running `{}` in {}", shown, cwd.display());

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| CommandError::Spawn {
            command: shown.clone(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            command: shown,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Platform name of a Node tool; on Windows these ship as `.cmd` shims
pub fn node_tool(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.cmd", name)
    } else {
        name.to_string()
    }
}
