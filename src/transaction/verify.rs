use crate::config::VerifyMode;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL: usize = 2048;
const READER_WAIT: Duration = Duration::from_secs(1);

/// Result of one verification run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Passed { elapsed: Duration },
    Failed { reason: String, elapsed: Duration },
}

impl VerifyOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, VerifyOutcome::Passed { .. })
    }
}

/// Decides whether the project still works after a removal
pub trait Verifier {
    fn verify(&mut self) -> VerifyOutcome;
}

/// Runs a shell command in the project root under a timeout
pub struct CommandVerifier {
    command: String,
    cwd: PathBuf,
    timeout: Duration,
    mode: VerifyMode,
    grace: Duration,
}

impl CommandVerifier {
    pub fn new(command: &str, cwd: &Path, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
            timeout,
            mode: VerifyMode::ExitCode,
            grace: Duration::from_secs(5),
        }
    }

    /// Long-running commands (dev servers) pass by surviving `grace`
    pub fn with_mode(mut self, mode: VerifyMode, grace: Duration) -> Self {
        self.mode = mode;
        self.grace = grace;
        self
    }

    fn spawn(&self) -> std::io::Result<Child> {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", &self.command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", &self.command]);
            cmd
        };
        cmd.current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Own process group so the whole tree can be killed on timeout
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd.spawn()
    }

    /// Wait until exit or `limit`; `None` means it was still running
    fn wait_for(child: &mut Child, limit: Duration) -> std::io::Result<Option<ExitStatus>> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= limit {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill(child: &mut Child) {
        #[cfg(unix)]
        {
            let group = format!("-{}", child.id());
            let _ = Command::new("kill")
                .args(["-KILL", "--", &group])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
        }
        let _ = child.kill();
        let _ = child.wait();
    }
}

/// Bounded tail of the child's stderr, filled by a detached reader thread
struct StderrTail {
    text: Arc<Mutex<String>>,
    reader: Option<JoinHandle<()>>,
}

impl StderrTail {
    /// Last non-empty line written so far
    fn last_line(&self) -> String {
        // The pipe closes when the child exits; give the reader a bounded
        // window to catch up, grandchildren may keep it open
        if let Some(reader) = &self.reader {
            let start = Instant::now();
            while !reader.is_finished() && start.elapsed() < READER_WAIT {
                thread::sleep(Duration::from_millis(10));
            }
        }
        self.text
            .lock()
            .map(|text| text.trim().lines().last().unwrap_or("").to_string())
            .unwrap_or_default()
    }
}

fn capture_stderr(child: &mut Child) -> StderrTail {
    let tail = Arc::new(Mutex::new(String::new()));
    let mut reader = None;
    if let Some(mut stderr) = child.stderr.take() {
        let sink = Arc::clone(&tail);
        reader = Some(thread::spawn(move || {
            let mut buf = [0u8; 1024];
            while let Ok(n) = stderr.read(&mut buf) {
                if n == 0 {
                    break;
                }
                if let Ok(mut text) = sink.lock() {
                    text.push_str(&String::from_utf8_lossy(&buf[..n]));
                    if text.len() > STDERR_TAIL {
                        let mut cut = text.len() - STDERR_TAIL;
                        while !text.is_char_boundary(cut) {
                            cut += 1;
                        }
                        text.drain(..cut);
                    }
                }
            }
        }));
    }
    StderrTail { text: tail, reader }
}

fn describe_exit(status: ExitStatus, tail: &StderrTail) -> String {
    let snippet = tail.last_line();
    if snippet.is_empty() {
        format!("verification exited with {}", status)
    } else {
        format!("verification exited with {}: {}", status, snippet)
    }
}

impl Verifier for CommandVerifier {
    fn verify(&mut self) -> VerifyOutcome {
        let start = Instant::now();
        debug!("Verifying with `{}`", self.command);

        let mut child = match self.spawn() {
            Ok(child) => child,
            Err(e) => {
                return VerifyOutcome::Failed {
                    reason: format!("failed to start `{}`: {}", self.command, e),
                    elapsed: start.elapsed(),
                }
            }
        };
        let tail = capture_stderr(&mut child);

        let limit = match self.mode {
            VerifyMode::ExitCode => self.timeout,
            VerifyMode::StaysUp => self.grace.min(self.timeout),
        };

        let waited = match Self::wait_for(&mut child, limit) {
            Ok(waited) => waited,
            Err(e) => {
                Self::kill(&mut child);
                return VerifyOutcome::Failed {
                    reason: format!("failed to wait for verification: {}", e),
                    elapsed: start.elapsed(),
                };
            }
        };

        let outcome = match (self.mode, waited) {
            (_, Some(status)) if status.success() => VerifyOutcome::Passed {
                elapsed: start.elapsed(),
            },
            (_, Some(status)) => VerifyOutcome::Failed {
                reason: describe_exit(status, &tail),
                elapsed: start.elapsed(),
            },
            (VerifyMode::ExitCode, None) => {
                warn!("Verification timed out after {:?}", self.timeout);
                Self::kill(&mut child);
                VerifyOutcome::Failed {
                    reason: format!("verification timed out after {}s", self.timeout.as_secs()),
                    elapsed: start.elapsed(),
                }
            }
            (VerifyMode::StaysUp, None) => {
                debug!("Verification command still up after {:?}", limit);
                Self::kill(&mut child);
                VerifyOutcome::Passed {
                    elapsed: start.elapsed(),
                }
            }
        };

        debug!("Verification finished: {:?}", outcome);
        outcome
    }
}
