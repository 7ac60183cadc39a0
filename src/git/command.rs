//! Git command execution
//!
//! Thin synchronous runner around the `git` binary: working directory is
//! the repository root, stderr is merged into the returned output, and a
//! deadline is enforced by polling the child and killing it on expiry.
//! Non-zero exit and timeout both surface as [`GitError`] so callers treat
//! them uniformly as extraction failures.

use crate::error::GitError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Poll interval while waiting for a child process.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// Executes git commands inside one repository.
#[derive(Debug, Clone)]
pub struct GitRunner {
    repo_root: PathBuf,
}

impl GitRunner {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Run `git <args>` and return its trimmed output (stdout with stderr
    /// appended). Fails on spawn errors, non-zero exit, or timeout; a timed
    /// out child is killed.
    pub fn run(&self, args: &[&str], timeout: Duration) -> Result<String, GitError> {
        debug!("Running git {} in {}", args.join(" "), self.repo_root.display());
        let start = Instant::now();

        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes on their own threads so a chatty command (a full
        // numstat log easily exceeds the pipe buffer) cannot deadlock the
        // wait loop below.
        let stdout = child.stdout.take().map(drain_pipe);
        let stderr = child.stderr.take().map(drain_pipe);

        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None => {
                    if start.elapsed() >= timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        warn!("git {} timed out after {:?}", args.join(" "), timeout);
                        return Err(GitError::Timeout {
                            args: args.iter().map(|s| s.to_string()).collect(),
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(WAIT_POLL);
                }
            }
        };

        let mut output = stdout.map(join_pipe).unwrap_or_default();
        let errout = stderr.map(join_pipe).unwrap_or_default();
        if !errout.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&errout);
        }

        debug!(
            "git {} finished in {:?} ({} bytes)",
            args.join(" "),
            start.elapsed(),
            output.len()
        );

        if !status.success() {
            return Err(GitError::Failed {
                args: args.iter().map(|s| s.to_string()).collect(),
                code: status.code().unwrap_or(-1),
                output: output.trim().to_string(),
            });
        }

        Ok(output.trim().to_string())
    }

    /// Whether the target directory is a git repository, checked with the
    /// short validation timeout.
    pub fn is_valid_repository(&self, timeout: Duration) -> bool {
        self.run(&["rev-parse", "--git-dir"], timeout).is_ok()
    }
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_pipe(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
