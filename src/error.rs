//! Error types for the analysis engine
//!
//! Two layers: `GitError` for failures at the command-execution boundary,
//! and `AnalysisError` for run-level failures surfaced to the caller.
//! Per-file problems (unreadable or binary content) are not errors at all:
//! they degrade to zero-valued metrics with `is_valid == false` and a
//! diagnostics counter, so a single bad file never aborts the batch.

use std::path::PathBuf;

/// Failure from running a git command through [`crate::git::GitRunner`].
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// The command did not finish within the configured timeout.
    #[error("git {} timed out after {timeout_secs}s", args.join(" "))]
    Timeout { args: Vec<String>, timeout_secs: u64 },

    /// The command exited non-zero.
    #[error("git {} exited with status {code}: {output}", args.join(" "))]
    Failed {
        args: Vec<String>,
        code: i32,
        output: String,
    },

    /// The git binary could not be spawned or its output could not be read.
    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),
}

/// Run-level failure of a repository analysis.
///
/// The caller receives either a complete [`crate::models::RepositoryData`]
/// or exactly one of these; no partially populated result is ever returned
/// as success.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The target directory is not a git repository. Raised before any
    /// analysis phase runs.
    #[error("not a git repository: {}", path.display())]
    Validation { path: PathBuf },

    /// A history/branch/file-listing query failed or timed out. History
    /// data cannot be trusted partially, so this aborts the run.
    #[error("history extraction failed: {0}")]
    Extraction(#[from] GitError),

    /// The caller requested cancellation through the progress handle.
    #[error("analysis cancelled")]
    Cancelled,

    /// The per-file worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}
