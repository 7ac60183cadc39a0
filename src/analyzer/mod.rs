//! Repository analysis orchestration
//!
//! Coordinates the full pipeline: validation, commit extraction and
//! sequential aggregation, branch facts, parallel per-file metrics on a
//! bounded worker pool, dependency-graph resolution, totals, and health
//! scoring. Commit-level work stays single-threaded because author
//! first/last bookkeeping needs a total order; per-file work is
//! embarrassingly parallel and merges through idempotent per-key writes.

pub mod aggregate;
pub mod health;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::git::history::BranchScope;
use crate::git::{GitHistory, GitRunner};
use crate::metrics::coupling::{self, OopCounts, OopMatcher};
use crate::metrics::{lexical, Language};
use crate::models::{CodeMetrics, RepositoryData};
use crate::progress::{PhaseProgress, Progress};
use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Per-file result produced by the worker pool.
struct FileAnalysis {
    metrics: CodeMetrics,
    oop: Option<OopCounts>,
    size_bytes: u64,
}

/// Analyzes one repository. Construct per run; the configuration snapshot
/// is fixed for the lifetime of the analyzer.
pub struct RepositoryAnalyzer {
    runner: GitRunner,
    config: AnalysisConfig,
}

impl RepositoryAnalyzer {
    pub fn new(repo_path: impl Into<PathBuf>, config: AnalysisConfig) -> Self {
        Self {
            runner: GitRunner::new(repo_path),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the full analysis. Returns a complete snapshot or a single
    /// terminal error; per-file problems degrade locally and are counted in
    /// the result's diagnostics instead.
    pub fn analyze(&self, progress: &Progress) -> Result<RepositoryData, AnalysisError> {
        let validate_timeout = Duration::from_secs(self.config.validate_timeout_secs);
        if !self.runner.is_valid_repository(validate_timeout) {
            return Err(AnalysisError::Validation {
                path: self.runner.repo_root().to_path_buf(),
            });
        }

        let project_name = self
            .runner
            .repo_root()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repository".to_string());
        let mut data = RepositoryData::new(project_name, self.runner.repo_root());
        info!("Starting analysis of {}", data.root.display());

        let timeout = Duration::from_secs(self.config.command_timeout_secs);
        let history = GitHistory::new(&self.runner, timeout);

        progress.report(0.0, "Resolving default branch...");
        let default_branch = history.default_branch()?;
        debug!("Default branch: {default_branch}");
        data.default_branch = default_branch.clone();
        let scope = if self.config.default_branch_only {
            BranchScope::Single(default_branch.clone())
        } else {
            BranchScope::All
        };

        self.check_cancelled(progress)?;

        // Commit history: one log query, one sequential fold.
        let phase = PhaseProgress::new(progress, 0.05, 0.35);
        phase.report(0.0, "Extracting commit history...");
        let (commits, malformed) = history.extract_commits(&scope)?;
        data.diagnostics.malformed_log_records = malformed;
        phase.report(0.6, "Aggregating commit statistics...");
        aggregate::fold_commits(&mut data, &commits);
        phase.report(1.0, "Commit history analyzed");
        info!(
            "Analyzed {} commits from {} authors",
            data.total_commits,
            data.authors.len()
        );

        self.check_cancelled(progress)?;

        // Branch facts.
        let phase = PhaseProgress::new(progress, 0.40, 0.10);
        phase.report(0.0, "Analyzing branches...");
        let branches = history.list_branches()?;
        let merged = history.merged_branches(&default_branch)?;
        for (index, name) in branches.iter().enumerate() {
            self.check_cancelled(progress)?;
            let info = history.branch_info(name, &merged)?;
            data.branches.insert(name.clone(), info);
            phase.report(
                (index + 1) as f64 / branches.len() as f64,
                "Analyzing branches...",
            );
        }

        self.check_cancelled(progress)?;

        // Per-file metrics on the worker pool.
        let phase = PhaseProgress::new(progress, 0.50, 0.30);
        phase.report(0.0, "Listing tracked files...");
        let files: Vec<String> = history
            .list_tracked_files(&default_branch)?
            .into_iter()
            .filter(|path| self.config.includes_file(path))
            .collect();
        info!("Analyzing {} files with {} workers", files.len(), self.config.workers);

        let matcher = OopMatcher::new();
        let results: DashMap<String, FileAnalysis> = DashMap::new();
        let unreadable = AtomicU64::new(0);
        let completed = AtomicUsize::new(0);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| AnalysisError::WorkerPool(e.to_string()))?;

        let root = self.runner.repo_root();
        pool.install(|| {
            files.par_iter().for_each(|path| {
                // Cancellation stops new tasks; in-flight ones finish.
                if progress.is_cancelled() {
                    return;
                }
                let analysis = analyze_file(root, path, &matcher);
                if !analysis.metrics.is_valid {
                    unreadable.fetch_add(1, Ordering::Relaxed);
                }
                results.insert(path.clone(), analysis);

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 32 == 0 || done == files.len() {
                    phase.report(done as f64 / files.len() as f64, "Analyzing files...");
                }
            });
        });
        self.check_cancelled(progress)?;

        let mut oop_counts: BTreeMap<String, OopCounts> = BTreeMap::new();
        for (path, analysis) in results.into_iter() {
            let stats = data.file_stats.entry(path.clone()).or_default();
            stats.record_size(analysis.size_bytes);
            stats.line_count = analysis.metrics.loc_physical as u64;

            if let Some(oop) = analysis.oop {
                oop_counts.insert(path.clone(), oop);
            }
            data.file_metrics.insert(path, analysis.metrics);
        }
        data.diagnostics.unreadable_files = unreadable.load(Ordering::Relaxed);

        self.check_cancelled(progress)?;

        // Dependency graph resolution is cheap and order-sensitive, so it
        // stays sequential.
        let phase = PhaseProgress::new(progress, 0.80, 0.10);
        phase.report(0.0, "Resolving dependency graph...");
        data.coupling = coupling::resolve_graph(&oop_counts);
        data.package_coupling = coupling::package_metrics(&oop_counts, &data.coupling);
        phase.report(1.0, "Dependency graph resolved");

        progress.report(0.90, "Calculating aggregate metrics...");
        aggregate::fold_file_totals(&mut data, &self.config);

        self.check_cancelled(progress)?;

        progress.report(0.95, "Calculating health metrics...");
        data.health = Some(health::score(&data, &self.config));

        progress.report(1.0, "Analysis complete");
        info!(
            "Analysis complete: {} files, quality score {:.1}",
            data.total_files,
            data.health.as_ref().map(|h| h.code_quality_score).unwrap_or(0.0)
        );
        Ok(data)
    }

    fn check_cancelled(&self, progress: &Progress) -> Result<(), AnalysisError> {
        if progress.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Analyze one working-tree file. Unreadable, binary, or non-UTF-8 content
/// yields invalid zero metrics; the batch is never aborted from here.
fn analyze_file(root: &Path, path: &str, matcher: &OopMatcher) -> FileAnalysis {
    let bytes = match std::fs::read(root.join(path)) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("Skipping unreadable file {path}: {err}");
            return FileAnalysis {
                metrics: CodeMetrics::invalid(),
                oop: None,
                size_bytes: 0,
            };
        }
    };
    let size_bytes = bytes.len() as u64;

    if bytes.contains(&0) {
        debug!("Skipping binary file {path}");
        return FileAnalysis {
            metrics: CodeMetrics::invalid(),
            oop: None,
            size_bytes,
        };
    }

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => {
            debug!("Skipping non-UTF-8 file {path}");
            return FileAnalysis {
                metrics: CodeMetrics::invalid(),
                oop: None,
                size_bytes,
            };
        }
    };

    let language = Language::from_path(path);
    let mut metrics = lexical::analyze_source(&text, language);
    let oop = matcher.scan(&text, language);
    if let Some(counts) = &oop {
        metrics.class_count = counts.classes;
        metrics.abstract_class_count = counts.abstract_classes;
        metrics.interface_count = counts.interfaces;
        metrics.method_count = counts.methods;
        metrics.attribute_count = counts.attributes;
    }

    FileAnalysis {
        metrics,
        oop,
        size_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_file_handles_binary_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = OopMatcher::new();

        std::fs::write(dir.path().join("blob.rs"), b"\x00\x01\x02").unwrap();
        let analysis = analyze_file(dir.path(), "blob.rs", &matcher);
        assert!(!analysis.metrics.is_valid);
        assert_eq!(analysis.size_bytes, 3);

        let analysis = analyze_file(dir.path(), "missing.rs", &matcher);
        assert!(!analysis.metrics.is_valid);
        assert_eq!(analysis.size_bytes, 0);
    }

    #[test]
    fn test_analyze_file_merges_oop_counts() {
        let dir = tempfile::tempdir().unwrap();
        let matcher = OopMatcher::new();
        std::fs::write(
            dir.path().join("lib.rs"),
            "pub struct A;\npub trait T { fn t(&self); }\n",
        )
        .unwrap();

        let analysis = analyze_file(dir.path(), "lib.rs", &matcher);
        assert!(analysis.metrics.is_valid);
        assert_eq!(analysis.metrics.class_count, 1);
        assert_eq!(analysis.metrics.interface_count, 1);
        assert!(analysis.oop.is_some());
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = RepositoryAnalyzer::new(dir.path(), AnalysisConfig::default());
        let progress = Progress::silent();
        progress.cancel();
        // Not a repository at all: validation fires before cancellation is
        // ever consulted.
        let err = analyzer.analyze(&progress).unwrap_err();
        assert!(matches!(err, AnalysisError::Validation { .. }));
    }
}
