//! End-to-end analysis of a constructed repository.
//!
//! Builds a throwaway repo with the real `git` binary (the same seam the
//! engine shells out to), then checks contribution totals, metric
//! invariants, coupling edges, and run-twice idempotence.

use anyhow::Result;
use repopulse::analyzer::RepositoryAnalyzer;
use repopulse::config::AnalysisConfig;
use repopulse::error::AnalysisError;
use repopulse::progress::Progress;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

fn git(dir: &Path, envs: &[(&str, &str)], args: &[&str]) {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(dir);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    let output = cmd.output().expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn commit(dir: &Path, name: &str, email: &str, epoch: i64, message: &str) {
    let date = format!("{epoch} +0000");
    git(
        dir,
        &[
            ("GIT_AUTHOR_NAME", name),
            ("GIT_AUTHOR_EMAIL", email),
            ("GIT_COMMITTER_NAME", name),
            ("GIT_COMMITTER_EMAIL", email),
            ("GIT_AUTHOR_DATE", date.as_str()),
            ("GIT_COMMITTER_DATE", date.as_str()),
        ],
        &["commit", "--quiet", "-m", message],
    );
}

const APP_PY: &str = "\
from src.helpers import slugify

class Application:
    def __init__(self):
        self.routes = {}

    def handle(self, name):
        if name and name in self.routes:
            return self.routes[name]
        return slugify(name)
";

const HELPERS_PY: &str = "\
def slugify(name):
    # Lowercase, dash-separated.
    if not name:
        return ''
    return name.lower().replace(' ', '-')
";

/// Ten commits: alice makes nine, bob makes one.
fn build_repo(dir: &Path) {
    git(dir, &[], &["init", "--quiet"]);

    std::fs::create_dir_all(dir.join("src")).unwrap();
    std::fs::write(dir.join("src/app.py"), APP_PY).unwrap();
    std::fs::write(dir.join("Makefile"), "all:\n\techo build\n").unwrap();
    std::fs::write(dir.join(".env"), "SECRET=1\n").unwrap();

    let base = 1_600_000_000i64;
    git(dir, &[], &["add", "."]);
    commit(dir, "alice", "alice@example.com", base, "initial app");

    std::fs::write(dir.join("src/helpers.py"), HELPERS_PY).unwrap();
    git(dir, &[], &["add", "."]);
    commit(dir, "bob", "bob@example.com", base + 86_400, "add helpers");

    for i in 0..8i64 {
        let line = format!("\n# revision note {i}\n");
        let mut content = std::fs::read_to_string(dir.join("src/app.py")).unwrap();
        content.push_str(&line);
        std::fs::write(dir.join("src/app.py"), content).unwrap();
        git(dir, &[], &["add", "."]);
        commit(
            dir,
            "alice",
            "alice@example.com",
            base + 86_400 * (2 + i),
            &format!("tweak {i}"),
        );
    }
}

#[test]
fn test_full_analysis() -> Result<()> {
    let dir = tempfile::tempdir()?;
    build_repo(dir.path());

    let analyzer = RepositoryAnalyzer::new(dir.path(), AnalysisConfig::default());
    let data = analyzer.analyze(&Progress::silent())?;

    // Contribution facts.
    assert_eq!(data.total_commits, 10);
    assert_eq!(data.authors.len(), 2);
    assert_eq!(data.authors["alice"].total_commits, 9);
    assert_eq!(data.authors["bob"].total_commits, 1);
    assert!(data.authors["alice"].first_commit < data.authors["alice"].last_commit);
    assert_eq!(data.age_days, 9);

    // Extension filtering: Makefile in, dotfile out.
    assert!(data.file_metrics.contains_key("src/app.py"));
    assert!(data.file_metrics.contains_key("Makefile"));
    assert!(!data.file_metrics.contains_key(".env"));

    // Revision tracking over history.
    assert_eq!(data.file_stats["src/app.py"].revision_count, 9);
    assert_eq!(
        data.file_stats["src/app.py"].last_modified_by.as_deref(),
        Some("alice")
    );

    // LOC identity holds for every analyzed file.
    for (path, metrics) in &data.file_metrics {
        assert!(metrics.is_valid, "{path} should be readable");
        assert_eq!(
            metrics.loc_physical,
            metrics.loc_program + metrics.loc_comment + metrics.loc_blank,
            "LOC identity violated for {path}"
        );
    }

    // Coupling: app.py imports helpers.py.
    assert_eq!(data.coupling["src/app.py"].efferent, 1);
    assert_eq!(data.coupling["src/helpers.py"].afferent, 1);
    // Makefile has no class concept and must not appear in zone data.
    assert!(!data.coupling.contains_key("Makefile"));

    // Health: the 9/1 split reaches half the commits with one author.
    let health = data.health.as_ref().expect("health metrics present");
    assert_eq!(health.bus_factor, 1);
    assert!((0.0..=100.0).contains(&health.code_quality_score));
    assert!(health
        .recommendations
        .iter()
        .any(|r| r.contains("Bus factor")));

    // Branch facts for the checked-out branch.
    assert!(data.branches.contains_key(&data.default_branch));
    let branch = &data.branches[&data.default_branch];
    assert_eq!(branch.commit_count, 10);
    assert!(branch.is_merged);
    assert_eq!(branch.last_commit_author.as_deref(), Some("alice"));

    assert_eq!(data.diagnostics.malformed_log_records, 0);
    assert_eq!(data.diagnostics.unreadable_files, 0);
    Ok(())
}

#[test]
fn test_analysis_is_idempotent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    build_repo(dir.path());

    let analyzer = RepositoryAnalyzer::new(dir.path(), AnalysisConfig::default());
    let first = analyzer.analyze(&Progress::silent())?;
    let second = analyzer.analyze(&Progress::silent())?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_progress_is_monotonic_and_completes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    build_repo(dir.path());

    let fractions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fractions);
    let progress = Progress::with_callback(move |fraction, _| {
        sink.lock().unwrap().push(fraction);
    });

    let analyzer = RepositoryAnalyzer::new(dir.path(), AnalysisConfig::default());
    analyzer.analyze(&progress)?;

    let fractions = fractions.lock().unwrap();
    assert!(!fractions.is_empty());
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*fractions.last().unwrap(), 1.0);
    Ok(())
}

#[test]
fn test_not_a_repository_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = RepositoryAnalyzer::new(dir.path(), AnalysisConfig::default());
    let err = analyzer.analyze(&Progress::silent()).unwrap_err();
    assert!(matches!(err, AnalysisError::Validation { .. }));
}

#[test]
fn test_cancellation_aborts_without_result() -> Result<()> {
    let dir = tempfile::tempdir()?;
    build_repo(dir.path());

    let progress = Progress::silent();
    progress.cancel();

    let analyzer = RepositoryAnalyzer::new(dir.path(), AnalysisConfig::default());
    let err = analyzer.analyze(&progress).unwrap_err();
    assert!(matches!(err, AnalysisError::Cancelled));
    Ok(())
}

#[test]
fn test_binary_file_is_skipped_not_fatal() -> Result<()> {
    let dir = tempfile::tempdir()?;
    build_repo(dir.path());

    // A tracked binary with a source extension.
    std::fs::write(dir.path().join("src/blob.py"), [0u8, 159, 146, 150]).unwrap();
    git(dir.path(), &[], &["add", "."]);
    commit(
        dir.path(),
        "alice",
        "alice@example.com",
        1_600_000_000 + 86_400 * 30,
        "add blob",
    );

    let analyzer = RepositoryAnalyzer::new(dir.path(), AnalysisConfig::default());
    let data = analyzer.analyze(&Progress::silent())?;

    let blob = &data.file_metrics["src/blob.py"];
    assert!(!blob.is_valid);
    assert_eq!(blob.loc_physical, 0);
    assert_eq!(data.diagnostics.unreadable_files, 1);
    Ok(())
}
