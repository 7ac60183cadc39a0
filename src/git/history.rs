//! Git history extraction
//!
//! Issues the version-control queries the engine needs (log + numstat,
//! branch listing, revision counts, tracked files) through [`GitRunner`]
//! and parses their text output into structured records.
//!
//! The commit stream comes from a single `git log --numstat` invocation
//! using a tab-delimited header format, so the per-commit cost is one
//! parse, not one subprocess.

use crate::error::GitError;
use crate::git::GitRunner;
use crate::models::{BranchInfo, CommitRecord, FileChange};
use chrono::{DateTime, TimeZone, Utc};
use rustc_hash::FxHashSet;
use std::time::Duration;
use tracing::debug;

/// Header marker + fields, all tab-separated: hash, author, email, epoch,
/// subject. The leading `C` cannot collide with numstat lines, which start
/// with a digit or `-`.
const LOG_FORMAT: &str = "C%x09%H%x09%aN%x09%aE%x09%at%x09%s";

/// Branch names tried when neither the remote HEAD nor the checkout
/// resolves the default branch.
const DEFAULT_BRANCH_CANDIDATES: &[&str] = &["main", "master", "develop", "development"];

/// Which part of history to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchScope {
    /// A single branch, usually the resolved default branch.
    Single(String),
    /// Every ref (`--all`).
    All,
}

impl BranchScope {
    fn rev_arg(&self) -> &str {
        match self {
            BranchScope::Single(name) => name.as_str(),
            BranchScope::All => "--all",
        }
    }
}

/// History queries against one repository.
pub struct GitHistory<'a> {
    runner: &'a GitRunner,
    timeout: Duration,
}

impl<'a> GitHistory<'a> {
    pub fn new(runner: &'a GitRunner, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Resolve the default branch: remote symbolic HEAD, then the current
    /// checkout (a detached `HEAD` literal is rejected), then the first
    /// well-known candidate present in the branch listing, then `master`.
    pub fn default_branch(&self) -> Result<String, GitError> {
        if let Ok(output) = self
            .runner
            .run(&["symbolic-ref", "refs/remotes/origin/HEAD"], self.timeout)
        {
            let name = output.trim().trim_start_matches("refs/remotes/origin/");
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }

        if let Ok(output) = self
            .runner
            .run(&["rev-parse", "--abbrev-ref", "HEAD"], self.timeout)
        {
            let name = output.trim();
            if !name.is_empty() && name != "HEAD" {
                return Ok(name.to_string());
            }
        }

        let listed = self.list_branches()?;
        for candidate in DEFAULT_BRANCH_CANDIDATES {
            if listed.iter().any(|b| b == candidate) {
                return Ok(candidate.to_string());
            }
        }

        Ok("master".to_string())
    }

    /// All local branch names.
    pub fn list_branches(&self) -> Result<Vec<String>, GitError> {
        let output = self
            .runner
            .run(&["branch", "--format=%(refname:short)"], self.timeout)?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Branch names merged into `target`.
    pub fn merged_branches(&self, target: &str) -> Result<FxHashSet<String>, GitError> {
        let output = self.runner.run(
            &["branch", "--merged", target, "--format=%(refname:short)"],
            self.timeout,
        )?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Commit count, last committer, and last commit date for one branch.
    pub fn branch_info(
        &self,
        name: &str,
        merged: &FxHashSet<String>,
    ) -> Result<BranchInfo, GitError> {
        let commit_count = self
            .runner
            .run(&["rev-list", "--count", name], self.timeout)?
            .trim()
            .parse()
            .unwrap_or(0);

        let (last_commit_author, last_commit_date) = match self.runner.run(
            &["log", "-1", "--pretty=format:%aN%x09%at", name],
            self.timeout,
        ) {
            Ok(line) => {
                let mut parts = line.trim().splitn(2, '\t');
                let author = parts.next().unwrap_or("").to_string();
                let date = parts
                    .next()
                    .and_then(|epoch| epoch.trim().parse::<i64>().ok())
                    .and_then(parse_epoch);
                (
                    if author.is_empty() { None } else { Some(author) },
                    date,
                )
            }
            Err(_) => (None, None),
        };

        Ok(BranchInfo {
            name: name.to_string(),
            commit_count,
            last_commit_date,
            last_commit_author,
            is_merged: merged.contains(name),
        })
    }

    /// Total commits reachable in the scope.
    pub fn commit_count(&self, scope: &BranchScope) -> Result<u64, GitError> {
        let output = self
            .runner
            .run(&["rev-list", "--count", scope.rev_arg()], self.timeout)?;
        Ok(output.trim().parse().unwrap_or(0))
    }

    /// Files tracked at the tip of the scanned branch.
    pub fn list_tracked_files(&self, rev: &str) -> Result<Vec<String>, GitError> {
        let output = self
            .runner
            .run(&["ls-tree", "-r", "--name-only", rev], self.timeout)?;
        Ok(output
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Extract every commit in scope, newest first, along with the count of
    /// malformed records that were skipped.
    pub fn extract_commits(
        &self,
        scope: &BranchScope,
    ) -> Result<(Vec<CommitRecord>, u64), GitError> {
        let format = format!("--pretty=format:{LOG_FORMAT}");
        let output = self.runner.run(
            &["log", scope.rev_arg(), "--numstat", &format],
            self.timeout,
        )?;

        let (commits, malformed) = parse_log(&output);
        debug!(
            "Extracted {} commits ({} malformed records skipped)",
            commits.len(),
            malformed
        );
        Ok((commits, malformed))
    }
}

/// Parse the tab-delimited log + numstat stream. Malformed header or
/// numstat lines are skipped and counted; they never abort the parse.
pub(crate) fn parse_log(output: &str) -> (Vec<CommitRecord>, u64) {
    let mut commits = Vec::new();
    let mut malformed = 0u64;
    let mut current: Option<CommitRecord> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix("C\t") {
            if let Some(commit) = current.take() {
                commits.push(commit);
            }
            match parse_header(header) {
                Some(commit) => current = Some(commit),
                None => malformed += 1,
            }
            continue;
        }

        match current.as_mut() {
            Some(commit) => match parse_numstat(line) {
                Some(change) => commit.files_changed.push(change),
                None => malformed += 1,
            },
            // Numstat line with no preceding header: nothing to attach to.
            None => malformed += 1,
        }
    }

    if let Some(commit) = current.take() {
        commits.push(commit);
    }

    (commits, malformed)
}

/// `hash \t author \t email \t epoch \t subject` (subject keeps any tabs).
fn parse_header(header: &str) -> Option<CommitRecord> {
    let mut parts = header.splitn(5, '\t');
    let hash = parts.next()?.trim();
    let author = parts.next()?.trim();
    let email = parts.next()?.trim();
    let epoch: i64 = parts.next()?.trim().parse().ok()?;
    let subject = parts.next().unwrap_or("");

    if hash.is_empty() || author.is_empty() {
        return None;
    }

    Some(CommitRecord {
        hash: hash.to_string(),
        author: author.to_string(),
        author_email: email.to_string(),
        timestamp: parse_epoch(epoch)?,
        message: subject.trim().to_string(),
        files_changed: Vec::new(),
    })
}

/// `added \t removed \t path` (binary files report `-`, paths keep tabs).
fn parse_numstat(line: &str) -> Option<FileChange> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 3 {
        return None;
    }

    let lines_added = parse_count(parts[0])?;
    let lines_removed = parse_count(parts[1])?;
    let path = parts[2..].join("\t");
    if path.is_empty() {
        return None;
    }

    Some(FileChange {
        path,
        lines_added,
        lines_removed,
    })
}

fn parse_count(field: &str) -> Option<u64> {
    let field = field.trim();
    if field == "-" {
        return Some(0);
    }
    field.parse().ok()
}

fn parse_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(epoch, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LOG: &str = "\
C\tdeadbeef\tAlice\talice@example.com\t1700000000\tAdd parser
3\t1\tsrc/parser.rs
-\t-\tassets/logo.png

C\tcafebabe\tBob\tbob@example.com\t1700000100\tTweak: tabs\tin subject
10\t2\tsrc/lib.rs
";

    #[test]
    fn test_parse_log_basic() {
        let (commits, malformed) = parse_log(SAMPLE_LOG);
        assert_eq!(malformed, 0);
        assert_eq!(commits.len(), 2);

        let first = &commits[0];
        assert_eq!(first.hash, "deadbeef");
        assert_eq!(first.author, "Alice");
        assert_eq!(first.files_changed.len(), 2);
        assert_eq!(first.files_changed[0].lines_added, 3);
        assert_eq!(first.files_changed[0].lines_removed, 1);
        // Binary entry parses as zero counts.
        assert_eq!(first.files_changed[1].lines_added, 0);
        assert_eq!(first.lines_added(), 3);
    }

    #[test]
    fn test_parse_log_subject_keeps_tabs() {
        let (commits, _) = parse_log(SAMPLE_LOG);
        assert_eq!(commits[1].message, "Tweak: tabs\tin subject");
    }

    #[test]
    fn test_parse_log_skips_malformed_records() {
        let noisy = "\
C\tonlyhash
C\tdeadbeef\tAlice\ta@b.c\tnot-a-number\tBroken epoch
garbage line without current commit
C\tcafebabe\tBob\tbob@b.c\t1700000000\tGood
1\t1\tok.rs
not\ta-number\tfile.rs
";
        let (commits, malformed) = parse_log(noisy);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, "cafebabe");
        assert_eq!(commits[0].files_changed.len(), 1);
        assert_eq!(malformed, 4);
    }

    #[test]
    fn test_parse_log_commit_without_changes() {
        let log = "C\tabc123\tAlice\ta@b.c\t1700000000\tEmpty merge\n";
        let (commits, malformed) = parse_log(log);
        assert_eq!(malformed, 0);
        assert_eq!(commits.len(), 1);
        assert!(commits[0].files_changed.is_empty());
    }

    #[test]
    fn test_parse_numstat_path_with_tab() {
        let change = parse_numstat("1\t2\tweird\tpath.txt").unwrap();
        assert_eq!(change.path, "weird\tpath.txt");
    }

    #[test]
    fn test_branch_scope_rev_arg() {
        assert_eq!(BranchScope::Single("main".into()).rev_arg(), "main");
        assert_eq!(BranchScope::All.rev_arg(), "--all");
    }
}
