//! Core data models for repopulse
//!
//! These models are used throughout the codebase for representing commit
//! facts, per-author and per-file accumulators, per-file metric results,
//! and the aggregate analysis result handed back to callers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// One file touched by a commit, with numstat line counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    /// Lines added; 0 for binary files (git reports `-`).
    pub lines_added: u64,
    /// Lines removed; 0 for binary files.
    pub lines_removed: u64,
}

/// Immutable fact parsed from one log entry. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    /// Subject line of the commit message.
    pub message: String,
    pub files_changed: Vec<FileChange>,
}

impl CommitRecord {
    /// Total lines added across all files in this commit.
    pub fn lines_added(&self) -> u64 {
        self.files_changed.iter().map(|f| f.lines_added).sum()
    }

    /// Total lines removed across all files in this commit.
    pub fn lines_removed(&self) -> u64 {
        self.files_changed.iter().map(|f| f.lines_removed).sum()
    }
}

/// Mutable accumulator for a single author, keyed by display name.
///
/// Counts only increase; first/last commit bounds narrow/widen through
/// min/max comparison, never a blind overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthorStatistics {
    pub total_commits: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
    pub active_days: BTreeSet<NaiveDate>,
    pub modified_files: BTreeSet<String>,
    /// `YYYY-MM` -> commits.
    pub commits_by_month: BTreeMap<String, u64>,
    pub commits_by_year: BTreeMap<i32, u64>,
}

impl AuthorStatistics {
    /// Widen the first-commit bound.
    pub fn note_first_commit(&mut self, ts: DateTime<Utc>) {
        match self.first_commit {
            Some(existing) if existing <= ts => {}
            _ => self.first_commit = Some(ts),
        }
    }

    /// Widen the last-commit bound.
    pub fn note_last_commit(&mut self, ts: DateTime<Utc>) {
        match self.last_commit {
            Some(existing) if existing >= ts => {}
            _ => self.last_commit = Some(ts),
        }
    }

    pub fn active_day_count(&self) -> usize {
        self.active_days.len()
    }
}

/// Per-path accumulator over history and the working tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileStatistics {
    /// Number of commits that touched this path.
    pub revision_count: u64,
    /// Size in bytes observed in the working tree.
    pub current_size: u64,
    /// Monotonic max of observed sizes.
    pub max_size: u64,
    pub line_count: u64,
    pub last_modified_by: Option<String>,
}

impl FileStatistics {
    /// Record an observed size, keeping the running maximum.
    pub fn record_size(&mut self, size: u64) {
        self.current_size = size;
        self.max_size = self.max_size.max(size);
    }
}

/// Cyclomatic-complexity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl ComplexityLevel {
    /// Bucket a cyclomatic complexity value.
    pub fn from_complexity(cc: u32) -> Self {
        match cc {
            0..=10 => ComplexityLevel::Simple,
            11..=20 => ComplexityLevel::Moderate,
            21..=50 => ComplexityLevel::Complex,
            _ => ComplexityLevel::VeryComplex,
        }
    }
}

/// Maintainability bucket, derived from the raw (unnormalized) index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintainabilityStatus {
    Good,
    Moderate,
    Difficult,
    Critical,
}

impl std::fmt::Display for MaintainabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaintainabilityStatus::Good => write!(f, "good"),
            MaintainabilityStatus::Moderate => write!(f, "moderate"),
            MaintainabilityStatus::Difficult => write!(f, "difficult"),
            MaintainabilityStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Immutable result of one static-analysis pass over a file.
///
/// Invariants: `loc_physical == loc_program + loc_comment + loc_blank`;
/// `total_operators >= distinct_operators`; `total_operands >=
/// distinct_operands`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeMetrics {
    /// False for unreadable or binary files: every other field is zeroed
    /// and the file is skipped rather than aborting the batch.
    pub is_valid: bool,

    pub loc_physical: usize,
    pub loc_program: usize,
    pub loc_comment: usize,
    pub loc_blank: usize,
    /// `loc_comment / max(1, loc_program)`.
    pub comment_ratio: f64,

    /// Distinct operators (n1).
    pub distinct_operators: usize,
    /// Distinct operands (n2).
    pub distinct_operands: usize,
    /// Total operator occurrences (N1).
    pub total_operators: usize,
    /// Total operand occurrences (N2).
    pub total_operands: usize,
    pub volume: f64,
    pub difficulty: f64,
    pub effort: f64,
    /// Estimated delivered bugs, volume / 3000.
    pub bugs: f64,

    pub cyclomatic_complexity: u32,
    /// Two-way branch points only.
    pub binary_decisions: u32,
    pub complexity_level: ComplexityLevel,

    pub maintainability_index: f64,
    pub maintainability_index_raw: f64,
    pub maintainability_status: MaintainabilityStatus,

    pub class_count: u32,
    pub abstract_class_count: u32,
    pub interface_count: u32,
    pub method_count: u32,
    pub attribute_count: u32,
}

impl Default for CodeMetrics {
    fn default() -> Self {
        Self {
            is_valid: true,
            loc_physical: 0,
            loc_program: 0,
            loc_comment: 0,
            loc_blank: 0,
            comment_ratio: 0.0,
            distinct_operators: 0,
            distinct_operands: 0,
            total_operators: 0,
            total_operands: 0,
            volume: 0.0,
            difficulty: 0.0,
            effort: 0.0,
            bugs: 0.0,
            cyclomatic_complexity: 1,
            binary_decisions: 0,
            complexity_level: ComplexityLevel::Simple,
            maintainability_index: 0.0,
            maintainability_index_raw: 0.0,
            maintainability_status: MaintainabilityStatus::Good,
            class_count: 0,
            abstract_class_count: 0,
            interface_count: 0,
            method_count: 0,
            attribute_count: 0,
        }
    }
}

impl CodeMetrics {
    /// Zero-valued placeholder for a file that could not be analyzed.
    pub fn invalid() -> Self {
        Self {
            is_valid: false,
            cyclomatic_complexity: 0,
            ..Self::default()
        }
    }
}

/// Facts about one branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchInfo {
    pub name: String,
    pub commit_count: u64,
    pub last_commit_date: Option<DateTime<Utc>>,
    pub last_commit_author: Option<String>,
    /// Whether the branch is merged into the default branch.
    pub is_merged: bool,
}

/// Zone classification for Distance from Main Sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignZone {
    /// D < 0.2: well balanced.
    MainSequence,
    /// 0.2 <= D <= 0.4: reported but not zoned.
    Moderate,
    /// D > 0.4, stable and concrete (A < 0.3, I < 0.3).
    ZoneOfPain,
    /// D > 0.4, abstract and unstable (A > 0.7, I > 0.7).
    ZoneOfUselessness,
    /// D > 0.4 without a clear corner.
    Unbalanced,
}

/// Coupling and design-balance metrics for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouplingMetrics {
    /// Efferent coupling: files this file depends on.
    pub efferent: u32,
    /// Afferent coupling: files depending on this file.
    pub afferent: u32,
    /// Ce / (Ce + Ca); 0 when both are 0.
    pub instability: f64,
    /// Abstract types / max(1, total types).
    pub abstractness: f64,
    /// |A + I - 1|.
    pub distance: f64,
    pub zone: DesignZone,
}

/// Derived project-health indicators, computed once per run from the fully
/// aggregated data set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectHealthMetrics {
    /// 0-100, penalties applied to a 100 baseline.
    pub code_quality_score: f64,
    pub bus_factor: usize,
    pub average_complexity: f64,
    pub average_maintainability_index: f64,
    pub large_files_count: usize,
    pub complex_files_count: usize,
    pub good_files: usize,
    pub moderate_files: usize,
    pub difficult_files: usize,
    pub critical_files: usize,
    pub average_distance: f64,
    pub main_sequence_files: usize,
    pub zone_of_pain_files: usize,
    pub zone_of_uselessness_files: usize,
    pub recommendations: Vec<String>,
}

/// Post-run diagnostics for locally recovered problems.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Malformed log records skipped during history extraction.
    pub malformed_log_records: u64,
    /// Files replaced by invalid zero metrics (unreadable or binary).
    pub unreadable_files: u64,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.malformed_log_records == 0 && self.unreadable_files == 0
    }
}

/// Aggregate root owning every collection produced by an analysis run.
///
/// Created at analysis start, populated phase by phase, and handed to the
/// caller as an immutable snapshot once health scoring completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepositoryData {
    pub project_name: String,
    pub root: PathBuf,
    pub default_branch: String,

    pub total_commits: u64,
    pub total_files: usize,
    pub total_lines: u64,
    pub total_source_lines: u64,
    pub total_comment_lines: u64,
    pub total_blank_lines: u64,

    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
    /// Days between first and last commit.
    pub age_days: u64,
    pub active_days: BTreeSet<NaiveDate>,

    pub authors: BTreeMap<String, AuthorStatistics>,
    pub file_stats: BTreeMap<String, FileStatistics>,
    pub file_metrics: BTreeMap<String, CodeMetrics>,
    pub coupling: BTreeMap<String, CouplingMetrics>,
    /// Coupling aggregated per directory group, `.` for the root.
    pub package_coupling: BTreeMap<String, CouplingMetrics>,
    pub branches: BTreeMap<String, BranchInfo>,

    pub activity_by_hour: [u64; 24],
    /// Monday-first weekday histogram.
    pub activity_by_weekday: [u64; 7],
    pub activity_by_month_of_year: [u64; 12],
    /// `YYYY-MM` -> commits.
    pub commits_by_month: BTreeMap<String, u64>,
    pub commits_by_year: BTreeMap<i32, u64>,

    /// Lower-cased extension (or extensionless basename) -> file count.
    pub files_by_extension: BTreeMap<String, u64>,
    /// Lower-cased extension -> program lines.
    pub lines_by_extension: BTreeMap<String, u64>,

    pub diagnostics: Diagnostics,
    pub health: Option<ProjectHealthMetrics>,
}

impl RepositoryData {
    pub fn new(project_name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            project_name: project_name.into(),
            root: root.into(),
            ..Self::default()
        }
    }

    /// Authors ordered by descending commit count, name as tiebreak.
    pub fn authors_by_commits(&self) -> Vec<(&String, &AuthorStatistics)> {
        let mut authors: Vec<_> = self.authors.iter().collect();
        authors.sort_by(|(an, a), (bn, b)| {
            b.total_commits.cmp(&a.total_commits).then_with(|| an.cmp(bn))
        });
        authors
    }

    /// Largest analyzed files by physical line count.
    pub fn largest_files(&self, limit: usize) -> Vec<(&String, usize)> {
        let mut files: Vec<_> = self
            .file_metrics
            .iter()
            .filter(|(_, m)| m.is_valid)
            .map(|(p, m)| (p, m.loc_physical))
            .collect();
        files.sort_by(|(ap, a), (bp, b)| b.cmp(a).then_with(|| ap.cmp(bp)));
        files.truncate(limit);
        files
    }

    /// Most-revised files over the scanned history.
    pub fn most_revised_files(&self, limit: usize) -> Vec<(&String, u64)> {
        let mut files: Vec<_> = self
            .file_stats
            .iter()
            .map(|(p, s)| (p, s.revision_count))
            .collect();
        files.sort_by(|(ap, a), (bp, b)| b.cmp(a).then_with(|| ap.cmp(bp)));
        files.truncate(limit);
        files
    }

    /// Mean working-tree file size in bytes, 0.0 for an empty tree.
    pub fn average_file_size(&self) -> f64 {
        if self.file_stats.is_empty() {
            return 0.0;
        }
        let total: u64 = self.file_stats.values().map(|s| s.current_size).sum();
        total as f64 / self.file_stats.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_author_bounds_use_min_max() {
        let early = Utc.timestamp_opt(1_000, 0).single().unwrap();
        let late = Utc.timestamp_opt(2_000, 0).single().unwrap();

        let mut stats = AuthorStatistics::default();
        stats.note_first_commit(late);
        stats.note_last_commit(late);
        stats.note_first_commit(early);
        stats.note_last_commit(early);

        assert_eq!(stats.first_commit, Some(early));
        assert_eq!(stats.last_commit, Some(late));
    }

    #[test]
    fn test_file_statistics_max_size_is_monotonic() {
        let mut stats = FileStatistics::default();
        stats.record_size(100);
        stats.record_size(40);
        assert_eq!(stats.current_size, 40);
        assert_eq!(stats.max_size, 100);
    }

    #[test]
    fn test_complexity_buckets() {
        assert_eq!(ComplexityLevel::from_complexity(1), ComplexityLevel::Simple);
        assert_eq!(ComplexityLevel::from_complexity(10), ComplexityLevel::Simple);
        assert_eq!(
            ComplexityLevel::from_complexity(11),
            ComplexityLevel::Moderate
        );
        assert_eq!(
            ComplexityLevel::from_complexity(21),
            ComplexityLevel::Complex
        );
        assert_eq!(
            ComplexityLevel::from_complexity(51),
            ComplexityLevel::VeryComplex
        );
    }

    #[test]
    fn test_invalid_metrics_are_zeroed() {
        let metrics = CodeMetrics::invalid();
        assert!(!metrics.is_valid);
        assert_eq!(metrics.loc_physical, 0);
        assert_eq!(metrics.cyclomatic_complexity, 0);
    }

    #[test]
    fn test_authors_by_commits_ordering() {
        let mut data = RepositoryData::new("demo", "/tmp/demo");
        data.authors.insert(
            "alice".into(),
            AuthorStatistics {
                total_commits: 9,
                ..Default::default()
            },
        );
        data.authors.insert(
            "bob".into(),
            AuthorStatistics {
                total_commits: 1,
                ..Default::default()
            },
        );

        let ordered = data.authors_by_commits();
        assert_eq!(ordered[0].0, "alice");
        assert_eq!(ordered[1].0, "bob");
    }
}
