//! Commit-level aggregation
//!
//! A single sequential fold over the extracted commit stream. Sequencing
//! matters here: author first/last-commit bounds and the activity
//! histograms must observe a total order per author, so this runs before
//! any parallel file-level work is merged in.

use crate::config::AnalysisConfig;
use crate::models::{CommitRecord, RepositoryData};
use chrono::{Datelike, Timelike};

/// Fold commit records into author statistics, file revision counts, and
/// activity histograms. Records arrive newest first (git log order).
pub fn fold_commits(data: &mut RepositoryData, commits: &[CommitRecord]) {
    data.total_commits = commits.len() as u64;

    for commit in commits {
        let ts = commit.timestamp;
        let day = ts.date_naive();

        let author = data.authors.entry(commit.author.clone()).or_default();
        author.total_commits += 1;
        author.lines_added += commit.lines_added();
        author.lines_removed += commit.lines_removed();
        author.note_first_commit(ts);
        author.note_last_commit(ts);
        author.active_days.insert(day);
        *author
            .commits_by_month
            .entry(format!("{:04}-{:02}", ts.year(), ts.month()))
            .or_insert(0) += 1;
        *author.commits_by_year.entry(ts.year()).or_insert(0) += 1;

        for change in &commit.files_changed {
            author.modified_files.insert(change.path.clone());

            let file = data.file_stats.entry(change.path.clone()).or_default();
            file.revision_count += 1;
            // Newest-first order: the first sighting carries the most
            // recent author for this path.
            if file.last_modified_by.is_none() {
                file.last_modified_by = Some(commit.author.clone());
            }
        }

        data.active_days.insert(day);
        data.activity_by_hour[ts.hour() as usize] += 1;
        data.activity_by_weekday[ts.weekday().num_days_from_monday() as usize] += 1;
        data.activity_by_month_of_year[(ts.month() - 1) as usize] += 1;
        *data
            .commits_by_month
            .entry(format!("{:04}-{:02}", ts.year(), ts.month()))
            .or_insert(0) += 1;
        *data.commits_by_year.entry(ts.year()).or_insert(0) += 1;

        match data.first_commit {
            Some(existing) if existing <= ts => {}
            _ => data.first_commit = Some(ts),
        }
        match data.last_commit {
            Some(existing) if existing >= ts => {}
            _ => data.last_commit = Some(ts),
        }
    }

    if let (Some(first), Some(last)) = (data.first_commit, data.last_commit) {
        data.age_days = (last - first).num_days().max(0) as u64;
    }
}

/// Fold per-file LOC totals and the extension histograms once file metrics
/// are in place.
pub fn fold_file_totals(data: &mut RepositoryData, config: &AnalysisConfig) {
    data.total_files = data.file_metrics.len();

    let mut source = 0u64;
    let mut comment = 0u64;
    let mut blank = 0u64;

    for (path, metrics) in &data.file_metrics {
        if !metrics.is_valid {
            continue;
        }
        source += metrics.loc_program as u64;
        comment += metrics.loc_comment as u64;
        blank += metrics.loc_blank as u64;

        if let Some(key) = extension_key(path, config) {
            *data.files_by_extension.entry(key.clone()).or_insert(0) += 1;
            *data.lines_by_extension.entry(key).or_insert(0) += metrics.loc_program as u64;
        }
    }

    data.total_source_lines = source;
    data.total_comment_lines = comment;
    data.total_blank_lines = blank;
    data.total_lines = source + comment + blank;
}

/// Histogram key for a path: the lower-cased extension, or the lower-cased
/// basename for allow-listed extensionless files. `None` drops the file
/// from the histograms (dotfiles, filtered extensionless names).
pub fn extension_key(path: &str, config: &AnalysisConfig) -> Option<String> {
    let basename = path.rsplit('/').next().unwrap_or(path);
    if basename.starts_with('.') {
        return (!config.filter_by_extensions).then(|| basename.to_lowercase());
    }

    match basename.rsplit_once('.') {
        Some((_, ext)) => Some(ext.to_lowercase()),
        None => {
            if !config.filter_by_extensions
                || crate::config::EXTENSIONLESS_INCLUDES.contains(&basename)
            {
                Some(basename.to_lowercase())
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CodeMetrics, FileChange};
    use chrono::{TimeZone, Utc};

    fn commit(author: &str, epoch: i64, files: &[(&str, u64, u64)]) -> CommitRecord {
        CommitRecord {
            hash: format!("{author}-{epoch}"),
            author: author.to_string(),
            author_email: format!("{author}@example.com"),
            timestamp: Utc.timestamp_opt(epoch, 0).single().unwrap(),
            message: "change".to_string(),
            files_changed: files
                .iter()
                .map(|(path, added, removed)| FileChange {
                    path: path.to_string(),
                    lines_added: *added,
                    lines_removed: *removed,
                })
                .collect(),
        }
    }

    #[test]
    fn test_fold_accumulates_author_stats() {
        let mut data = RepositoryData::default();
        // Newest first, like git log.
        let commits = vec![
            commit("alice", 2_000_000, &[("src/a.rs", 5, 1)]),
            commit("bob", 1_500_000, &[("src/b.rs", 2, 0)]),
            commit("alice", 1_000_000, &[("src/a.rs", 10, 3), ("src/b.rs", 1, 1)]),
        ];
        fold_commits(&mut data, &commits);

        assert_eq!(data.total_commits, 3);
        let alice = &data.authors["alice"];
        assert_eq!(alice.total_commits, 2);
        assert_eq!(alice.lines_added, 16);
        assert_eq!(alice.lines_removed, 5);
        assert_eq!(alice.modified_files.len(), 2);
        assert!(alice.first_commit.unwrap() < alice.last_commit.unwrap());

        assert_eq!(data.file_stats["src/a.rs"].revision_count, 2);
        // The newest commit touching b.rs is bob's.
        assert_eq!(
            data.file_stats["src/b.rs"].last_modified_by.as_deref(),
            Some("bob")
        );
    }

    #[test]
    fn test_fold_histograms_and_age() {
        let mut data = RepositoryData::default();
        let commits = vec![
            commit("alice", 1_700_000_000, &[]),
            commit("alice", 1_700_000_000 - 86_400 * 10, &[]),
        ];
        fold_commits(&mut data, &commits);

        assert_eq!(data.age_days, 10);
        assert_eq!(data.active_days.len(), 2);
        assert_eq!(data.activity_by_hour.iter().sum::<u64>(), 2);
        assert_eq!(data.activity_by_weekday.iter().sum::<u64>(), 2);
        assert_eq!(data.commits_by_year.values().sum::<u64>(), 2);
    }

    #[test]
    fn test_extension_key_rules() {
        let config = AnalysisConfig::default();
        assert_eq!(extension_key("src/lib.rs", &config), Some("rs".into()));
        assert_eq!(extension_key("Build.GRADLE", &config), Some("gradle".into()));
        assert_eq!(extension_key("Makefile", &config), Some("makefile".into()));
        assert_eq!(extension_key("LICENSE", &config), None);
        assert_eq!(extension_key(".env", &config), None);

        let unfiltered = AnalysisConfig {
            filter_by_extensions: false,
            ..Default::default()
        };
        assert_eq!(extension_key(".env", &unfiltered), Some(".env".into()));
        assert_eq!(extension_key("LICENSE", &unfiltered), Some("license".into()));
    }

    #[test]
    fn test_file_totals_skip_invalid_metrics() {
        let mut data = RepositoryData::default();
        let config = AnalysisConfig::default();

        let mut good = CodeMetrics::default();
        good.loc_program = 10;
        good.loc_comment = 4;
        good.loc_blank = 2;
        good.loc_physical = 16;
        data.file_metrics.insert("src/a.rs".into(), good);
        data.file_metrics.insert("bad.bin.rs".into(), CodeMetrics::invalid());

        fold_file_totals(&mut data, &config);
        assert_eq!(data.total_files, 2);
        assert_eq!(data.total_lines, 16);
        assert_eq!(data.total_source_lines, 10);
        assert_eq!(data.files_by_extension["rs"], 1);
        assert_eq!(data.lines_by_extension["rs"], 10);
    }
}
