//! Project health scoring
//!
//! Deterministic function of the fully aggregated data set, run once after
//! every other stage completes: bus factor, 0-100 code-quality score with
//! independently capped penalties, maintainability/complexity file
//! distributions, design-distance aggregates, and the ordered
//! recommendation list.

use crate::config::AnalysisConfig;
use crate::models::{
    DesignZone, MaintainabilityStatus, ProjectHealthMetrics, RepositoryData,
};

/// Compute health metrics for a finished analysis run.
pub fn score(data: &RepositoryData, config: &AnalysisConfig) -> ProjectHealthMetrics {
    let mut health = ProjectHealthMetrics {
        bus_factor: bus_factor(data),
        ..ProjectHealthMetrics::default()
    };

    let valid: Vec<_> = data.file_metrics.values().filter(|m| m.is_valid).collect();

    if !valid.is_empty() {
        let total_cc: u64 = valid.iter().map(|m| u64::from(m.cyclomatic_complexity)).sum();
        health.average_complexity = total_cc as f64 / valid.len() as f64;

        let total_mi: f64 = valid.iter().map(|m| m.maintainability_index).sum();
        health.average_maintainability_index = total_mi / valid.len() as f64;
    }

    for metrics in &valid {
        match metrics.maintainability_status {
            MaintainabilityStatus::Good => health.good_files += 1,
            MaintainabilityStatus::Moderate => health.moderate_files += 1,
            MaintainabilityStatus::Difficult => health.difficult_files += 1,
            MaintainabilityStatus::Critical => health.critical_files += 1,
        }
        if metrics.loc_physical > config.large_file_loc {
            health.large_files_count += 1;
        }
        if metrics.cyclomatic_complexity > config.complex_file_cc {
            health.complex_files_count += 1;
        }
    }

    if !data.coupling.is_empty() {
        let total_distance: f64 = data.coupling.values().map(|c| c.distance).sum();
        health.average_distance = total_distance / data.coupling.len() as f64;
        for coupling in data.coupling.values() {
            match coupling.zone {
                DesignZone::MainSequence => health.main_sequence_files += 1,
                DesignZone::ZoneOfPain => health.zone_of_pain_files += 1,
                DesignZone::ZoneOfUselessness => health.zone_of_uselessness_files += 1,
                DesignZone::Moderate | DesignZone::Unbalanced => {}
            }
        }
    }

    health.code_quality_score = quality_score(&health, data.total_files);
    health.recommendations = recommendations(&health);
    health
}

/// Minimum number of top contributors whose commits reach half of the
/// total. 0 when there are no authors.
pub fn bus_factor(data: &RepositoryData) -> usize {
    if data.authors.is_empty() {
        return 0;
    }

    let total: u64 = data.authors.values().map(|a| a.total_commits).sum();
    let target = total / 2;

    let mut cumulative = 0u64;
    let mut factor = 0usize;
    for (_, author) in data.authors_by_commits() {
        cumulative += author.total_commits;
        factor += 1;
        if cumulative >= target {
            break;
        }
    }
    factor
}

/// Start at 100 and apply independent, capped penalties; the result is
/// floored at 0 and can never exceed 100.
fn quality_score(health: &ProjectHealthMetrics, total_files: usize) -> f64 {
    let mut score = 100.0;

    if health.average_complexity > 10.0 {
        score -= ((health.average_complexity - 10.0) * 3.0).min(30.0);
    }

    if health.average_maintainability_index < 65.0 {
        score -= ((65.0 - health.average_maintainability_index) * 0.5).min(30.0);
    }

    if total_files > 0 {
        let large_ratio = health.large_files_count as f64 / total_files as f64;
        score -= (large_ratio * 100.0).min(20.0);
    }

    if health.bus_factor <= 2 {
        score -= 20.0;
    } else if health.bus_factor <= 4 {
        score -= 10.0;
    }

    score.max(0.0)
}

/// Fixed, ordered rule list; each rule appends at most one message.
fn recommendations(health: &ProjectHealthMetrics) -> Vec<String> {
    let mut out = Vec::new();

    if health.code_quality_score < 50.0 {
        out.push("Code quality score is low. Consider significant refactoring.".to_string());
    }

    if health.bus_factor <= 2 {
        out.push(
            "Bus factor is very low. Knowledge is concentrated in few contributors.".to_string(),
        );
    }

    if health.complex_files_count > 0 {
        out.push(format!(
            "{} files have high cyclomatic complexity. Consider simplifying.",
            health.complex_files_count
        ));
    }

    if health.critical_files > 0 {
        out.push(format!(
            "{} files have critical maintainability issues. Immediate attention needed.",
            health.critical_files
        ));
    }

    if health.average_distance > 0.4 {
        out.push(
            "Average distance from main sequence is high. Consider refactoring to improve \
             design balance."
                .to_string(),
        );
    }

    if health.zone_of_pain_files > 0 {
        out.push(format!(
            "{} files in the zone of pain (stable but concrete). Consider adding abstraction \
             layers to improve extensibility.",
            health.zone_of_pain_files
        ));
    }

    if health.zone_of_uselessness_files > 0 {
        out.push(format!(
            "{} files in the zone of uselessness (abstract but unstable). Consider removing \
             unused abstractions.",
            health.zone_of_uselessness_files
        ));
    }

    out
}
