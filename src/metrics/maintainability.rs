//! Maintainability Index calculation
//!
//! Combines program LOC, Halstead volume, cyclomatic complexity, and the
//! comment ratio into the classic composite score:
//!
//! ```text
//! raw = 171 - 5.2*ln(V) - 0.23*CC - 16.2*ln(LOC) + 50*sin(sqrt(2.4*CR))
//! ```
//!
//! The raw value can go negative and is preserved for categorization; the
//! displayed index is normalized to 0-100 (`max(0, raw * 100 / 171)`).
//! Status thresholds apply to the RAW value and feed the project-level
//! file-distribution counts, so they must not drift:
//! `>= 85` good, `[65, 85)` moderate, `[0, 65)` difficult, `< 0` critical.

use crate::models::{CodeMetrics, MaintainabilityStatus};

/// Score from the individual inputs. `volume` and `loc_program` are clamped
/// to 1 before the logarithms, so empty or single-token files stay finite.
pub fn score(
    volume: f64,
    cyclomatic_complexity: u32,
    loc_program: usize,
    comment_ratio: f64,
) -> (f64, f64, MaintainabilityStatus) {
    let volume = volume.max(1.0);
    let loc = loc_program.max(1) as f64;

    let raw = 171.0 - 5.2 * volume.ln() - 0.23 * f64::from(cyclomatic_complexity)
        - 16.2 * loc.ln()
        + 50.0 * (2.4 * comment_ratio).sqrt().sin();
    let normalized = (raw * 100.0 / 171.0).max(0.0);

    (raw, normalized, status(raw))
}

/// Categorize a raw MI value.
pub fn status(raw: f64) -> MaintainabilityStatus {
    if raw >= 85.0 {
        MaintainabilityStatus::Good
    } else if raw >= 65.0 {
        MaintainabilityStatus::Moderate
    } else if raw >= 0.0 {
        MaintainabilityStatus::Difficult
    } else {
        MaintainabilityStatus::Critical
    }
}

/// Fill the maintainability fields of a metric set from its LOC, volume,
/// and complexity values.
pub fn apply(metrics: &mut CodeMetrics) {
    let (raw, normalized, status) = score(
        metrics.volume,
        metrics.cyclomatic_complexity,
        metrics.loc_program,
        metrics.comment_ratio,
    );
    metrics.maintainability_index_raw = raw;
    metrics.maintainability_index = normalized;
    metrics.maintainability_status = status;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_volume_stays_finite() {
        let (raw, normalized, _) = score(0.0, 1, 0, 0.0);
        // ln(1) terms vanish: 171 - 0.23.
        assert!((raw - 170.77).abs() < 1e-9);
        assert!(normalized > 0.0);
        assert!(raw.is_finite() && normalized.is_finite());
    }

    #[test]
    fn test_status_thresholds_on_raw_value() {
        assert_eq!(status(85.0), MaintainabilityStatus::Good);
        assert_eq!(status(84.999), MaintainabilityStatus::Moderate);
        assert_eq!(status(65.0), MaintainabilityStatus::Moderate);
        assert_eq!(status(64.999), MaintainabilityStatus::Difficult);
        assert_eq!(status(0.0), MaintainabilityStatus::Difficult);
        assert_eq!(status(-0.001), MaintainabilityStatus::Critical);
    }

    #[test]
    fn test_normalized_is_clamped_at_zero() {
        // Huge volume and LOC push raw negative; normalized must not be.
        let (raw, normalized, status) = score(1e9, 200, 100_000, 0.0);
        assert!(raw < 0.0);
        assert_eq!(normalized, 0.0);
        assert_eq!(status, MaintainabilityStatus::Critical);
    }

    #[test]
    fn test_scoring_is_pure() {
        let a = score(1234.5, 7, 300, 0.25);
        let b = score(1234.5, 7, 300, 0.25);
        assert_eq!(a, b);
    }

    #[test]
    fn test_comment_weight_helps() {
        let (bare, _, _) = score(500.0, 5, 100, 0.0);
        let (commented, _, _) = score(500.0, 5, 100, 0.3);
        assert!(commented > bare);
    }
}
