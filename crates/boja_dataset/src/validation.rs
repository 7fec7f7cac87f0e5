//! Manifest quality checks over filter rejection counts.

use crate::types::{FilterSummary, ValidationOutcome, ValidationReport, ValidationThresholds};

/// One rejection category of a [`FilterSummary`] and the limits it is held to.
struct RejectionCheck {
    label: &'static str,
    count: usize,
    max_count: Option<usize>,
    max_ratio: Option<f32>,
}

impl RejectionCheck {
    fn all(summary: &FilterSummary, thresholds: &ValidationThresholds) -> [Self; 4] {
        [
            Self {
                label: "malformed lines",
                count: summary.malformed,
                max_count: thresholds.max_malformed,
                max_ratio: thresholds.max_malformed_ratio,
            },
            Self {
                label: "flagged invalid",
                count: summary.flagged_invalid,
                max_count: thresholds.max_invalid,
                max_ratio: thresholds.max_invalid_ratio,
            },
            Self {
                label: "missing (image/annotation)",
                count: summary.missing(),
                max_count: thresholds.max_missing,
                max_ratio: thresholds.max_missing_ratio,
            },
            // Unreadable annotations share the empty budget.
            Self {
                label: "empty or unreadable annotations",
                count: summary.empty + summary.unreadable,
                max_count: thresholds.max_empty,
                max_ratio: thresholds.max_empty_ratio,
            },
        ]
    }

    /// Severity of this category over `total` manifest lines, pushing one reason per
    /// exceeded limit. Any non-zero count is at least a warning.
    fn evaluate(&self, total: usize, reasons: &mut Vec<String>) -> ValidationOutcome {
        if self.count == 0 {
            return ValidationOutcome::Pass;
        }
        let ratio = self.count as f32 / total.max(1) as f32;
        let mut outcome = ValidationOutcome::Warn;
        if let Some(max) = self.max_count.filter(|max| self.count > *max) {
            outcome = ValidationOutcome::Fail;
            reasons.push(format!("{}: {} exceeds max {max}", self.label, self.count));
        }
        if let Some(max) = self.max_ratio.filter(|max| ratio > *max) {
            outcome = ValidationOutcome::Fail;
            reasons.push(format!("{}: ratio {ratio:.3} exceeds max {max:.3}", self.label));
        }
        reasons.push(format!("{}: {} observed", self.label, self.count));
        outcome
    }
}

pub fn validate_summary(
    summary: FilterSummary,
    thresholds: &ValidationThresholds,
) -> ValidationReport {
    let mut reasons = Vec::new();
    let outcome = RejectionCheck::all(&summary, thresholds)
        .iter()
        .map(|check| check.evaluate(summary.total, &mut reasons))
        .max()
        .unwrap_or(ValidationOutcome::Pass);

    ValidationReport {
        outcome,
        reasons,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> FilterSummary {
        FilterSummary {
            total: 10,
            accepted: 6,
            malformed: 0,
            flagged_invalid: 2,
            missing_image: 1,
            missing_annotation: 0,
            empty: 1,
            unreadable: 0,
        }
    }

    #[test]
    fn clean_manifest_passes() {
        let clean = FilterSummary {
            total: 3,
            accepted: 3,
            ..Default::default()
        };
        let report = validate_summary(clean, &ValidationThresholds::default());
        assert_eq!(report.outcome, ValidationOutcome::Pass);
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn observed_rejections_warn_without_thresholds() {
        let report = validate_summary(summary(), &ValidationThresholds::default());
        assert_eq!(report.outcome, ValidationOutcome::Warn);
        assert_eq!(report.reasons.len(), 3);
    }

    #[test]
    fn worst_category_decides_outcome() {
        let thresholds = ValidationThresholds {
            max_empty: Some(0),
            ..Default::default()
        };
        let report = validate_summary(summary(), &thresholds);
        assert_eq!(report.outcome, ValidationOutcome::Fail);
        assert_eq!(
            report.reasons,
            vec![
                "flagged invalid: 2 observed",
                "missing (image/annotation): 1 observed",
                "empty or unreadable annotations: 1 exceeds max 0",
                "empty or unreadable annotations: 1 observed",
            ]
        );
    }

    #[test]
    fn unreadable_counts_against_empty_ratio() {
        let broken = FilterSummary {
            total: 4,
            accepted: 2,
            empty: 1,
            unreadable: 1,
            ..Default::default()
        };
        let thresholds = ValidationThresholds {
            max_empty_ratio: Some(0.4),
            ..Default::default()
        };
        let report = validate_summary(broken, &thresholds);
        assert_eq!(report.outcome, ValidationOutcome::Fail);
        assert_eq!(
            report.reasons[0],
            "empty or unreadable annotations: ratio 0.500 exceeds max 0.400"
        );
    }

    #[test]
    fn outcome_renders_lowercase() {
        assert!(ValidationOutcome::Pass < ValidationOutcome::Warn);
        assert!(ValidationOutcome::Warn < ValidationOutcome::Fail);
        assert_eq!(ValidationOutcome::Warn.to_string(), "warn");
        assert_eq!(
            serde_json::to_string(&ValidationOutcome::Fail).unwrap(),
            "\"fail\""
        );
    }

    #[test]
    fn count_and_ratio_thresholds_fail() {
        let thresholds = ValidationThresholds {
            max_invalid: Some(1),
            max_missing_ratio: Some(0.05),
            ..Default::default()
        };
        let report = validate_summary(summary(), &thresholds);
        assert_eq!(report.outcome, ValidationOutcome::Fail);
        assert!(report
            .reasons
            .iter()
            .any(|r| r == "flagged invalid: 2 exceeds max 1"));
        assert!(report
            .reasons
            .iter()
            .any(|r| r.starts_with("missing (image/annotation): ratio 0.100")));
    }
}
