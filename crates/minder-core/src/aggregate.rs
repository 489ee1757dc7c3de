//! Score aggregation.
//!
//! [`summarize`] is a pure fold over a [`SuiteResult`]: no side effects, no
//! hidden state, safe to call repeatedly and concurrently. Summaries are
//! recomputed on demand and never cached across runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::result::SuiteResult;

/// Categorical verdict derived from a pass rate.
///
/// The thresholds match the badge-color policy consumed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictBand {
    Excellent,
    Good,
    NeedsAttention,
    Critical,
}

impl VerdictBand {
    /// Band for a pass rate in `0.0..=1.0`.
    pub fn from_pass_rate(rate: f64) -> Self {
        if rate >= 0.90 {
            VerdictBand::Excellent
        } else if rate >= 0.70 {
            VerdictBand::Good
        } else if rate >= 0.50 {
            VerdictBand::NeedsAttention
        } else {
            VerdictBand::Critical
        }
    }

    /// Badge fill color for this band.
    pub fn badge_color(&self) -> &'static str {
        match self {
            VerdictBand::Excellent => "#4c1",
            VerdictBand::Good => "#97ca00",
            VerdictBand::NeedsAttention => "#dfb317",
            VerdictBand::Critical => "#e05d44",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictBand::Excellent => "excellent",
            VerdictBand::Good => "good",
            VerdictBand::NeedsAttention => "needs_attention",
            VerdictBand::Critical => "critical",
        }
    }
}

impl std::fmt::Display for VerdictBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar and categorical scores derived from a suite result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub overall_pass_rate: f64,

    /// Pass rate per case category, keyed deterministically.
    pub per_category_pass_rate: BTreeMap<String, f64>,

    pub verdict_band: VerdictBand,
}

/// Reduce a suite result into scores.
///
/// Empty suites are unrepresentable (suite construction rejects them), so
/// the ratios below are always well defined.
pub fn summarize(result: &SuiteResult) -> ScoreSummary {
    debug_assert!(
        !result.case_results.is_empty(),
        "suite construction guarantees at least one case"
    );

    let total = result.case_results.len();
    let passed = result.case_results.iter().filter(|c| c.case_passed).count();
    let overall_pass_rate = passed as f64 / total as f64;

    let mut per_category: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for case in &result.case_results {
        let entry = per_category.entry(case.category.clone()).or_insert((0, 0));
        entry.1 += 1;
        if case.case_passed {
            entry.0 += 1;
        }
    }
    let per_category_pass_rate = per_category
        .into_iter()
        .map(|(category, (passed, total))| (category, passed as f64 / total as f64))
        .collect();

    ScoreSummary {
        total,
        passed,
        failed: total - passed,
        overall_pass_rate,
        per_category_pass_rate,
        verdict_band: VerdictBand::from_pass_rate(overall_pass_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{CaseResult, ProviderFailure, ProviderFailureKind};
    use crate::rules::RuleOutcome;
    use proptest::prelude::*;

    fn passing(id: &str, category: &str) -> CaseResult {
        CaseResult::scored(id, category, "ok", None, vec![RuleOutcome::pass("r", "ok")])
    }

    fn failing(id: &str, category: &str) -> CaseResult {
        CaseResult::scored(id, category, "bad", None, vec![RuleOutcome::fail("r", "no")])
    }

    #[test]
    fn three_of_four_is_good() {
        let result = SuiteResult::new(
            "demo",
            "4-6",
            vec![
                passing("c1", "math"),
                passing("c2", "math"),
                passing("c3", "reading"),
                failing("c4", "reading"),
            ],
        );
        let summary = summarize(&result);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert!((summary.overall_pass_rate - 0.75).abs() < f64::EPSILON);
        assert_eq!(summary.verdict_band, VerdictBand::Good);
    }

    #[test]
    fn per_category_rates_group_correctly() {
        let result = SuiteResult::new(
            "demo",
            "4-6",
            vec![
                passing("c1", "math"),
                failing("c2", "math"),
                passing("c3", "safety"),
            ],
        );
        let summary = summarize(&result);
        assert!((summary.per_category_pass_rate["math"] - 0.5).abs() < f64::EPSILON);
        assert!((summary.per_category_pass_rate["safety"] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn provider_failures_count_as_failed() {
        let result = SuiteResult::new(
            "demo",
            "4-6",
            vec![
                passing("c1", "math"),
                CaseResult::failed(
                    "c2",
                    "math",
                    ProviderFailure::new(ProviderFailureKind::Timeout, "timed out"),
                ),
            ],
        );
        let summary = summarize(&result);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.verdict_band, VerdictBand::NeedsAttention);
    }

    #[test]
    fn band_thresholds() {
        assert_eq!(VerdictBand::from_pass_rate(1.0), VerdictBand::Excellent);
        assert_eq!(VerdictBand::from_pass_rate(0.90), VerdictBand::Excellent);
        assert_eq!(VerdictBand::from_pass_rate(0.89), VerdictBand::Good);
        assert_eq!(VerdictBand::from_pass_rate(0.70), VerdictBand::Good);
        assert_eq!(VerdictBand::from_pass_rate(0.69), VerdictBand::NeedsAttention);
        assert_eq!(VerdictBand::from_pass_rate(0.50), VerdictBand::NeedsAttention);
        assert_eq!(VerdictBand::from_pass_rate(0.49), VerdictBand::Critical);
        assert_eq!(VerdictBand::from_pass_rate(0.0), VerdictBand::Critical);
    }

    #[test]
    fn summarize_is_idempotent() {
        let result = SuiteResult::new(
            "demo",
            "4-6",
            vec![passing("c1", "math"), failing("c2", "reading")],
        );
        assert_eq!(summarize(&result), summarize(&result));
    }

    proptest! {
        #[test]
        fn pass_rate_stays_in_unit_interval(verdicts in prop::collection::vec(any::<bool>(), 1..40)) {
            let cases = verdicts
                .iter()
                .enumerate()
                .map(|(i, &ok)| {
                    if ok {
                        passing(&format!("c{i}"), "cat")
                    } else {
                        failing(&format!("c{i}"), "cat")
                    }
                })
                .collect();
            let summary = summarize(&SuiteResult::new("p", "4-6", cases));
            prop_assert!((0.0..=1.0).contains(&summary.overall_pass_rate));
            prop_assert_eq!(summary.passed + summary.failed, summary.total);
        }
    }
}
