//! Run results.
//!
//! These types are the serializable contract handed to reporting and badge
//! collaborators. They are assembled exactly once per run and never mutated
//! afterwards; the constructors below are the only way to build a
//! [`CaseResult`], which keeps the invariant that a provider failure always
//! comes with an empty outcome list and a failed verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::RuleOutcome;

/// Terminal provider failure classes, mirrored into results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFailureKind {
    Timeout,
    RateLimited,
    AuthFailed,
    NetworkError,
    InvalidResponse,
}

impl std::fmt::Display for ProviderFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderFailureKind::Timeout => write!(f, "timeout"),
            ProviderFailureKind::RateLimited => write!(f, "rate_limited"),
            ProviderFailureKind::AuthFailed => write!(f, "auth_failed"),
            ProviderFailureKind::NetworkError => write!(f, "network_error"),
            ProviderFailureKind::InvalidResponse => write!(f, "invalid_response"),
        }
    }
}

/// The serializable image of a terminal provider error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub kind: ProviderFailureKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(kind: ProviderFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of evaluating one case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_id: String,

    /// Category copied from the case so the aggregator and reporting
    /// collaborators need only the result tree.
    pub category: String,

    /// The provider's response text; absent when the provider failed.
    pub response: Option<String>,

    /// Provider latency in milliseconds; absent when the provider failed.
    pub latency_ms: Option<u64>,

    /// One outcome per rule, in the case's declared rule order. Empty when
    /// `provider_error` is set.
    pub rule_outcomes: Vec<RuleOutcome>,

    /// AND-reduction of the rule outcomes; always false on provider failure.
    pub case_passed: bool,

    pub provider_error: Option<ProviderFailure>,
}

impl CaseResult {
    /// Build a result for a case whose response was scored.
    pub fn scored(
        case_id: impl Into<String>,
        category: impl Into<String>,
        response: impl Into<String>,
        latency_ms: Option<u64>,
        rule_outcomes: Vec<RuleOutcome>,
    ) -> Self {
        let case_passed = !rule_outcomes.is_empty() && rule_outcomes.iter().all(|o| o.passed);
        Self {
            case_id: case_id.into(),
            category: category.into(),
            response: Some(response.into()),
            latency_ms,
            rule_outcomes,
            case_passed,
            provider_error: None,
        }
    }

    /// Build a result for a case whose provider call terminally failed.
    /// Scoring is short-circuited: no outcomes, not passed.
    pub fn failed(
        case_id: impl Into<String>,
        category: impl Into<String>,
        failure: ProviderFailure,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            category: category.into(),
            response: None,
            latency_ms: None,
            rule_outcomes: Vec::new(),
            case_passed: false,
            provider_error: Some(failure),
        }
    }
}

/// Result of evaluating a full suite. One entry per case, in suite order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub suite_name: String,
    pub age_band: String,
    pub case_results: Vec<CaseResult>,
    pub generated_at: DateTime<Utc>,
}

impl SuiteResult {
    pub fn new(
        suite_name: impl Into<String>,
        age_band: impl Into<String>,
        case_results: Vec<CaseResult>,
    ) -> Self {
        Self {
            suite_name: suite_name.into(),
            age_band: age_band.into(),
            case_results,
            generated_at: Utc::now(),
        }
    }
}
