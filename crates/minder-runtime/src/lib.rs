//! # minder-runtime
//!
//! Provider orchestration for minder evaluations.
//!
//! `minder-core` owns the deterministic model: suites, rules, results,
//! aggregation. This crate owns everything that touches a provider:
//!
//! - the [`providers::TextProvider`] capability with a deterministic dummy
//!   backend plus OpenAI and Anthropic backends behind cargo features
//! - the [`orchestrator::Orchestrator`], which drives a provider through a
//!   suite under timeout, retry, rate-limit, and deadline policy
//! - [`judge`], which executes `llm_judge` rules through a provider call
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use minder_core::{summarize, Suite};
//! use minder_runtime::{run_suite, providers::DummyProvider, RunConfig};
//!
//! let suite = Suite::from_yaml_file("suites/math_basics.yaml")?;
//! let result = run_suite(&suite, Arc::new(DummyProvider::new()), RunConfig::default()).await?;
//! let summary = summarize(&result);
//! println!("pass rate {:.0}%", summary.overall_pass_rate * 100.0);
//! ```

use std::sync::Arc;

use minder_core::{Suite, SuiteResult};

pub mod judge;
pub mod orchestrator;
pub mod providers;
pub mod resilience;

pub use orchestrator::{Orchestrator, OrchestratorBuilder, RunConfig, RuntimeError};
pub use providers::{
    build_provider, ApiKey, DummyProvider, GenerateOptions, ProviderConfig, ProviderError,
    ProviderKind, TextProvider, TextResponse,
};
pub use resilience::{RateLimit, RetryPolicy};

/// Evaluate a suite with a provider under the given run configuration.
///
/// Function-call-level boundary for embedders: builds an orchestrator and
/// returns the complete result tree.
pub async fn run_suite(
    suite: &Suite,
    provider: Arc<dyn TextProvider>,
    config: RunConfig,
) -> Result<SuiteResult, RuntimeError> {
    let orchestrator = Orchestrator::new(provider, config)?;
    Ok(orchestrator.run(suite).await)
}
