//! Suite orchestration.
//!
//! The orchestrator drives the provider through every case of a suite:
//! - per-call timeout, with transient failures retried under exponential
//!   backoff (the retry loop lives in [`crate::resilience`])
//! - bounded concurrency, with results landing in pre-indexed slots so the
//!   output order always matches the suite's declared case order
//! - an optional suite deadline that cancels in-flight and pending work
//!   while still returning one result per case
//!
//! A single case's terminal provider failure is captured in its result and
//! never aborts the suite. Every run yields a complete [`SuiteResult`].

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use thiserror::Error;

use minder_core::{
    Case, CaseResult, ProviderFailure, ProviderFailureKind, Rule, Suite, SuiteResult,
};

use crate::judge;
use crate::providers::{GenerateOptions, ProviderError, TextProvider, TextResponse};
use crate::resilience::{
    retry_with_policy, RateLimit, RetryPolicy, Sleeper, TokenBucket, TokioSleeper,
};

/// Failure message recorded for cases cut off by the suite deadline.
const SUITE_DEADLINE_EXCEEDED: &str = "suite deadline exceeded";

/// Errors from orchestrator construction.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),
}

/// Run-level configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum cases evaluated concurrently. Must be at least 1.
    pub concurrency_limit: usize,

    /// Overall deadline for the suite; unfinished cases are marked as
    /// timed out when it fires.
    pub suite_deadline: Option<Duration>,

    /// Retry policy for transient provider failures.
    pub retry: RetryPolicy,

    /// Shared token bucket guarding provider calls.
    pub rate_limit: RateLimit,

    /// Generation parameters, including the per-call timeout.
    pub generation: GenerateOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 4,
            suite_deadline: None,
            retry: RetryPolicy::default(),
            rate_limit: RateLimit::default(),
            generation: GenerateOptions::default(),
        }
    }
}

/// Drives a provider through a suite and assembles the result tree.
pub struct Orchestrator {
    provider: Arc<dyn TextProvider>,
    config: RunConfig,
    limiter: TokenBucket,
    sleeper: Arc<dyn Sleeper>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn TextProvider>, config: RunConfig) -> Result<Self, RuntimeError> {
        OrchestratorBuilder::new()
            .provider(provider)
            .config(config)
            .build()
    }

    /// Evaluate every case of the suite.
    ///
    /// Infallible by design: provider failures and deadline expiry are
    /// recorded per case, and the returned tree always holds exactly one
    /// result per suite case, in suite order.
    pub async fn run(&self, suite: &Suite) -> SuiteResult {
        tracing::info!(
            suite = %suite.name,
            cases = suite.cases.len(),
            provider = self.provider.name(),
            concurrency = self.config.concurrency_limit,
            "starting suite evaluation"
        );

        let mut slots: Vec<Option<CaseResult>> = vec![None; suite.cases.len()];

        {
            let indexed = suite
                .cases
                .iter()
                .enumerate()
                .map(|(index, case)| async move { (index, self.evaluate_case(case).await) });
            let mut in_flight = stream::iter(indexed).buffer_unordered(self.config.concurrency_limit);

            let deadline = async {
                match self.config.suite_deadline {
                    Some(limit) => tokio::time::sleep(limit).await,
                    None => std::future::pending().await,
                }
            };
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    next = in_flight.next() => match next {
                        Some((index, result)) => slots[index] = Some(result),
                        None => break,
                    },
                    _ = &mut deadline => {
                        tracing::warn!(suite = %suite.name, "suite deadline exceeded, cancelling remaining cases");
                        break;
                    }
                }
            }
            // Dropping the stream here cancels any in-flight case futures.
        }

        let case_results = suite
            .cases
            .iter()
            .zip(slots)
            .map(|(case, slot)| {
                slot.unwrap_or_else(|| {
                    CaseResult::failed(
                        &case.id,
                        &case.category,
                        ProviderFailure::new(ProviderFailureKind::Timeout, SUITE_DEADLINE_EXCEEDED),
                    )
                })
            })
            .collect();

        SuiteResult::new(&suite.name, &suite.age_band, case_results)
    }

    /// Evaluate one case: provider call under retry policy, then scoring.
    async fn evaluate_case(&self, case: &Case) -> CaseResult {
        tracing::debug!(case = %case.id, "awaiting provider");

        let generated = match retry_with_policy(&self.config.retry, self.sleeper.as_ref(), |attempt| {
            self.provider_call(&case.prompt, attempt)
        })
        .await
        {
            Ok(generated) => generated,
            Err(error) => {
                tracing::warn!(case = %case.id, error = %error, "provider failed terminally");
                return CaseResult::failed(&case.id, &case.category, error.to_failure());
            }
        };

        tracing::debug!(
            case = %case.id,
            latency_ms = generated.latency.as_millis() as u64,
            "scoring response"
        );

        let mut outcomes = Vec::with_capacity(case.rules.len());
        for rule in &case.rules {
            let outcome = match rule {
                Rule::LlmJudge { rubric, .. } => {
                    judge::run_judge(
                        self.provider.as_ref(),
                        &self.limiter,
                        &self.config.generation,
                        rubric,
                        rule.description(),
                        &generated.text,
                    )
                    .await
                }
                deterministic => deterministic.evaluate(&generated.text),
            };
            outcomes.push(outcome);
        }

        CaseResult::scored(
            &case.id,
            &case.category,
            generated.text,
            Some(generated.latency.as_millis() as u64),
            outcomes,
        )
    }

    /// One rate-limited provider call under the per-call timeout.
    async fn provider_call(
        &self,
        prompt: &str,
        attempt: u32,
    ) -> Result<TextResponse, ProviderError> {
        self.limiter.acquire().await;
        tracing::trace!(attempt, "provider call");

        let timeout = self.config.generation.timeout;
        match tokio::time::timeout(timeout, self.provider.generate(prompt, &self.config.generation))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout)),
        }
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    provider: Option<Arc<dyn TextProvider>>,
    config: RunConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: RunConfig::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn TextProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the sleep implementation used between retries (tests).
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn build(self) -> Result<Orchestrator, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::ProviderNotConfigured("no provider set".to_string()))?;

        if self.config.concurrency_limit == 0 {
            return Err(RuntimeError::InvalidConfig(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }

        let limiter = TokenBucket::new(&self.config.rate_limit);
        Ok(Orchestrator {
            provider,
            config: self.config,
            limiter,
            sleeper: self.sleeper,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
