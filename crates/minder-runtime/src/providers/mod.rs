//! Text-generation providers.
//!
//! This module defines the provider capability the orchestrator drives and
//! the implementations behind it: a deterministic dummy for offline runs
//! and tests, plus OpenAI and Anthropic backends behind cargo features.
//!
//! Providers perform exactly one outbound call per invocation. They do not
//! cache and they do not retry; retry policy belongs to the orchestrator.
//!
//! ## Security
//!
//! API keys are held in [`ApiKey`] wrappers and cannot leak through
//! `Debug` output or log lines.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use minder_core::{ProviderFailure, ProviderFailureKind};

mod dummy;
mod factory;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;

#[cfg(feature = "openai")]
mod openai;

pub use dummy::DummyProvider;
pub use factory::build_provider;
pub use secrets::ApiKey;

#[cfg(feature = "anthropic")]
pub use anthropic::AnthropicProvider;

#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;

/// Errors from text-generation providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthFailed,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether the orchestrator may retry after this error.
    ///
    /// Auth and malformed-response failures are not transient and are
    /// never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout(_)
                | ProviderError::RateLimited { .. }
                | ProviderError::Network(_)
        )
    }

    /// The serializable failure recorded into a case result.
    pub fn to_failure(&self) -> ProviderFailure {
        let kind = match self {
            ProviderError::Timeout(_) => ProviderFailureKind::Timeout,
            ProviderError::RateLimited { .. } => ProviderFailureKind::RateLimited,
            ProviderError::AuthFailed => ProviderFailureKind::AuthFailed,
            ProviderError::Network(_) => ProviderFailureKind::NetworkError,
            ProviderError::InvalidResponse(_) | ProviderError::NotConfigured(_) => {
                ProviderFailureKind::InvalidResponse
            }
        };
        ProviderFailure::new(kind, self.to_string())
    }
}

/// Generation parameters for a single request.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic scoring runs).
    pub temperature: f32,

    /// Per-call timeout, applied by the HTTP client and again by the
    /// orchestrator wrapper.
    pub timeout: Duration,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: 300,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A provider's answer to one prompt.
#[derive(Debug, Clone)]
pub struct TextResponse {
    /// Raw response text.
    pub text: String,

    /// Wall-clock latency of the call.
    pub latency: Duration,

    /// Model that produced the text.
    pub model: String,
}

/// The provider capability: turn a prompt into response text.
///
/// Implementations map backend-specific failures into the shared
/// [`ProviderError`] taxonomy so the orchestrator's retry classification
/// works uniformly across backends.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Execute one generation call.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<TextResponse, ProviderError>;

    /// Provider name for logs and report metadata.
    fn name(&self) -> &str;

    /// Model name for report metadata.
    fn model(&self) -> &str;
}

/// Which backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Dummy,
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Default model for the backend when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Dummy => "dummy-small",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-20241022",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Dummy => write!(f, "dummy"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Resolved provider configuration. Immutable once constructed; the core
/// never reads environment variables or files on its own behalf (the
/// factory falls back to the conventional env vars only when no key is
/// supplied here).
#[derive(Debug)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    pub model: String,

    /// Explicit API key; when absent the factory consults the backend's
    /// conventional environment variable.
    pub api_key: Option<ApiKey>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
            api_key: None,
        }
    }

    /// Offline dummy configuration.
    pub fn dummy() -> Self {
        Self::new(ProviderKind::Dummy, ProviderKind::Dummy.default_model())
    }

    pub fn with_api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }
}
