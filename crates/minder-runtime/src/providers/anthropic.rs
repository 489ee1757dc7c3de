//! Anthropic Claude provider over the messages endpoint.

use std::sync::OnceLock;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::secrets::ApiKey;
use super::{GenerateOptions, ProviderError, TextProvider, TextResponse};

/// Environment variable name for the Anthropic API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    credential: ApiKey,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("credential", &self.credential)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(api_key: ApiKey, model: impl Into<String>) -> Self {
        Self {
            credential: api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self, ProviderError> {
        let credential = ApiKey::from_env(ANTHROPIC_API_KEY_ENV, "Anthropic API key")?;
        Ok(Self::new(credential, model))
    }

    /// Point at a compatible endpoint (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn client(&self) -> &reqwest::Client {
        static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
        CLIENT.get_or_init(|| {
            reqwest::Client::builder()
                .build()
                .expect("failed to build HTTP client")
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Text { text: &'a str },
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlockResponse>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ContentBlockResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<TextResponse, ProviderError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![ContentBlock::Text { text: prompt }],
            }],
            temperature: if options.temperature == 0.0 {
                None
            } else {
                Some(options.temperature)
            },
        };

        let started = Instant::now();

        // The credential is only exposed here, at the point of use.
        let response = self
            .client()
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .timeout(options.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(options.timeout)
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(std::time::Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthFailed);
        }

        if status.is_server_error() {
            return Err(ProviderError::Network(format!(
                "server error {}",
                status.as_u16()
            )));
        }

        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|e| e.to_string());
            return Err(ProviderError::InvalidResponse(format!(
                "{} - {}",
                status.as_u16(),
                message
            )));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = body
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "message contained no text blocks".to_string(),
            ));
        }

        Ok(TextResponse {
            text: text.trim().to_string(),
            latency: started.elapsed(),
            model: body.model,
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_identity() {
        let provider = AnthropicProvider::new(
            ApiKey::new("test-key", "Anthropic API key"),
            "claude-3-5-haiku-20241022",
        );
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model(), "claude-3-5-haiku-20241022");
    }

    #[test]
    fn api_key_not_in_debug_output() {
        let secret = "sk-ant-REDACTED";
        let provider = AnthropicProvider::new(
            ApiKey::new(secret, "Anthropic API key"),
            "claude-3-5-haiku-20241022",
        );
        let debug = format!("{:?}", provider);
        assert!(!debug.contains(secret));
        assert!(debug.contains("[REDACTED]"));
    }
}
