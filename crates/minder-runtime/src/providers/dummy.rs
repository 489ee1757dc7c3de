//! Deterministic dummy provider.
//!
//! Answers from a canned table keyed on prompt fragments, with per-domain
//! fallbacks, so rule and orchestrator behavior can be exercised without
//! network access. Tests can additionally script failures (consumed one per
//! call before any canned answer) and inject latency.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{GenerateOptions, ProviderError, TextProvider, TextResponse};

/// Canned answers tried in order; first prompt fragment found wins.
const CANNED: &[(&str, &str)] = &[
    ("count from 1 to 10", "1, 2, 3, 4, 5, 6, 7, 8, 9, 10"),
    ("comes right after 6", "7"),
    ("1 + 1", "2"),
    ("3 apples", "You would have 5 apples."),
    ("8 cookies", "There would be 5 cookies left."),
    ("fingers", "You have 5 fingers on one hand."),
    ("triangle", "A triangle has 3 sides."),
    ("rhymes with cat", "hat"),
    (
        "stranger",
        "You should say 'No thank you' and walk away. Then tell a grown-up you trust, \
         like your parents or teacher.",
    ),
    (
        "bedtime story",
        "Once upon a time, a little bunny counted three bright stars, snuggled under a \
         soft blanket, and drifted happily off to sleep. The end.",
    ),
    (
        "lost in a store",
        "Stay calm and look for someone who works at the store. They will help you find \
         your family.",
    ),
    (
        "riding a bike",
        "You should always wear a helmet when riding a bike to keep your head safe.",
    ),
];

/// Deterministic provider for offline runs and tests.
pub struct DummyProvider {
    model: String,
    canned: Vec<(String, String)>,
    failures: Mutex<VecDeque<ProviderError>>,
    latency: Option<Duration>,
    calls: AtomicU32,
}

impl DummyProvider {
    pub fn new() -> Self {
        Self {
            model: "dummy-small".to_string(),
            canned: CANNED
                .iter()
                .map(|(fragment, reply)| (fragment.to_string(), reply.to_string()))
                .collect(),
            failures: Mutex::new(VecDeque::new()),
            latency: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Add a canned reply that takes precedence over the built-in table.
    /// `fragment` is matched case-insensitively against the prompt.
    pub fn with_reply(mut self, fragment: impl Into<String>, reply: impl Into<String>) -> Self {
        self.canned
            .insert(0, (fragment.into().to_lowercase(), reply.into()));
        self
    }

    /// Script failures to emit, one per call, before answering normally.
    pub fn with_failures(self, failures: Vec<ProviderError>) -> Self {
        *self.failures.lock() = failures.into();
        self
    }

    /// Inject latency per call (virtual time under tokio's paused clock).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `generate` calls made so far, including failed ones.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn fallback(&self, lowered_prompt: &str) -> String {
        const MATH_HINTS: &[&str] = &["math", "number", "count", "add", "plus", "minus", "subtract"];
        const READING_HINTS: &[&str] = &["read", "book", "story", "letter", "word"];

        if MATH_HINTS.iter().any(|hint| lowered_prompt.contains(hint)) {
            "That's a great math question! Let's count it out together.".to_string()
        } else if READING_HINTS.iter().any(|hint| lowered_prompt.contains(hint)) {
            "Reading is fun and helps us learn new things!".to_string()
        } else {
            "This is a safe and helpful answer for children.".to_string()
        }
    }
}

impl Default for DummyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextProvider for DummyProvider {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<TextResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }

        let started = Instant::now();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let lowered = prompt.to_lowercase();
        let text = self
            .canned
            .iter()
            .find(|(fragment, _)| lowered.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback(&lowered));

        Ok(TextResponse {
            text,
            latency: started.elapsed(),
            model: self.model.clone(),
        })
    }

    fn name(&self) -> &str {
        "dummy"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn canned_answers_match_prompt_fragments() {
        let provider = DummyProvider::new();
        let options = GenerateOptions::default();

        let response = provider
            .generate("What number comes right after 6?", &options)
            .await
            .unwrap();
        assert_eq!(response.text, "7");

        let response = provider
            .generate("Please tell me a bedtime story", &options)
            .await
            .unwrap();
        assert!(response.text.contains("bunny"));
    }

    #[tokio::test]
    async fn domain_fallbacks_apply() {
        let provider = DummyProvider::new();
        let options = GenerateOptions::default();

        let response = provider
            .generate("Can you subtract these for me?", &options)
            .await
            .unwrap();
        assert!(response.text.contains("math"));

        let response = provider.generate("Say hello", &options).await.unwrap();
        assert!(response.text.contains("safe"));
    }

    #[tokio::test]
    async fn custom_replies_take_precedence() {
        let provider = DummyProvider::new().with_reply("bedtime story", "Lights out!");
        let options = GenerateOptions::default();

        let response = provider
            .generate("Tell me a bedtime story", &options)
            .await
            .unwrap();
        assert_eq!(response.text, "Lights out!");
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let provider = DummyProvider::new().with_failures(vec![
            ProviderError::Timeout(Duration::from_secs(1)),
            ProviderError::Network("connection reset".into()),
        ]);
        let options = GenerateOptions::default();

        assert!(matches!(
            provider.generate("hi", &options).await,
            Err(ProviderError::Timeout(_))
        ));
        assert!(matches!(
            provider.generate("hi", &options).await,
            Err(ProviderError::Network(_))
        ));
        assert!(provider.generate("hi", &options).await.is_ok());
        assert_eq!(provider.calls(), 3);
    }
}
