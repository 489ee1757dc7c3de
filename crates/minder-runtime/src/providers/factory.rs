//! Provider construction from resolved configuration.

use std::sync::Arc;

use super::{DummyProvider, ProviderConfig, ProviderError, ProviderKind, TextProvider};

/// Build the provider a configuration asks for.
///
/// The dummy backend is always available. Network backends require their
/// cargo feature; asking for one in a build without it is a configuration
/// error, not a silent fallback.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn TextProvider>, ProviderError> {
    match config.kind {
        ProviderKind::Dummy => Ok(Arc::new(
            DummyProvider::new().with_model(config.model.clone()),
        )),
        ProviderKind::OpenAi => build_openai(config),
        ProviderKind::Anthropic => build_anthropic(config),
    }
}

#[cfg(feature = "openai")]
fn build_openai(config: &ProviderConfig) -> Result<Arc<dyn TextProvider>, ProviderError> {
    use super::openai::OpenAiProvider;
    use super::secrets::ApiKey;

    let provider = match &config.api_key {
        Some(key) => OpenAiProvider::new(
            ApiKey::new(key.expose(), "OpenAI API key"),
            config.model.clone(),
        ),
        None => OpenAiProvider::from_env(config.model.clone())?,
    };
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "openai"))]
fn build_openai(_config: &ProviderConfig) -> Result<Arc<dyn TextProvider>, ProviderError> {
    Err(ProviderError::NotConfigured(
        "minder-runtime was built without the 'openai' feature".to_string(),
    ))
}

#[cfg(feature = "anthropic")]
fn build_anthropic(config: &ProviderConfig) -> Result<Arc<dyn TextProvider>, ProviderError> {
    use super::anthropic::AnthropicProvider;
    use super::secrets::ApiKey;

    let provider = match &config.api_key {
        Some(key) => AnthropicProvider::new(
            ApiKey::new(key.expose(), "Anthropic API key"),
            config.model.clone(),
        ),
        None => AnthropicProvider::from_env(config.model.clone())?,
    };
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "anthropic"))]
fn build_anthropic(_config: &ProviderConfig) -> Result<Arc<dyn TextProvider>, ProviderError> {
    Err(ProviderError::NotConfigured(
        "minder-runtime was built without the 'anthropic' feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_always_builds() {
        let provider = build_provider(&ProviderConfig::dummy()).unwrap();
        assert_eq!(provider.name(), "dummy");
        assert_eq!(provider.model(), "dummy-small");
    }

    #[cfg(not(feature = "openai"))]
    #[test]
    fn openai_requires_feature() {
        let config = ProviderConfig::new(ProviderKind::OpenAi, "gpt-4o-mini");
        assert!(matches!(
            build_provider(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[cfg(feature = "openai")]
    #[test]
    fn openai_builds_with_explicit_key() {
        use super::super::secrets::ApiKey;

        let config = ProviderConfig::new(ProviderKind::OpenAi, "gpt-4o-mini")
            .with_api_key(ApiKey::new("test-key", "OpenAI API key"));
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[cfg(feature = "anthropic")]
    #[test]
    fn anthropic_builds_with_explicit_key() {
        use super::super::secrets::ApiKey;

        let config = ProviderConfig::new(ProviderKind::Anthropic, "claude-3-5-haiku-20241022")
            .with_api_key(ApiKey::new("test-key", "Anthropic API key"));
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }
}
