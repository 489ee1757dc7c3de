//! Secure API key handling.
//!
//! Every provider stores its credential in an [`ApiKey`]:
//!
//! - `Debug` prints `[REDACTED]`, so keys cannot leak through logs
//! - the backing memory is zeroed on drop (`secrecy` crate)
//! - the value is only reachable through an explicit [`ApiKey::expose`]
//!   at the point of use (an HTTP header)

use secrecy::{ExposeSecret, SecretString};

use super::ProviderError;

/// A securely-stored API credential.
pub struct ApiKey {
    value: SecretString,
    name: &'static str,
}

impl ApiKey {
    /// Wrap a key value. `name` is the human-readable label used in error
    /// messages (e.g. "OpenAI API key").
    pub fn new(value: impl Into<String>, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            name,
        }
    }

    /// Load a key from an environment variable.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ProviderError> {
        std::env::var(env_var)
            .map(|v| Self::new(v, name))
            .map_err(|_| {
                ProviderError::NotConfigured(format!(
                    "{} not set: configure the '{}' environment variable",
                    name, env_var
                ))
            })
    }

    /// Explicitly expose the key for use in a request header.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let key = ApiKey::new("sk-super-secret-123", "test key");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("sk-super-secret-123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn expose_returns_the_value() {
        let key = ApiKey::new("sk-super-secret-123", "test key");
        assert_eq!(key.expose(), "sk-super-secret-123");
        assert!(!key.is_empty());
    }

    #[test]
    fn missing_env_var_is_not_configured() {
        let result = ApiKey::from_env("MINDER_TEST_KEY_THAT_DOES_NOT_EXIST", "test key");
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
