//! Google Gemini configuration types.

use std::time::Duration;

use crate::core::conversation::base::SYSTEM_INSTRUCTION;

/// Public Gemini API host.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Fast model suited to spoken back-and-forth.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Request timeout applied when none is configured.
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 30;

/// API version path segment. `systemInstruction` requires v1beta.
pub const GEMINI_API_VERSION: &str = "v1beta";

/// Configuration for [`super::GeminiBackend`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header
    pub api_key: String,
    /// Model name, e.g. "gemini-2.5-flash"
    pub model: String,
    /// Scheme and host of the API, without trailing slash
    pub base_url: String,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Persona instruction sent with every request
    pub system_instruction: String,
}

impl GeminiConfig {
    /// Configuration with the default model, host, timeout and persona.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_GEMINI_TIMEOUT_SECS),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the configuration before building a client.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("Gemini API key must not be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("Gemini model must not be empty".to_string());
        }
        if self.timeout.is_zero() {
            return Err("Gemini timeout must be greater than zero".to_string());
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| format!("Invalid Gemini base URL '{}': {e}", self.base_url))?;
        Ok(())
    }

    /// Full `generateContent` endpoint for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            GEMINI_API_VERSION,
            self.model
        )
    }
}

impl Drop for GeminiConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.api_key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeminiConfig::new("key");
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.system_instruction, SYSTEM_INSTRUCTION);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = GeminiConfig::new("key")
            .with_base_url("http://127.0.0.1:9999/")
            .with_model("gemini-2.5-pro");
        assert_eq!(
            config.endpoint(),
            "http://127.0.0.1:9999/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(GeminiConfig::new("  ").validate().is_err());
        assert!(GeminiConfig::new("key").with_model("").validate().is_err());
        assert!(
            GeminiConfig::new("key")
                .with_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            GeminiConfig::new("key")
                .with_base_url("not a url")
                .validate()
                .is_err()
        );
    }
}
