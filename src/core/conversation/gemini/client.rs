//! Google Gemini conversation backend.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base}/v1beta/models/{model}:generateContent`
//! - Auth: `x-goog-api-key` header
//! - History: `contents` with `user` / `model` roles, persona in `systemInstruction`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::config::GeminiConfig;
use super::messages::{Content, GeminiErrorResponse, GenerateContentRequest, GenerateContentResponse};
use crate::core::conversation::base::{ConversationBackend, ConversationError, ConversationResult};
use crate::core::conversation::context::ConversationContext;

/// Connect timeout for the HTTP client.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("sprout-voice-relay/", env!("CARGO_PKG_VERSION"));

/// Gemini-backed [`ConversationBackend`].
pub struct GeminiBackend {
    config: GeminiConfig,
    http_client: Client,
    endpoint: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend.
    ///
    /// # Arguments
    /// * `config` - Gemini-specific configuration
    ///
    /// # Returns
    /// * `ConversationResult<Self>` - New instance or `InvalidConfiguration`
    pub fn with_config(config: GeminiConfig) -> ConversationResult<Self> {
        config
            .validate()
            .map_err(ConversationError::InvalidConfiguration)?;

        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ConversationError::InvalidConfiguration(format!(
                    "Failed to create HTTP client: {e}"
                ))
            })?;

        let endpoint = config.endpoint();

        Ok(Self {
            config,
            http_client,
            endpoint,
        })
    }

    /// Build the request body: full history, then the new utterance.
    fn build_request(&self, context: &ConversationContext, utterance: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = Vec::with_capacity(context.len() + 1);
        contents.extend(context.turns().iter().map(Content::from));
        contents.push(Content::text(Some(super::messages::ROLE_USER), utterance));

        GenerateContentRequest {
            contents,
            system_instruction: Some(Content::text(None, self.config.system_instruction.clone())),
        }
    }

    /// Map a non-2xx response onto a backend error.
    fn classify_error(status: reqwest::StatusCode, body: &str) -> ConversationError {
        let detail = match serde_json::from_str::<GeminiErrorResponse>(body) {
            Ok(parsed) => match parsed.error.status {
                Some(code) => format!("{} ({code})", parsed.error.message),
                None => parsed.error.message,
            },
            Err(_) => body.to_string(),
        };

        let reason = match status.as_u16() {
            400 => format!("Invalid request: {detail}"),
            401 | 403 => format!("Authentication failed: {detail}"),
            404 => format!("Model not found: {detail}"),
            429 => format!("Rate limit exceeded: {detail}"),
            500..=599 => format!("Server error ({status}): {detail}"),
            _ => format!("HTTP {status}: {detail}"),
        };

        ConversationError::BackendUnavailable(reason)
    }

    /// Pull the reply text out of a successful response body.
    fn extract_reply(body: &str) -> ConversationResult<String> {
        let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
            ConversationError::BackendUnavailable(format!("Failed to parse response: {e}"))
        })?;

        if let Some(text) = response.first_text() {
            return Ok(text);
        }

        let reason = match (
            response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref()),
            response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.as_deref()),
        ) {
            (Some(block), _) => format!("Prompt blocked: {block}"),
            (None, Some(finish)) => format!("Empty reply (finish reason {finish})"),
            (None, None) => "Response contained no candidates".to_string(),
        };
        Err(ConversationError::BackendUnavailable(reason))
    }
}

#[async_trait]
impl ConversationBackend for GeminiBackend {
    async fn respond(
        &self,
        context: &mut ConversationContext,
        utterance: &str,
    ) -> ConversationResult<String> {
        let request = self.build_request(context, utterance);

        debug!(
            model = %self.config.model,
            turns = request.contents.len(),
            "Sending generateContent request"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("Request timeout: {e}")
                } else if e.is_connect() {
                    format!("Connection failed: {e}")
                } else {
                    format!("Request failed: {e}")
                };
                ConversationError::BackendUnavailable(reason)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ConversationError::BackendUnavailable(format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            let err = Self::classify_error(status, &body);
            warn!(model = %self.config.model, status = %status, "Gemini request failed");
            return Err(err);
        }

        let reply = Self::extract_reply(&body)?;

        // Commit only once the reply is known good.
        context.record_exchange(utterance, reply.clone());
        Ok(reply)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
