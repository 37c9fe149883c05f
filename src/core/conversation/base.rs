//! Base trait and types for conversation backends.
//!
//! A conversation backend turns the history of a call plus a new caller
//! utterance into the assistant reply. Implementations must leave the context
//! untouched when they fail.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::context::ConversationContext;

/// System instruction sent with every request.
pub const SYSTEM_INSTRUCTION: &str = "You are Sprout's AI voice assistant, specialized in grocery forecasting and inventory management. This conversation is happening over a phone call or voice interface, so your responses will be spoken aloud.

You help users with:
- Grocery demand forecasting
- Inventory management advice
- Product expiration tracking
- Sales analytics insights
- Supply chain optimization
- Seasonal demand patterns
- Promotional impact analysis

Please adhere to the following rules:
1. Provide clear, concise, and direct answers focused on grocery retail operations.
2. Spell out all numbers (e.g., say 'one thousand two hundred' instead of 1200).
3. Do not use any special characters like asterisks, bullet points, or emojis.
4. Keep the conversation natural and engaging.
5. Focus on practical advice for grocery store operations.
6. When discussing data, explain it in business terms that store managers can understand.";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to the conversation backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    /// The upstream model could not produce a reply (network, quota, bad response)
    #[error("Conversation backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend could not be constructed from the given settings
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for conversation operations.
pub type ConversationResult<T> = Result<T, ConversationError>;

// =============================================================================
// Backend Trait
// =============================================================================

/// A hosted chat model that continues a call's conversation.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Produce the reply to `utterance` given the turns already in `context`.
    ///
    /// On success the utterance and the reply are appended to `context` as one
    /// exchange and the reply text is returned. On failure `context` is left
    /// exactly as it was.
    async fn respond(
        &self,
        context: &mut ConversationContext,
        utterance: &str,
    ) -> ConversationResult<String>;

    /// Short provider name used in logs and health output.
    fn provider_name(&self) -> &'static str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;
}

/// Shared handle to a backend, cloned into every connection.
pub type SharedConversationBackend = Arc<dyn ConversationBackend>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConversationError::BackendUnavailable("Rate limit exceeded".to_string());
        assert_eq!(
            err.to_string(),
            "Conversation backend unavailable: Rate limit exceeded"
        );
    }

    #[test]
    fn test_system_instruction_persona() {
        assert!(SYSTEM_INSTRUCTION.starts_with("You are Sprout's AI voice assistant"));
        assert!(SYSTEM_INSTRUCTION.contains("Spell out all numbers"));
    }
}
