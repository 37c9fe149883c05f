//! Conversation backend module.
//!
//! This module owns the per-call chat history and the adapters that turn it
//! into model replies.
//!
//! # Architecture
//!
//! - [`ConversationContext`] - append-only turn history for one call
//! - [`ConversationBackend`] - trait implemented by hosted chat models
//! - [`GeminiBackend`] - Google Gemini `generateContent` adapter
//!
//! # Example
//!
//! ```rust,ignore
//! use sprout_voice_relay::core::conversation::{
//!     ConversationBackend, ConversationContext, GeminiBackend, GeminiConfig,
//! };
//!
//! let backend = GeminiBackend::with_config(GeminiConfig::new("api-key"))?;
//! let mut context = ConversationContext::new();
//! let reply = backend.respond(&mut context, "How much milk should I order?").await?;
//! assert_eq!(context.len(), 2);
//! ```

mod base;
mod context;
pub mod gemini;

pub use base::{
    ConversationBackend, ConversationError, ConversationResult, SYSTEM_INSTRUCTION,
    SharedConversationBackend,
};
pub use context::{ConversationContext, Turn, TurnRole};
pub use gemini::{GeminiBackend, GeminiConfig};
