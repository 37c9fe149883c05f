//! Conversation history owned by a single call.
//!
//! A [`ConversationContext`] is an ordered, append-only list of turns. The only
//! way to grow it is [`ConversationContext::record_exchange`], which appends a
//! user turn and the assistant turn that answered it in one step, so a failed
//! backend call can never leave half an exchange behind.

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The caller, as transcribed by the telephony provider
    User,
    /// The model reply played back to the caller
    Assistant,
}

impl TurnRole {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered turn history for one call.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    turns: Vec<Turn>,
}

impl ConversationContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// All turns in call order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns recorded so far.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of completed user/assistant exchanges.
    pub fn exchange_count(&self) -> usize {
        self.turns.len() / 2
    }

    /// Most recent assistant reply, if any.
    pub fn last_reply(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::Assistant)
            .map(|turn| turn.text.as_str())
    }

    /// Append a completed exchange: the caller utterance followed by the reply.
    pub fn record_exchange(&mut self, utterance: impl Into<String>, reply: impl Into<String>) {
        self.turns.reserve(2);
        self.turns.push(Turn::user(utterance));
        self.turns.push(Turn::assistant(reply));
    }
}
