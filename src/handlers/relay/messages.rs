//! ConversationRelay WebSocket message types
//!
//! Inbound frames are decoded in two steps: the `type` tag is inspected first
//! so unknown event kinds can be told apart from malformed known ones, then
//! the payload is deserialized into its typed variant and size-checked.

use serde::{Deserialize, Serialize};

use crate::core::CallEvent;

/// Maximum allowed size for a single caller utterance (16 KiB)
pub const MAX_PROMPT_SIZE: usize = 16 * 1024;

// =============================================================================
// Incoming Messages (Provider -> Server)
// =============================================================================

/// Incoming WebSocket messages from the telephony provider
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RelayIncomingMessage {
    /// Call announced; carries the call identifier
    #[serde(rename = "setup")]
    Setup(SetupMessage),

    /// Transcribed caller speech
    #[serde(rename = "prompt")]
    Prompt(PromptMessage),

    /// Caller spoke over the assistant's playback
    #[serde(rename = "interrupt")]
    Interrupt(InterruptMessage),
}

/// Event kinds this endpoint understands.
const KNOWN_TYPES: [&str; 3] = ["setup", "prompt", "interrupt"];

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", try_from = "SetupFrame")]
pub struct SetupMessage {
    /// Opaque call identifier (`callSid` on the provider side)
    pub call_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Setup frame as sent on the wire. Providers may send `callId`, `callSid`
/// or both; `callId` wins when both are present.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetupFrame {
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    call_sid: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

impl TryFrom<SetupFrame> for SetupMessage {
    type Error = String;

    fn try_from(frame: SetupFrame) -> Result<Self, Self::Error> {
        let call_id = frame
            .call_id
            .or(frame.call_sid)
            .ok_or_else(|| "missing field `callId`".to_string())?;

        Ok(Self {
            call_id,
            from: frame.from,
            to: frame.to,
            session_id: frame.session_id,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptMessage {
    pub voice_prompt: String,

    /// Recognition language, e.g. `en-US`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// Whether this is the final fragment of the utterance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InterruptMessage {
    /// Portion of the reply played before the caller cut in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utterance_until_interrupt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_until_interrupt_ms: Option<u64>,
}

// =============================================================================
// Outgoing Messages (Server -> Provider)
// =============================================================================

/// Outgoing WebSocket messages to the telephony provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RelayOutgoingMessage {
    /// Text to be spoken to the caller
    #[serde(rename = "text")]
    Text {
        token: String,
        /// Always `true`: replies are sent whole, never streamed
        last: bool,
    },
}

impl RelayOutgoingMessage {
    /// A complete spoken reply.
    pub fn reply(token: impl Into<String>) -> Self {
        Self::Text {
            token: token.into(),
            last: true,
        }
    }
}

/// Routing for the connection's writer task
#[derive(Debug)]
pub enum RelayMessageRoute {
    Outgoing(RelayOutgoingMessage),
    Close,
}

// =============================================================================
// Decoding
// =============================================================================

/// Reasons an inbound frame was rejected at the boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayDecodeError {
    /// Frame is not JSON
    InvalidJson(String),
    /// JSON object without a string `type`
    MissingType,
    /// `type` is not one this endpoint handles
    UnknownType(String),
    /// Known `type`, but required fields missing or mistyped
    InvalidPayload { kind: String, reason: String },
    /// Prompt exceeds [`MAX_PROMPT_SIZE`]
    PromptTooLarge { size: usize, max: usize },
}

impl std::fmt::Display for RelayDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(reason) => write!(f, "Invalid JSON frame: {reason}"),
            Self::MissingType => write!(f, "Frame has no string 'type' field"),
            Self::UnknownType(kind) => write!(f, "Unknown event type '{kind}'"),
            Self::InvalidPayload { kind, reason } => {
                write!(f, "Malformed '{kind}' event: {reason}")
            }
            Self::PromptTooLarge { size, max } => {
                write!(f, "Prompt too large: {size} bytes (max: {max} bytes)")
            }
        }
    }
}

impl std::error::Error for RelayDecodeError {}

impl RelayDecodeError {
    /// Unknown event kinds are expected traffic; everything else is malformed.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, Self::UnknownType(_))
    }
}

impl RelayIncomingMessage {
    /// Decode and validate one text frame.
    pub fn decode(text: &str) -> Result<Self, RelayDecodeError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| RelayDecodeError::InvalidJson(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(RelayDecodeError::MissingType)?
            .to_string();

        if !KNOWN_TYPES.contains(&kind.as_str()) {
            return Err(RelayDecodeError::UnknownType(kind));
        }

        let message: Self =
            serde_json::from_value(value).map_err(|e| RelayDecodeError::InvalidPayload {
                kind: kind.clone(),
                reason: e.to_string(),
            })?;

        message.validate()?;
        Ok(message)
    }

    /// Field checks serde cannot express.
    pub fn validate(&self) -> Result<(), RelayDecodeError> {
        match self {
            RelayIncomingMessage::Setup(setup) => {
                if setup.call_id.trim().is_empty() {
                    return Err(RelayDecodeError::InvalidPayload {
                        kind: "setup".to_string(),
                        reason: "callId is empty".to_string(),
                    });
                }
            }
            RelayIncomingMessage::Prompt(prompt) => {
                let size = prompt.voice_prompt.len();
                if size > MAX_PROMPT_SIZE {
                    return Err(RelayDecodeError::PromptTooLarge {
                        size,
                        max: MAX_PROMPT_SIZE,
                    });
                }
                if prompt.voice_prompt.trim().is_empty() {
                    return Err(RelayDecodeError::InvalidPayload {
                        kind: "prompt".to_string(),
                        reason: "voicePrompt is empty".to_string(),
                    });
                }
            }
            RelayIncomingMessage::Interrupt(_) => {}
        }
        Ok(())
    }

    /// The session event this message drives.
    pub fn into_event(self) -> CallEvent {
        match self {
            RelayIncomingMessage::Setup(setup) => CallEvent::Setup {
                call_id: setup.call_id,
            },
            RelayIncomingMessage::Prompt(prompt) => CallEvent::Prompt {
                utterance: prompt.voice_prompt,
            },
            RelayIncomingMessage::Interrupt(interrupt) => CallEvent::Interrupt {
                utterance_until_interrupt: interrupt.utterance_until_interrupt,
            },
        }
    }
}
