//! Gemini `generateContent` wire types.
//!
//! Only the fields this service reads or writes are modelled; unknown response
//! fields are ignored.

use serde::{Deserialize, Serialize};

use crate::core::conversation::context::{Turn, TurnRole};

/// Gemini names the assistant role "model".
pub const ROLE_USER: &str = "user";
pub const ROLE_MODEL: &str = "model";

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Content block with a single text part.
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        let role = match turn.role {
            TurnRole::User => ROLE_USER,
            TurnRole::Assistant => ROLE_MODEL,
        };
        Content::text(Some(role), turn.text.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any.
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct GeminiErrorResponse {
    pub error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct GeminiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![
                Content::from(&Turn::user("hello")),
                Content::from(&Turn::assistant("hi")),
            ],
            system_instruction: Some(Content::text(None, "be brief")),
        };

        let json = serde_json::to_value(&request).expect("Should serialize");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "hi");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(json["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn test_first_text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Milk demand "}, {"text": "is steady."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10}
        }"#;
        let response: GenerateContentResponse =
            serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(
            response.first_text().as_deref(),
            Some("Milk demand is steady.")
        );
    }

    #[test]
    fn test_error_envelope_keeps_message_and_status() {
        let json = r#"{
            "error": {
                "code": 503,
                "message": "The model is overloaded.",
                "status": "UNAVAILABLE",
                "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo"}]
            }
        }"#;
        let response: GeminiErrorResponse =
            serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(response.error.message, "The model is overloaded.");
        assert_eq!(response.error.status.as_deref(), Some("UNAVAILABLE"));
    }

    #[test]
    fn test_first_text_none_when_blocked() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let response: GenerateContentResponse =
            serde_json::from_str(json).expect("Should deserialize");
        assert!(response.first_text().is_none());
        assert_eq!(
            response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .as_deref(),
            Some("SAFETY")
        );
    }
}
