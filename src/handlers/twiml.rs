use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use quick_xml::escape::escape;
use std::sync::Arc;
use tracing::debug;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the TwiML document that connects a call to the relay WebSocket.
pub fn conversation_relay_twiml(config: &ServerConfig) -> String {
    let websocket_url = config.websocket_url();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Connect><ConversationRelay url="{}" welcomeGreeting="{}" ttsProvider="{}" voice="{}" /></Connect></Response>"#,
        escape(websocket_url.as_str()),
        escape(config.welcome_greeting.as_str()),
        escape(config.tts_provider.as_str()),
        escape(config.tts_voice.as_str()),
    )
}

/// POST /twiml - fetched by the telephony provider when a call comes in
pub async fn twiml_handler(State(state): State<Arc<AppState>>) -> Response {
    debug!(websocket_url = %state.config.websocket_url(), "Serving ConversationRelay TwiML");

    (
        [(header::CONTENT_TYPE, "text/xml")],
        conversation_relay_twiml(&state.config),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(greeting: &str) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            tls: None,
            public_domain: "abc123.ngrok-free.app".to_string(),
            gemini_api_key: "test-key".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_timeout_seconds: 30,
            welcome_greeting: greeting.to_string(),
            tts_provider: "ElevenLabs".to_string(),
            tts_voice: "FGY2WhTYpPnrIDTdsKH5".to_string(),
            backend_error_reply: None,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }

    #[test]
    fn test_twiml_points_at_websocket() {
        let xml = conversation_relay_twiml(&config("Hi there"));

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<ConversationRelay url="wss://abc123.ngrok-free.app/ws""#));
        assert!(xml.contains(r#"welcomeGreeting="Hi there""#));
        assert!(xml.contains(r#"ttsProvider="ElevenLabs""#));
        assert!(xml.contains(r#"voice="FGY2WhTYpPnrIDTdsKH5""#));
        assert!(xml.ends_with("</Connect></Response>"));
    }

    #[test]
    fn test_twiml_escapes_attributes() {
        let xml = conversation_relay_twiml(&config(r#"Hi! I'm "Sprout" & <friends>"#));

        assert!(xml.contains("&quot;Sprout&quot;"));
        assert!(xml.contains("&amp;"));
        assert!(xml.contains("&lt;friends&gt;"));
        assert!(!xml.contains(r#""Sprout""#));
    }
}
