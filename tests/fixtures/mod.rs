//! Test Fixtures Module
//!
//! Shared helpers for the relay integration tests:
//! - Configuration fixtures
//! - A scripted conversation backend
//! - A live server bound to an ephemeral port

// Not every test binary uses every helper
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use sprout_voice_relay::{
    ConversationBackend, ConversationContext, ConversationError, ConversationResult, ServerConfig,
    routes, state::AppState,
};

/// Minimal configuration pointing at an unused Gemini endpoint
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        public_domain: "relay.test".to_string(),
        gemini_api_key: "test-api-key".to_string(),
        gemini_model: "gemini-2.5-flash".to_string(),
        gemini_base_url: "http://127.0.0.1:9".to_string(),
        gemini_timeout_seconds: 5,
        welcome_greeting: "Hi! I am Sprout.".to_string(),
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

/// Backend whose replies name the utterance and how much history it saw.
///
/// Reply format: `"<utterance> (turn <n>)"`, where `n` is the exchange number
/// within the call. Utterances registered with [`fail_on`](Self::fail_on)
/// fail; those registered with [`hold_on`](Self::hold_on) wait until
/// [`release`](Self::release) is called.
#[derive(Default)]
pub struct ScriptedBackend {
    failures: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
    started: Notify,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, utterance: &str) {
        self.failures.lock().push(utterance.to_string());
    }

    pub fn hold_on(&self, utterance: &str) {
        self.gates
            .lock()
            .insert(utterance.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, utterance: &str) {
        if let Some(gate) = self.gates.lock().get(utterance) {
            gate.notify_one();
        }
    }

    /// Utterances the backend has been asked about, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Wait until the backend has received `count` calls.
    pub async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.started.notified();
                if self.calls.lock().len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("backend was not called in time");
    }
}

#[async_trait]
impl ConversationBackend for ScriptedBackend {
    async fn respond(
        &self,
        context: &mut ConversationContext,
        utterance: &str,
    ) -> ConversationResult<String> {
        self.calls.lock().push(utterance.to_string());
        self.started.notify_waiters();

        let gate = self.gates.lock().get(utterance).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failures.lock().iter().any(|f| f == utterance) {
            return Err(ConversationError::BackendUnavailable(
                "scripted failure".to_string(),
            ));
        }

        let reply = format!("{utterance} (turn {})", context.exchange_count() + 1);
        context.record_exchange(utterance, reply.clone());
        Ok(reply)
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// Serve the application router on an ephemeral port.
pub async fn spawn_server(state: Arc<AppState>) -> SocketAddr {
    let app = routes::create_app(state).expect("Router should build");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

/// Poll `condition` until it holds or a few seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
