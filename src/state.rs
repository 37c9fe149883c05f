//! Shared application state.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::{
    ConversationResult, GeminiBackend, SessionRegistry, SharedConversationBackend,
};

/// Why a new WebSocket connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    /// `max_websocket_connections` reached
    GlobalLimitReached,
    /// `max_connections_per_ip` reached for the client address
    PerIpLimitReached,
}

/// State shared by every request and connection.
pub struct AppState {
    pub config: ServerConfig,
    /// Live call sessions, keyed by call id
    pub sessions: Arc<SessionRegistry>,
    /// Conversation backend answering caller prompts
    pub backend: SharedConversationBackend,

    ws_connections: AtomicUsize,
    ip_connections: Mutex<HashMap<IpAddr, u32>>,
}

impl AppState {
    /// Build the state with the Gemini backend described by `config`.
    pub fn new(config: ServerConfig) -> ConversationResult<Arc<Self>> {
        let backend = GeminiBackend::with_config(config.gemini_config())?;
        info!(
            provider = "gemini",
            model = %config.gemini_model,
            "Conversation backend ready"
        );
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Build the state around an already constructed backend.
    pub fn with_backend(config: ServerConfig, backend: SharedConversationBackend) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions: Arc::new(SessionRegistry::new()),
            backend,
            ws_connections: AtomicUsize::new(0),
            ip_connections: Mutex::new(HashMap::new()),
        })
    }

    /// Reserve a WebSocket slot for `ip`.
    ///
    /// Every successful call must be paired with [`release_connection`](Self::release_connection).
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let mut per_ip = self.ip_connections.lock();

        if let Some(max) = self.config.max_websocket_connections
            && self.ws_connections.load(Ordering::Acquire) >= max
        {
            return Err(ConnectionLimitError::GlobalLimitReached);
        }

        let count = per_ip.entry(ip).or_insert(0);
        if *count >= self.config.max_connections_per_ip {
            return Err(ConnectionLimitError::PerIpLimitReached);
        }

        *count += 1;
        self.ws_connections.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Return a slot taken by [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let mut per_ip = self.ip_connections.lock();

        if let Some(count) = per_ip.get_mut(&ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                per_ip.remove(&ip);
            }
            self.ws_connections.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Open relay WebSocket connections.
    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::Acquire)
    }

    /// Open relay WebSocket connections from `ip`.
    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.ip_connections.lock().get(ip).copied().unwrap_or(0)
    }
}
