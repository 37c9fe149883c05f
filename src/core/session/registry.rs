//! Registry of live call sessions.
//!
//! Maps a provider call id to the conversation context of that call. One
//! registry instance lives in the application state and is shared by every
//! connection handler.
//!
//! Mutations (`create`, `remove`, `release`) and the aggregate `size` go
//! through one `RwLock` write/read pair, so `size` always reflects a state
//! some sequence of mutations produced. Lock scopes are synchronous and never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::conversation::ConversationContext;

/// Conversation context shared between the registry and the prompt worker of
/// the owning connection.
pub type SharedContext = Arc<Mutex<ConversationContext>>;

/// Errors returned by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No live session for this call id
    #[error("No session registered for call {0}")]
    NotFound(String),
}

/// Handle to one registered session.
///
/// Cloning a handle does not clone the conversation; all clones point at the
/// same context. Two handles for the same call id compare as different
/// sessions when the id was re-registered in between.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    call_id: Arc<str>,
    context: SharedContext,
}

impl SessionHandle {
    fn new(call_id: &str) -> Self {
        Self {
            call_id: Arc::from(call_id),
            context: Arc::new(Mutex::new(ConversationContext::new())),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Whether both handles refer to the same registration.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.context, &other.context)
    }
}

/// Live mapping of call ids to sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh, empty conversation for `call_id`.
    ///
    /// An existing entry for the same id is replaced; this never fails.
    pub fn create(&self, call_id: &str) -> SessionHandle {
        let handle = SessionHandle::new(call_id);
        let replaced = self
            .sessions
            .write()
            .insert(call_id.to_string(), handle.clone());

        if replaced.is_some() {
            debug!(call_id = %call_id, "Replaced existing session registration");
        }
        handle
    }

    /// Look up the session for `call_id`.
    pub fn get(&self, call_id: &str) -> Result<SessionHandle, RegistryError> {
        self.sessions
            .read()
            .get(call_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(call_id.to_string()))
    }

    /// Remove the entry for `call_id`. Missing ids are a no-op.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&self, call_id: &str) -> bool {
        self.sessions.write().remove(call_id).is_some()
    }

    /// Remove the entry `handle` was issued for, leaving any newer
    /// registration of the same call id in place.
    ///
    /// Returns whether an entry was removed.
    pub fn release(&self, handle: &SessionHandle) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get(handle.call_id()) {
            Some(current) if current.same_session(handle) => {
                sessions.remove(handle.call_id());
                true
            }
            _ => false,
        }
    }

    /// Whether `handle` is still the registered session for its call id.
    pub fn is_live(&self, handle: &SessionHandle) -> bool {
        self.sessions
            .read()
            .get(handle.call_id())
            .is_some_and(|current| current.same_session(handle))
    }

    /// Number of live sessions.
    pub fn size(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}
