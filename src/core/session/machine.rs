//! Call session state machine.
//!
//! One [`CallSession`] exists per transport connection and walks through
//! `Uninitialized -> Active -> Closed`. Events that do not fit the current
//! phase are rejected with a [`SessionError`]; the caller logs and drops them
//! and the connection carries on.
//!
//! | Phase         | Event       | Effect                          | Next          |
//! |---------------|-------------|---------------------------------|---------------|
//! | Uninitialized | setup       | registry create                 | Active        |
//! | Active        | prompt      | registry get, hand to backend   | Active        |
//! | Active        | interrupt   | observed only                   | Active        |
//! | Uninitialized | prompt      | `NotFound`                      | Uninitialized |
//! | Active        | setup       | `AlreadyActive`                 | Active        |
//! | any           | disconnect  | registry release                | Closed        |

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::registry::{RegistryError, SessionHandle, SessionRegistry};

/// Lifecycle phase of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallPhase {
    /// Connection open, no setup received yet
    #[default]
    Uninitialized,
    /// Setup received; prompts are routed to the conversation
    Active,
    /// Transport closed; terminal
    Closed,
}

impl CallPhase {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for CallPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events that drive a call session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// Provider announced the call
    Setup { call_id: String },
    /// Caller said something
    Prompt { utterance: String },
    /// Caller spoke over the assistant
    Interrupt { utterance_until_interrupt: Option<String> },
    /// Transport closed
    Disconnect,
}

impl CallEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Setup { .. } => "setup",
            Self::Prompt { .. } => "prompt",
            Self::Interrupt { .. } => "interrupt",
            Self::Disconnect => "disconnect",
        }
    }
}

/// Reasons an event was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No usable session for the event (prompt before setup, or the call id
    /// now belongs to another registration)
    #[error("No active session for call {}", .call_id.as_deref().unwrap_or("<before setup>"))]
    NotFound { call_id: Option<String> },

    /// A second setup arrived on a connection that already has a call
    #[error("Connection already carries call {0}")]
    AlreadyActive(String),

    /// The session has been torn down
    #[error("Session is closed")]
    Closed,
}

impl From<RegistryError> for SessionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(call_id) => SessionError::NotFound {
                call_id: Some(call_id),
            },
        }
    }
}

/// A prompt ready to be answered by the conversation backend.
#[derive(Debug, Clone)]
pub struct PromptJob {
    pub handle: SessionHandle,
    pub utterance: String,
}

/// What the connection handler has to do after an event.
#[derive(Debug)]
pub enum SessionAction {
    /// Nothing beyond the state change
    None,
    /// Answer this prompt and send the reply back
    Respond(PromptJob),
}

/// Per-connection call session.
///
/// Dropping the session closes it, so the registry entry is released even if
/// the connection task is cancelled.
#[derive(Debug)]
pub struct CallSession {
    registry: Arc<SessionRegistry>,
    phase: CallPhase,
    handle: Option<SessionHandle>,
}

impl CallSession {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            phase: CallPhase::Uninitialized,
            handle: None,
        }
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    /// Call id established by setup, if any.
    pub fn call_id(&self) -> Option<&str> {
        self.handle.as_ref().map(SessionHandle::call_id)
    }

    /// Apply one event.
    pub fn handle(&mut self, event: CallEvent) -> Result<SessionAction, SessionError> {
        match event {
            CallEvent::Setup { call_id } => self.on_setup(call_id).map(|()| SessionAction::None),
            CallEvent::Prompt { utterance } => self.on_prompt(utterance).map(SessionAction::Respond),
            CallEvent::Interrupt {
                utterance_until_interrupt,
            } => self
                .on_interrupt(utterance_until_interrupt.as_deref())
                .map(|()| SessionAction::None),
            CallEvent::Disconnect => {
                self.close();
                Ok(SessionAction::None)
            }
        }
    }

    fn on_setup(&mut self, call_id: String) -> Result<(), SessionError> {
        match self.phase {
            CallPhase::Uninitialized => {
                let handle = self.registry.create(&call_id);
                info!(call_id = %call_id, "Call session set up");
                self.handle = Some(handle);
                self.phase = CallPhase::Active;
                Ok(())
            }
            CallPhase::Active => Err(SessionError::AlreadyActive(
                self.call_id().unwrap_or_default().to_string(),
            )),
            CallPhase::Closed => Err(SessionError::Closed),
        }
    }

    fn on_prompt(&self, utterance: String) -> Result<PromptJob, SessionError> {
        if self.phase == CallPhase::Closed {
            return Err(SessionError::Closed);
        }

        let own = self
            .handle
            .as_ref()
            .ok_or(SessionError::NotFound { call_id: None })?;

        let handle = self.registry.get(own.call_id())?;
        if !handle.same_session(own) {
            // The id was registered again by another connection.
            return Err(SessionError::NotFound {
                call_id: Some(own.call_id().to_string()),
            });
        }

        debug!(call_id = %handle.call_id(), chars = utterance.len(), "Prompt accepted");
        Ok(PromptJob { handle, utterance })
    }

    fn on_interrupt(&self, utterance_until_interrupt: Option<&str>) -> Result<(), SessionError> {
        match self.phase {
            CallPhase::Closed => Err(SessionError::Closed),
            _ => {
                info!(
                    call_id = self.call_id().unwrap_or("<before setup>"),
                    heard = utterance_until_interrupt.unwrap_or_default(),
                    "Caller interrupted playback"
                );
                Ok(())
            }
        }
    }

    /// Tear the session down and release its registry entry.
    ///
    /// Returns `false` if the session was already closed.
    pub fn close(&mut self) -> bool {
        if self.phase == CallPhase::Closed {
            return false;
        }
        self.phase = CallPhase::Closed;

        match self.handle.take() {
            Some(handle) => {
                if self.registry.release(&handle) {
                    info!(call_id = %handle.call_id(), "Cleared session for call");
                } else {
                    warn!(
                        call_id = %handle.call_id(),
                        "Session was already replaced or removed at close"
                    );
                }
            }
            None => debug!("Connection closed before setup, nothing to release"),
        }
        true
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (Arc<SessionRegistry>, CallSession) {
        let registry = Arc::new(SessionRegistry::new());
        let session = CallSession::new(registry.clone());
        (registry, session)
    }

    fn setup(id: &str) -> CallEvent {
        CallEvent::Setup {
            call_id: id.to_string(),
        }
    }

    fn prompt(text: &str) -> CallEvent {
        CallEvent::Prompt {
            utterance: text.to_string(),
        }
    }

    #[test]
    fn test_setup_activates_and_registers() {
        let (registry, mut session) = session();
        assert_eq!(session.phase(), CallPhase::Uninitialized);

        let action = session.handle(setup("abc")).unwrap();
        assert!(matches!(action, SessionAction::None));
        assert_eq!(session.phase(), CallPhase::Active);
        assert_eq!(session.call_id(), Some("abc"));
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_prompt_before_setup_is_not_found() {
        let (registry, mut session) = session();

        let err = session.handle(prompt("hello")).unwrap_err();
        assert_eq!(err, SessionError::NotFound { call_id: None });
        assert_eq!(session.phase(), CallPhase::Uninitialized);
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_prompts_keep_single_registration() {
        let (registry, mut session) = session();
        session.handle(setup("abc")).unwrap();

        for text in ["one", "two", "three"] {
            match session.handle(prompt(text)).unwrap() {
                SessionAction::Respond(job) => {
                    assert_eq!(job.utterance, text);
                    assert_eq!(job.handle.call_id(), "abc");
                }
                SessionAction::None => panic!("Expected Respond action"),
            }
            assert_eq!(registry.size(), 1);
        }
    }

    #[test]
    fn test_second_setup_is_rejected() {
        let (registry, mut session) = session();
        session.handle(setup("abc")).unwrap();

        let err = session.handle(setup("def")).unwrap_err();
        assert_eq!(err, SessionError::AlreadyActive("abc".to_string()));
        assert_eq!(session.call_id(), Some("abc"));
        assert_eq!(registry.size(), 1);
        assert!(registry.get("def").is_err());
    }

    #[test]
    fn test_interrupt_keeps_phase() {
        let (_registry, mut session) = session();
        session.handle(setup("abc")).unwrap();

        let action = session
            .handle(CallEvent::Interrupt {
                utterance_until_interrupt: Some("Milk demand is".to_string()),
            })
            .unwrap();
        assert!(matches!(action, SessionAction::None));
        assert_eq!(session.phase(), CallPhase::Active);
    }

    #[test]
    fn test_disconnect_releases_and_closes() {
        let (registry, mut session) = session();
        session.handle(setup("abc")).unwrap();

        session.handle(CallEvent::Disconnect).unwrap();
        assert_eq!(session.phase(), CallPhase::Closed);
        assert_eq!(registry.size(), 0);
        assert!(registry.get("abc").is_err());

        // Terminal: nothing is accepted afterwards
        assert_eq!(session.handle(prompt("hi")).unwrap_err(), SessionError::Closed);
        assert_eq!(session.handle(setup("abc")).unwrap_err(), SessionError::Closed);
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_disconnect_before_setup_is_noop() {
        let (registry, mut session) = session();
        registry.create("other-call");

        session.handle(CallEvent::Disconnect).unwrap();
        assert_eq!(session.phase(), CallPhase::Closed);
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (registry, mut session) = session();
        session.handle(setup("abc")).unwrap();

        assert!(session.close());
        assert!(!session.close());
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_drop_releases_registration() {
        let registry = Arc::new(SessionRegistry::new());
        {
            let mut session = CallSession::new(registry.clone());
            session.handle(setup("abc")).unwrap();
            assert_eq!(registry.size(), 1);
        }
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_reused_call_id_is_not_shared() {
        let registry = Arc::new(SessionRegistry::new());
        let mut first = CallSession::new(registry.clone());
        let mut second = CallSession::new(registry.clone());

        first.handle(setup("dup")).unwrap();
        second.handle(setup("dup")).unwrap();
        assert_eq!(registry.size(), 1);

        // The older connection no longer owns the id
        assert_eq!(
            first.handle(prompt("hi")).unwrap_err(),
            SessionError::NotFound {
                call_id: Some("dup".to_string())
            }
        );

        // And tearing it down leaves the newer session alone
        first.close();
        assert_eq!(registry.size(), 1);
        assert!(matches!(
            second.handle(prompt("hi")).unwrap(),
            SessionAction::Respond(_)
        ));
    }
}
