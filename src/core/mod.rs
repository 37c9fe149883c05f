pub mod conversation;
pub mod session;

// Re-export commonly used types for convenience
pub use conversation::{
    ConversationBackend, ConversationContext, ConversationError, ConversationResult,
    GeminiBackend, GeminiConfig, SharedConversationBackend, Turn, TurnRole,
};

pub use session::{
    CallEvent, CallPhase, CallSession, PromptJob, RegistryError, SessionAction, SessionError,
    SessionHandle, SessionRegistry,
};
