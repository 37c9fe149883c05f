//! Call session lifecycle.
//!
//! - [`SessionRegistry`] - live `call id -> conversation` mapping shared by all connections
//! - [`CallSession`] - per-connection state machine over setup / prompt / interrupt / disconnect

mod machine;
mod registry;

pub use machine::{CallEvent, CallPhase, CallSession, PromptJob, SessionAction, SessionError};
pub use registry::{RegistryError, SessionHandle, SessionRegistry, SharedContext};
