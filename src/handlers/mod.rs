//! HTTP and WebSocket request handlers
//!
//! - `api` - Root and health endpoints
//! - `twiml` - TwiML document pointing the provider at the relay WebSocket
//! - `relay` - ConversationRelay WebSocket

pub mod api;
pub mod relay;
pub mod twiml;

pub use relay::relay_handler;
pub use twiml::twiml_handler;
