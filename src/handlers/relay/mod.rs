//! ConversationRelay WebSocket endpoint
//!
//! The telephony provider opens one WebSocket per call and exchanges JSON
//! text frames.
//!
//! ## Provider → Server
//!
//! - **setup**: call announced (`callId`, or the provider's `callSid`)
//! - **prompt**: transcribed caller speech (`voicePrompt`)
//! - **interrupt**: caller spoke over playback
//! - anything else (`dtmf`, `error`, ...) is ignored
//!
//! ## Server → Provider
//!
//! - **text**: reply to speak, always sent whole (`last: true`)

mod handler;
pub mod messages;

pub use handler::relay_handler;
