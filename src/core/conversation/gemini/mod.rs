//! Google Gemini conversation backend.

mod client;
pub mod config;
pub mod messages;

pub use client::GeminiBackend;
pub use config::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_TIMEOUT_SECS, GeminiConfig,
};
