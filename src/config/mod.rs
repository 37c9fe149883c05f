//! Configuration module for the voice relay server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use sprout_voice_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config = ServerConfig::from_file(&PathBuf::from("relay.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod merge;
mod utils;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::conversation::GeminiConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TTS_PROVIDER: &str = "ElevenLabs";
pub const DEFAULT_TTS_VOICE: &str = "FGY2WhTYpPnrIDTdsKH5";
pub const DEFAULT_WELCOME_GREETING: &str = "Hi! I am Sprout's AI voice assistant powered by Google Gemini. \
I can help you with grocery forecasting, inventory management, and store analytics. Ask me anything!";
pub const DEFAULT_RATE_LIMIT_REQUESTS_PER_SECOND: u32 = 60;
pub const DEFAULT_RATE_LIMIT_BURST_SIZE: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_PER_IP: u32 = 100;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsConfig>,

    /// Public `host[:port][/prefix]` the telephony provider reaches us on, without scheme
    pub public_domain: String,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_timeout_seconds: u64,

    /// Spoken by the provider when the call connects
    pub welcome_greeting: String,
    pub tts_provider: String,
    pub tts_voice: String,
    /// Reply sent when the backend fails; `None` keeps the caller waiting silently
    pub backend_error_reply: Option<String>,

    /// `"*"`, a comma-separated origin list, or `None` for same-origin only
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: u32,
    pub rate_limit_burst_size: u32,
    /// Global cap on concurrent relay WebSockets; `None` is unlimited
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: u32,
}

impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.gemini_api_key.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults)
    ///
    /// `.env` is loaded into the environment by `main` before this runs.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a value is malformed.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        merge::merge_config(None)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Required settings are missing after merging
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        merge::merge_config(Some(yaml_config))
    }

    /// Get the server address as a string in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// WebSocket URL handed to the provider in the TwiML document.
    pub fn websocket_url(&self) -> String {
        format!("wss://{}/ws", self.public_domain)
    }

    /// Build the Gemini backend configuration from the merged settings.
    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig::new(self.gemini_api_key.clone())
            .with_model(self.gemini_model.clone())
            .with_base_url(self.gemini_base_url.clone())
            .with_timeout(Duration::from_secs(self.gemini_timeout_seconds))
    }
}
