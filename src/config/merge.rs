//! Merging YAML and environment configurations.
//!
//! For each setting the YAML value wins, then the environment (which already
//! includes anything `.env` provided), then the built-in default.

use super::utils::{env_parse, env_string, env_string_any, normalize_public_domain};
use super::validation;
use super::yaml::{GeminiYaml, RelayYaml, SecurityYaml, ServerYaml, TlsYaml, YamlConfig};
use super::{
    DEFAULT_HOST, DEFAULT_MAX_CONNECTIONS_PER_IP, DEFAULT_PORT, DEFAULT_RATE_LIMIT_BURST_SIZE,
    DEFAULT_RATE_LIMIT_REQUESTS_PER_SECOND, DEFAULT_TTS_PROVIDER, DEFAULT_TTS_VOICE,
    DEFAULT_WELCOME_GREETING, ServerConfig,
};
use crate::core::conversation::gemini::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_TIMEOUT_SECS,
};

/// Build the final [`ServerConfig`] from the environment plus optional YAML overrides.
pub(crate) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let tls = server.tls.clone().unwrap_or_default();
    let gemini = yaml.gemini.unwrap_or_default();
    let relay = yaml.relay.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let (host, port, public_domain) = merge_server(&server)?;
    let tls = merge_tls(tls)?;
    let (gemini_api_key, gemini_model, gemini_base_url, gemini_timeout_seconds) =
        merge_gemini(gemini)?;
    let (welcome_greeting, tts_provider, tts_voice, backend_error_reply) = merge_relay(relay);
    let security = merge_security(security)?;

    Ok(ServerConfig {
        host,
        port,
        tls,
        public_domain,
        gemini_api_key,
        gemini_model,
        gemini_base_url,
        gemini_timeout_seconds,
        welcome_greeting,
        tts_provider,
        tts_voice,
        backend_error_reply,
        cors_allowed_origins: security.cors_allowed_origins,
        rate_limit_requests_per_second: security.rate_limit_requests_per_second,
        rate_limit_burst_size: security.rate_limit_burst_size,
        max_websocket_connections: security.max_websocket_connections,
        max_connections_per_ip: security.max_connections_per_ip,
    })
}

fn merge_server(
    server: &ServerYaml,
) -> Result<(String, u16, String), Box<dyn std::error::Error>> {
    let host = server
        .host
        .clone()
        .or_else(|| env_string("HOST"))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = match server.port {
        Some(port) => port,
        None => env_parse::<u16>("PORT")?.unwrap_or(DEFAULT_PORT),
    };

    let raw_public_url = server
        .public_url
        .clone()
        .or_else(|| env_string_any(&["PUBLIC_URL", "NGROK_URL"]))
        .ok_or("PUBLIC_URL (or NGROK_URL) must be set to the server's public address")?;
    let public_domain = normalize_public_domain(&raw_public_url)?;

    Ok((host, port, public_domain))
}

fn merge_tls(
    tls: TlsYaml,
) -> Result<Option<super::TlsConfig>, Box<dyn std::error::Error>> {
    let cert_path = tls.cert_path.or_else(|| env_string("TLS_CERT_PATH"));
    let key_path = tls.key_path.or_else(|| env_string("TLS_KEY_PATH"));
    validation::validate_tls(cert_path, key_path)
}

fn merge_gemini(
    gemini: GeminiYaml,
) -> Result<(String, String, String, u64), Box<dyn std::error::Error>> {
    let api_key = gemini
        .api_key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| env_string("GOOGLE_API_KEY"))
        .ok_or("GOOGLE_API_KEY must be set for the Gemini conversation backend")?;

    let model = gemini
        .model
        .or_else(|| env_string("GEMINI_MODEL"))
        .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

    let base_url = gemini
        .base_url
        .or_else(|| env_string("GEMINI_BASE_URL"))
        .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());

    let timeout_seconds = match gemini.timeout_seconds {
        Some(secs) => secs,
        None => env_parse::<u64>("GEMINI_TIMEOUT_SECONDS")?.unwrap_or(DEFAULT_GEMINI_TIMEOUT_SECS),
    };
    validation::validate_timeout(timeout_seconds)?;

    Ok((api_key, model, base_url, timeout_seconds))
}

fn merge_relay(relay: RelayYaml) -> (String, String, String, Option<String>) {
    let welcome_greeting = relay
        .welcome_greeting
        .or_else(|| env_string("WELCOME_GREETING"))
        .unwrap_or_else(|| DEFAULT_WELCOME_GREETING.to_string());

    let tts_provider = relay
        .tts_provider
        .or_else(|| env_string("TTS_PROVIDER"))
        .unwrap_or_else(|| DEFAULT_TTS_PROVIDER.to_string());

    let tts_voice = relay
        .voice
        .or_else(|| env_string("TTS_VOICE"))
        .unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string());

    let backend_error_reply = relay
        .backend_error_reply
        .filter(|r| !r.trim().is_empty())
        .or_else(|| env_string("BACKEND_ERROR_REPLY"));

    (welcome_greeting, tts_provider, tts_voice, backend_error_reply)
}

struct MergedSecurity {
    cors_allowed_origins: Option<String>,
    rate_limit_requests_per_second: u32,
    rate_limit_burst_size: u32,
    max_websocket_connections: Option<usize>,
    max_connections_per_ip: u32,
}

fn merge_security(
    security: SecurityYaml,
) -> Result<MergedSecurity, Box<dyn std::error::Error>> {
    let cors_allowed_origins = security
        .cors_allowed_origins
        .or_else(|| env_string("CORS_ALLOWED_ORIGINS"));

    let rate_limit_requests_per_second = match security.rate_limit_requests_per_second {
        Some(v) => v,
        None => env_parse::<u32>("RATE_LIMIT_REQUESTS_PER_SECOND")?
            .unwrap_or(DEFAULT_RATE_LIMIT_REQUESTS_PER_SECOND),
    };

    let rate_limit_burst_size = match security.rate_limit_burst_size {
        Some(v) => v,
        None => env_parse::<u32>("RATE_LIMIT_BURST_SIZE")?.unwrap_or(DEFAULT_RATE_LIMIT_BURST_SIZE),
    };
    validation::validate_rate_limit(rate_limit_requests_per_second, rate_limit_burst_size)?;

    let max_websocket_connections = match security.max_websocket_connections {
        Some(v) => Some(v),
        None => env_parse::<usize>("MAX_WEBSOCKET_CONNECTIONS")?,
    };

    let max_connections_per_ip = match security.max_connections_per_ip {
        Some(v) => v,
        None => env_parse::<u32>("MAX_CONNECTIONS_PER_IP")?.unwrap_or(DEFAULT_MAX_CONNECTIONS_PER_IP),
    };

    Ok(MergedSecurity {
        cors_allowed_origins,
        rate_limit_requests_per_second,
        rate_limit_burst_size,
        max_websocket_connections,
        max_connections_per_ip,
    })
}
