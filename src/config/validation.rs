//! Configuration validation logic.

use std::path::PathBuf;

use super::TlsConfig;

/// Build the TLS configuration from an optional certificate/key pair.
///
/// Both paths or neither must be given.
pub(crate) fn validate_tls(
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    match (cert_path, key_path) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => {
            Err("TLS certificate path is set but TLS_KEY_PATH / server.tls.key_path is missing".into())
        }
        (None, Some(_)) => Err(
            "TLS key path is set but TLS_CERT_PATH / server.tls.cert_path is missing".into(),
        ),
    }
}

/// The backend timeout must be positive.
pub(crate) fn validate_timeout(seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    if seconds == 0 {
        return Err("GEMINI_TIMEOUT_SECONDS must be greater than zero".into());
    }
    Ok(())
}

/// Rate limiting needs a positive rate and burst.
pub(crate) fn validate_rate_limit(
    requests_per_second: u32,
    burst_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if requests_per_second == 0 {
        return Err("RATE_LIMIT_REQUESTS_PER_SECOND must be greater than zero".into());
    }
    if burst_size == 0 {
        return Err("RATE_LIMIT_BURST_SIZE must be greater than zero".into());
    }
    Ok(())
}
