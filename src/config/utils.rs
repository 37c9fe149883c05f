//! Helpers for reading and normalizing configuration values.

use std::env;
use std::str::FromStr;

/// Read an environment variable, treating blank values as unset.
pub(crate) fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read the first of several environment variable names that is set.
pub(crate) fn env_string_any(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| env_string(name))
}

/// Read and parse an environment variable.
///
/// Unset or blank variables yield `Ok(None)`; unparsable ones are an error.
pub(crate) fn env_parse<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name} '{raw}': {e}")),
        None => Ok(None),
    }
}

/// Reduce a public base URL to `host[:port][/path]`.
///
/// Accepts a bare host (`abc.ngrok-free.app`) or a full URL with any scheme;
/// the scheme and trailing slashes are dropped so `wss://` can be prefixed.
pub(crate) fn normalize_public_domain(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Public URL must not be empty".to_string());
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = url::Url::parse(&with_scheme)
        .map_err(|e| format!("Invalid public URL '{trimmed}': {e}"))?;

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| format!("Public URL '{trimmed}' has no host"))?;

    let mut domain = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let path = parsed.path().trim_end_matches('/');
    if !path.is_empty() {
        domain.push_str(path);
    }

    Ok(domain)
}
