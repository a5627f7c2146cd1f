//! Parsing helpers shared by the environment loader.

use std::time::Duration;

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::LogFormatName;

pub(crate) fn required(field: &'static str, value: Option<String>) -> ConfigResult<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
        .ok_or(ConfigError::MissingEnv { name: field })
}

pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

pub(crate) fn parse_u64(field: &'static str, value: &str) -> ConfigResult<u64> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidField {
        field,
        reason: "not_an_unsigned_integer",
        value: Some(value.to_string()),
    })
}

pub(crate) fn parse_positive_u64(field: &'static str, value: &str) -> ConfigResult<u64> {
    let parsed = parse_u64(field, value)?;
    if parsed == 0 {
        return Err(ConfigError::InvalidField {
            field,
            reason: "zero",
            value: Some(value.to_string()),
        });
    }
    Ok(parsed)
}

pub(crate) fn parse_secs(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_u64(field, value).map(Duration::from_secs)
}

pub(crate) fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidField {
            field,
            reason: "not_a_boolean",
            value: Some(value.to_string()),
        }),
    }
}

pub(crate) fn parse_log_format(field: &'static str, value: &str) -> ConfigResult<LogFormatName> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormatName::Json),
        "pretty" => Ok(LogFormatName::Pretty),
        _ => Err(ConfigError::InvalidField {
            field,
            reason: "unknown_log_format",
            value: Some(value.to_string()),
        }),
    }
}

/// Parse a base URL, assuming `http://` when the scheme is omitted (`localhost:8080`).
pub(crate) fn parse_base_url(field: &'static str, value: &str) -> ConfigResult<Url> {
    let candidate = if value.contains("://") {
        value.to_string()
    } else {
        format!("http://{value}")
    };
    let url = Url::parse(&candidate).map_err(|_| ConfigError::InvalidField {
        field,
        reason: "invalid_url",
        value: Some(value.to_string()),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidField {
            field,
            reason: "unsupported_scheme",
            value: Some(value.to_string()),
        });
    }
    Ok(url)
}
