//! Profile validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for problems that
//! must abort startup: an empty origin allow-list, a wildcard origin
//! (never allowed together with credentials), origins that are not a
//! bare `scheme://host[:port]`, a zero preflight max-age, and unknown
//! log levels. Every problem is collected before returning.

use url::Url;

use super::model::Config;
use crate::error::ValidationError;

pub const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a single allow-list entry. Returns `Ok(())` or a message and
/// an optional suggestion.
pub fn validate_origin(origin: &str) -> Result<(), (String, Option<String>)> {
    if origin == "*" {
        return Err((
            "wildcard origin cannot be combined with credentials".into(),
            Some("list each allowed origin explicitly".into()),
        ));
    }

    let parsed = Url::parse(origin).map_err(|_| {
        (
            format!("'{origin}' is not a valid origin"),
            Some(format!("did you mean 'http://{origin}'?")),
        )
    })?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err((
            format!("unsupported scheme '{scheme}' (expected http or https)"),
            None,
        ));
    }

    let canonical = parsed.origin().ascii_serialization();
    if canonical != origin {
        return Err((
            format!("'{origin}' is not a bare origin; browsers send it as '{canonical}'"),
            Some(format!("use '{canonical}'")),
        ));
    }

    Ok(())
}

/// Validate a log level name. Returns `Ok(())` or a human-readable error.
pub fn validate_level(level: &str) -> Result<(), String> {
    if VALID_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(format!("'{level}' is not a valid log level"))
    }
}

pub fn validate(profile: &str, config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let error = |field: &str, message: String, suggestion: Option<String>| ValidationError {
        profile: profile.to_string(),
        field: field.to_string(),
        message,
        suggestion,
    };

    let origins = config.cors.origins();
    if origins.is_empty() {
        errors.push(error(
            "cors.allowed-origins",
            "at least one allowed origin must be configured".into(),
            None,
        ));
    }

    for origin in &origins {
        if let Err((message, suggestion)) = validate_origin(origin) {
            errors.push(error("cors.allowed-origins", message, suggestion));
        }
    }

    if config.cors.max_age == 0 {
        errors.push(error(
            "cors.max-age",
            "max-age must be greater than zero".into(),
            Some("3600 caches preflights for an hour".into()),
        ));
    }

    if let Err(msg) = validate_level(&config.logging.level) {
        errors.push(error(
            "logging.level",
            msg,
            Some(format!("expected one of {}", VALID_LEVELS.join(", "))),
        ));
    }

    if config.app.name.trim().is_empty() {
        errors.push(error("app.name", "name cannot be empty".into(), None));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(profile: &str, config: &Config) -> String {
    let origins = config.cors.origins();
    let mut lines = vec![format!(
        "  {} on {}:{}, log level {}\n",
        config.app.name, config.server.host, config.server.port, config.logging.level
    )];
    lines.push(format!("  allowed origins ({}):", origins.len()));
    for origin in &origins {
        lines.push(format!("    {origin}"));
    }
    lines.push(format!("  preflight max-age: {}s", config.cors.max_age));
    lines.push(format!("  log dir: {}", config.logging.dir.display()));

    format!("profile '{}' is valid\n{}", profile, lines.join("\n"))
}
