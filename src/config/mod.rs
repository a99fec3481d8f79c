//! Profile configuration loading and validation.
//!
//! A deployment profile (`dev`, `test`, `prod`, ...) names a YAML file
//! `{dir}/{profile}.yaml`. [`load_profile`] reads, parses, applies
//! environment overrides and validates it once at startup; the result is
//! immutable for the process lifetime.

pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::TimelabError;
use model::Config;

/// Environment variable overriding `cors.allowed-origins`.
pub const ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";

#[must_use]
pub fn profile_path(dir: &Path, profile: &str) -> PathBuf {
    dir.join(format!("{profile}.yaml"))
}

/// Parse a profile document without validating it.
pub fn parse_profile_str(content: &str, path_display: &str) -> Result<Config, TimelabError> {
    serde_yml::from_str(content).map_err(|e| TimelabError::ConfigParse {
        path: path_display.to_string(),
        source: Box::new(e),
    })
}

/// Parse and validate a profile document.
pub fn build_config(
    profile: &str,
    content: &str,
    path_display: &str,
    origins_override: Option<String>,
) -> Result<Config, TimelabError> {
    let mut config = parse_profile_str(content, path_display)?;

    if let Some(origins) = origins_override {
        config.cors.allowed_origins = origins;
    }

    validation::validate(profile, &config)
        .map_err(|errors| TimelabError::ConfigValidation { errors })?;

    Ok(config)
}

/// Read `{dir}/{profile}.yaml`, apply environment overrides and validate.
pub async fn load_profile(dir: &Path, profile: &str) -> Result<Config, TimelabError> {
    let path = profile_path(dir, profile);
    let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TimelabError::ProfileNotFound {
                profile: profile.to_string(),
                path: path.clone(),
            }
        } else {
            TimelabError::Io(e)
        }
    })?;

    let origins_override = std::env::var(ALLOWED_ORIGINS_ENV).ok();

    build_config(
        profile,
        &content,
        &path.display().to_string(),
        origins_override,
    )
}
