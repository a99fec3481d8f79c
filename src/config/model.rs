//! Serde data structures for a deployment profile file.
//!
//! Contains [`Config`] (the root), [`AppSection`], [`ServerSection`],
//! [`CorsSection`] and [`LoggingSection`]. Keys follow the kebab-case
//! property names used in the profile files (`allowed-origins`,
//! `max-age`) and unknown keys are rejected.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_APP_NAME: &str = "timelab";

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

const fn default_max_age() -> u64 {
    3600
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub app: AppSection,

    #[serde(default)]
    pub server: ServerSection,

    pub cors: CorsSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CorsSection {
    /// Comma-separated list, split and trimmed by [`CorsSection::origins`].
    pub allowed_origins: String,

    #[serde(default = "default_max_age")]
    pub max_age: u64,
}

impl CorsSection {
    #[must_use]
    pub fn new(allowed_origins: impl Into<String>) -> Self {
        Self {
            allowed_origins: allowed_origins.into(),
            max_age: default_max_age(),
        }
    }

    /// The allow-list in configured order, blanks dropped.
    #[must_use]
    pub fn origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: default_log_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        let cors = CorsSection::new(" http://localhost:3000 ,http://127.0.0.1:3000,, ");
        assert_eq!(
            cors.origins(),
            vec!["http://localhost:3000", "http://127.0.0.1:3000"]
        );
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let yaml = "cors:\n  allowed-origins: http://a.test\n";
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.app.name, "timelab");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cors.max_age, 3600);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.dir, PathBuf::from("logs"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = "cors:\n  allowed-origins: http://a.test\n  allow-all: true\n";
        assert!(serde_yml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn missing_cors_section_is_rejected() {
        let yaml = "server:\n  port: 9000\n";
        assert!(serde_yml::from_str::<Config>(yaml).is_err());
    }
}
