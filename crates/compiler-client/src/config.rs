use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use compiler_core::{
    HttpGateway, OverlapPolicy, ParserMode, TransportResult, DEFAULT_ENDPOINT_PATH,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

pub const ENV_BASE_URL: &str = "COMPILER_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "COMPILER_TIMEOUT_SECS";
pub const ENV_PARSER: &str = "COMPILER_PARSER";
pub const ENV_OVERLAP_POLICY: &str = "COMPILER_OVERLAP_POLICY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("base_url must not be empty")]
    EmptyBaseUrl,
    #[error("timeout_secs must be > 0 (omit it to wait indefinitely)")]
    ZeroTimeout,
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Client configuration.
///
/// Layered as defaults, then an optional TOML file, then `COMPILER_*`
/// environment variables; the CLI applies its flags last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,
    pub endpoint_path: String,
    /// Request timeout. `None` waits for the service indefinitely.
    pub timeout_secs: Option<u64>,
    #[serde(deserialize_with = "from_str_de")]
    pub parser: ParserMode,
    #[serde(deserialize_with = "from_str_de")]
    pub overlap_policy: OverlapPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            timeout_secs: None,
            parser: ParserMode::default(),
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, overlaid with `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config
            .apply_env()
            .context("Invalid COMPILER_* environment variable")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        let config: ClientConfig = toml::from_str(&content)
            .context(format!("Failed to parse client config {}", path.display()))?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, which maps a variable name to its value.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = Some(parse_value(ENV_TIMEOUT_SECS, &secs)?);
        }
        if let Some(parser) = lookup(ENV_PARSER) {
            self.parser = parse_value(ENV_PARSER, &parser)?;
        }
        if let Some(policy) = lookup(ENV_OVERLAP_POLICY) {
            self.overlap_policy = parse_value(ENV_OVERLAP_POLICY, &policy)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn gateway(&self) -> TransportResult<HttpGateway> {
        HttpGateway::new(&self.base_url, &self.endpoint_path, self.timeout())
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        message: e.to_string(),
    })
}

/// Accept the same spellings in TOML as on the command line (`glr`, `Glr`, ...).
fn from_str_de<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_validates() {
        let config = ClientConfig::default();
        config.validate().expect("default config should be valid");
        assert_eq!(config.endpoint_path, "compiler/generate");
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "http://compiler.internal:9000"
timeout_secs = 30
parser = "glr"
overlap_policy = "reject_while_submitting"
"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.base_url, "http://compiler.internal:9000");
        assert_eq!(config.endpoint_path, DEFAULT_ENDPOINT_PATH);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.parser, ParserMode::Glr);
        assert_eq!(config.overlap_policy, OverlapPolicy::RejectWhileSubmitting);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_uri = \"http://typo\"").unwrap();
        assert!(ClientConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://env-host:8080"),
            (ENV_PARSER, "LR"),
            (ENV_OVERLAP_POLICY, "last-write-wins"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.base_url, "http://env-host:8080");
        assert_eq!(config.parser, ParserMode::Lr);
        assert_eq!(config.overlap_policy, OverlapPolicy::LastWriteWins);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_invalid_env_value_reported_with_key() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_env_with(|key| (key == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ClientConfig {
            timeout_secs: Some(0),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_gateway_uses_configured_endpoint() {
        let config = ClientConfig {
            base_url: "http://compiler.internal:9000".into(),
            ..ClientConfig::default()
        };
        let gateway = config.gateway().unwrap();
        assert_eq!(
            gateway.endpoint().as_str(),
            "http://compiler.internal:9000/compiler/generate"
        );
    }
}
