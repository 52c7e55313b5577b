//! Transport configuration loaded from TOML.
//!
//! ```toml
//! max_retry_count = 3
//! stagger_delay = "250ms"
//! rate_limit_fallback = "5s"
//! timeout = "30s"
//! user_agent = "my-app/1.0"
//!
//! [headers]
//! Accept = "application/json"
//! ```
//!
//! Every key is optional.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use crate::client::DEFAULT_USER_AGENT;
use crate::executor::{DEFAULT_MAX_RETRY_COUNT, validate_max_retry_count};
use crate::racer::STAGGER_DELAY;
use crate::ratelimit::RATE_LIMIT_FALLBACK;
use crate::{ErrorKind, Result};

/// Settings of the transport core
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// How often a rate-limited request is sent again. Must not be negative.
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: i64,

    /// Delay between two staggered connection attempts
    #[serde(default = "default_stagger_delay", with = "humantime_serde")]
    pub stagger_delay: Duration,

    /// Wait applied when a `429` response has no usable `Retry-After`
    #[serde(default = "default_rate_limit_fallback", with = "humantime_serde")]
    pub rate_limit_fallback: Duration,

    /// Upper bound for a single send
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// `User-Agent` sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Headers sent with every request
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    pub headers: HeaderMap,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            stagger_delay: default_stagger_delay(),
            rate_limit_fallback: default_rate_limit_fallback(),
            timeout: None,
            user_agent: default_user_agent(),
            headers: HeaderMap::new(),
        }
    }
}

impl TransportConfig {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML for
    /// this configuration, or fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ErrorKind::ConfigRead(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse fine but are out of range
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidMaxRetryCount`] if `max_retry_count` is
    /// negative.
    pub fn validate(&self) -> Result<()> {
        validate_max_retry_count(self.max_retry_count)?;
        Ok(())
    }
}

const fn default_max_retry_count() -> i64 {
    DEFAULT_MAX_RETRY_COUNT as i64
}

const fn default_stagger_delay() -> Duration {
    STAGGER_DELAY
}

const fn default_rate_limit_fallback() -> Duration {
    RATE_LIMIT_FALLBACK
}

fn default_user_agent() -> String {
    String::from(DEFAULT_USER_AGENT)
}

/// Custom deserializer for headers from TOML config format
fn deserialize_headers<'de, D>(deserializer: D) -> std::result::Result<HeaderMap, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    let mut header_map = HeaderMap::new();

    for (name, value) in map {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("Invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(&value).map_err(|e| {
            serde::de::Error::custom(format!("Invalid header value '{value}': {e}"))
        })?;
        header_map.insert(header_name, header_value);
    }

    Ok(header_map)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::TransportConfig;
    use crate::ErrorKind;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: TransportConfig = toml::from_str("").unwrap();
        assert_eq!(config, TransportConfig::default());
        assert_eq!(config.max_retry_count, 0);
        assert_eq!(config.stagger_delay, Duration::from_millis(250));
        assert_eq!(config.rate_limit_fallback, Duration::from_secs(5));
        assert!(config.user_agent.starts_with("marquee/"));
    }

    #[test]
    fn test_load_full_config() {
        let file = config_file(
            r#"
            max_retry_count = 3
            stagger_delay = "100ms"
            rate_limit_fallback = "2s"
            timeout = "30s"
            user_agent = "popcorn/1.0"

            [headers]
            Accept = "application/json"
            X-Api-Key = "secret"
            "#,
        );

        let config = TransportConfig::load(file.path()).unwrap();

        assert_eq!(config.max_retry_count, 3);
        assert_eq!(config.stagger_delay, Duration::from_millis(100));
        assert_eq!(config.rate_limit_fallback, Duration::from_secs(2));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.user_agent, "popcorn/1.0");
        assert_eq!(config.headers["accept"], "application/json");
        assert_eq!(config.headers["x-api-key"], "secret");
    }

    #[test]
    fn test_negative_retry_count_is_rejected_on_load() {
        let file = config_file("max_retry_count = -1");

        let err = TransportConfig::load(file.path()).unwrap_err();

        assert!(matches!(err, ErrorKind::InvalidMaxRetryCount(-1)));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let file = config_file("max_retries = 3");

        let err = TransportConfig::load(file.path()).unwrap_err();

        assert!(matches!(err, ErrorKind::ConfigParse(_)));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let result = toml::from_str::<TransportConfig>("[headers]\n\"bad header\" = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marquee.toml");

        let err = TransportConfig::load(&path).unwrap_err();

        assert!(matches!(err, ErrorKind::ConfigRead(p, _) if p == path));
    }
}
