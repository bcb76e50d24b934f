//! Monitor configuration.
//!
//! Settings come from an optional YAML file and then from environment
//! variables, which override the file.
//!
//! # Example Config (YAML)
//!
//! ```yaml
//! api_key: "your-read-key"
//! sensor_id: 12345
//! update_interval: 120  # seconds between polls
//! jitter_max: 30        # up to this many extra seconds per poll
//! retry_interval: 30    # seconds before retrying after an error
//! ```
//!
//! # Environment
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `API_KEY` | PurpleAir read key (required) | - |
//! | `SENSOR_ID` | Sensor index (required) | - |
//! | `UPDATE_INTERVAL` | Seconds between polls | 120 |
//! | `JITTER_MAX` | Max random extra seconds per poll | 30 |
//! | `RETRY_INTERVAL` | Seconds before retry after an error | 30 |
//!
//! `PURPLEAIR_API_KEY` and `PURPLEAIR_SENSOR_ID` are accepted when the
//! unprefixed names are unset.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::Error;
use crate::{
    API_BASE_URL, DEFAULT_JITTER_MAX_SECS, DEFAULT_RETRY_INTERVAL_SECS, DEFAULT_TICK_INTERVAL_MS,
    DEFAULT_TIMEOUT_SECS, DEFAULT_UPDATE_INTERVAL_SECS, MAX_INTERVAL_SECS,
};

/// Everything the monitor needs to run.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// PurpleAir read key
    #[serde(default)]
    pub api_key: String,

    /// Sensor index (numbers and strings are both accepted)
    #[serde(default, deserialize_with = "string_or_number")]
    pub sensor_id: String,

    /// Seconds between successful polls
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,

    /// Upper bound of the random extra delay added to each poll (seconds)
    #[serde(default = "default_jitter_max")]
    pub jitter_max: u64,

    /// Seconds to wait before retrying after a recoverable error
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u64,

    /// Milliseconds between loop iterations
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_jitter_max() -> u64 {
    DEFAULT_JITTER_MAX_SECS
}

fn default_retry_interval() -> u64 {
    DEFAULT_RETRY_INTERVAL_SECS
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_base_url() -> String {
    API_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            sensor_id: String::new(),
            update_interval: default_update_interval(),
            jitter_max: default_jitter_max(),
            retry_interval: default_retry_interval(),
            tick_interval_ms: default_tick_interval_ms(),
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl MonitorConfig {
    /// Build a config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// number does not parse.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a YAML file, then apply environment overrides.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = MonitorConfig::load("config/monitor.yaml")?;
    /// ```
    #[cfg(feature = "yaml")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::info!(
            "Loaded config from {} (sensor {}, update every {}s)",
            path.as_ref().display(),
            config.sensor_id,
            config.update_interval
        );
        Ok(config)
    }

    /// Parse config from a YAML string without validating it.
    #[cfg(feature = "yaml")]
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("Invalid config YAML: {}", e)))
    }

    /// Overwrite fields with any variables `lookup` can resolve.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("API_KEY").or_else(|| lookup("PURPLEAIR_API_KEY")) {
            self.api_key = key;
        }
        if let Some(id) = lookup("SENSOR_ID").or_else(|| lookup("PURPLEAIR_SENSOR_ID")) {
            self.sensor_id = id;
        }
        if let Some(value) = lookup("UPDATE_INTERVAL") {
            self.update_interval = parse_seconds("UPDATE_INTERVAL", &value)?;
        }
        if let Some(value) = lookup("JITTER_MAX") {
            self.jitter_max = parse_seconds("JITTER_MAX", &value)?;
        }
        if let Some(value) = lookup("RETRY_INTERVAL") {
            self.retry_interval = parse_seconds("RETRY_INTERVAL", &value)?;
        }
        Ok(())
    }

    /// Check required fields and intervals.
    ///
    /// Intervals must be non-zero (jitter excepted) and no longer than
    /// [`MAX_INTERVAL_SECS`].
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("API_KEY is not set".to_string()));
        }
        if self.sensor_id.trim().is_empty() {
            return Err(Error::Config("SENSOR_ID is not set".to_string()));
        }
        if self.update_interval == 0 {
            return Err(Error::Config(
                "update_interval must be at least 1 second".to_string(),
            ));
        }
        if self.retry_interval == 0 {
            return Err(Error::Config(
                "retry_interval must be at least 1 second".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }

        let limits = [
            ("update_interval", self.update_interval),
            ("jitter_max", self.jitter_max),
            ("retry_interval", self.retry_interval),
            ("tick_interval_ms", self.tick_interval_ms / 1000),
        ];
        for (name, secs) in limits {
            if secs > MAX_INTERVAL_SECS {
                let message = format!("{} must be at most {} seconds", name, MAX_INTERVAL_SECS);
                return Err(Error::Config(message));
            }
        }
        Ok(())
    }

    /// Seconds between successful polls.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    /// Maximum jitter added to each poll.
    pub fn jitter_max(&self) -> Duration {
        Duration::from_secs(self.jitter_max)
    }

    /// Delay before retrying after a recoverable error.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval)
    }

    /// Delay between loop iterations.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

fn parse_seconds(name: &str, value: &str) -> Result<u64, Error> {
    let message = || format!("{} must be whole seconds, got {:?}", name, value);
    value.trim().parse().map_err(|_| Error::Config(message()))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let vars = lookup(&[("API_KEY", "k"), ("SENSOR_ID", "1")]);
        let config = MonitorConfig::from_lookup(vars).unwrap();

        assert_eq!(config.update_interval(), Duration::from_secs(120));
        assert_eq!(config.jitter_max(), Duration::from_secs(30));
        assert_eq!(config.retry_interval(), Duration::from_secs(30));
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.base_url, "https://api.purpleair.com/v1");
    }

    #[test]
    fn test_env_overrides() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("API_KEY", "abc"),
            ("SENSOR_ID", "98765"),
            ("UPDATE_INTERVAL", "300"),
            ("JITTER_MAX", "0"),
            ("RETRY_INTERVAL", " 10 "),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "abc");
        assert_eq!(config.sensor_id, "98765");
        assert_eq!(config.update_interval, 300);
        assert_eq!(config.jitter_max, 0);
        assert_eq!(config.retry_interval, 10);
    }

    #[test]
    fn test_prefixed_fallbacks() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("PURPLEAIR_API_KEY", "prefixed"),
            ("PURPLEAIR_SENSOR_ID", "7"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "prefixed");
        assert_eq!(config.sensor_id, "7");
    }

    #[test]
    fn test_missing_required() {
        let err = MonitorConfig::from_lookup(lookup(&[("SENSOR_ID", "1")])).unwrap_err();
        assert!(err.to_string().contains("API_KEY"));

        let err = MonitorConfig::from_lookup(lookup(&[("API_KEY", "k")])).unwrap_err();
        assert!(err.to_string().contains("SENSOR_ID"));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = MonitorConfig::from_lookup(lookup(&[
            ("API_KEY", "k"),
            ("SENSOR_ID", "1"),
            ("UPDATE_INTERVAL", "two minutes"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("UPDATE_INTERVAL"));

        let err = MonitorConfig::from_lookup(lookup(&[
            ("API_KEY", "k"),
            ("SENSOR_ID", "1"),
            ("UPDATE_INTERVAL", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("update_interval"));
    }

    #[test]
    fn test_intervals_are_capped() {
        let max = u64::MAX.to_string();
        for name in ["UPDATE_INTERVAL", "JITTER_MAX", "RETRY_INTERVAL"] {
            let err = MonitorConfig::from_lookup(lookup(&[
                ("API_KEY", "k"),
                ("SENSOR_ID", "1"),
                (name, max.as_str()),
            ]))
            .unwrap_err();
            assert!(matches!(err, Error::Config(_)));
            assert!(err.to_string().contains(&name.to_lowercase()));
        }

        let config = MonitorConfig::from_lookup(lookup(&[
            ("API_KEY", "k"),
            ("SENSOR_ID", "1"),
            ("UPDATE_INTERVAL", "86400"),
        ]))
        .unwrap();
        assert_eq!(config.update_interval, MAX_INTERVAL_SECS);
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_from_yaml() {
        let yaml = r#"
api_key: "yaml-key"
sensor_id: 12345
update_interval: 180
"#;
        let config = MonitorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.api_key, "yaml-key");
        assert_eq!(config.sensor_id, "12345");
        assert_eq!(config.update_interval, 180);
        assert_eq!(config.jitter_max, 30);
        assert!(config.validate().is_ok());
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_then_overrides() {
        let mut config = MonitorConfig::from_yaml("api_key: a\nsensor_id: \"abc\"\n").unwrap();
        config
            .apply_overrides(lookup(&[("SENSOR_ID", "555")]))
            .unwrap();
        assert_eq!(config.sensor_id, "555");
        assert_eq!(config.api_key, "a");
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_invalid_yaml() {
        let err = MonitorConfig::from_yaml("update_interval: [").unwrap_err();
        assert!(err.to_string().contains("Invalid config YAML"));
    }
}
