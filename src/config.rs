//! Configuration for the exporter.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collector::DEFAULT_PAGE_SIZE;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream provider settings.
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Which resource-kind collectors are active.
    #[serde(default)]
    pub collectors: CollectorsConfig,

    /// Metric naming settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: "0.0.0.0:9150").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for the metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    "0.0.0.0:9150".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Region every list request is issued against (default: "ap-beijing").
    #[serde(default = "default_region")]
    pub region: String,

    /// Items requested per list page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Budget for one whole scrape, shared by all collectors (seconds).
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,
}

fn default_region() -> String {
    "ap-beijing".to_string()
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_scrape_timeout() -> u64 {
    30
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            page_size: default_page_size(),
            scrape_timeout_secs: default_scrape_timeout(),
        }
    }
}

/// Per-kind collector enablement. A disabled kind is never registered and
/// never issues API calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorsConfig {
    /// Elasticsearch Service instances.
    #[serde(default = "default_true")]
    pub es: bool,

    /// Cloud Block Storage disks.
    #[serde(default = "default_true")]
    pub cbs: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CollectorsConfig {
    fn default() -> Self {
        Self {
            es: true,
            cbs: true,
        }
    }
}

/// Metric naming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Metric name prefix (default: "tc_info").
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "tc_info".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ExporterConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.server.listen
            )));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if self.cloud.region.is_empty() {
            return Err(ConfigError::Validation("region must not be empty".to_string()));
        }

        if self.cloud.page_size == 0 {
            return Err(ConfigError::Validation("page_size must be > 0".to_string()));
        }

        if self.cloud.scrape_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "scrape_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.metrics.prefix.is_empty() {
            return Err(ConfigError::Validation("prefix must not be empty".to_string()));
        }

        let mut chars = self.metrics.prefix.chars();
        let head_valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !head_valid || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Validation(format!(
                "Invalid metric prefix: {}",
                self.metrics.prefix
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:9150");
        assert_eq!(config.server.path, "/metrics");
        assert_eq!(config.cloud.region, "ap-beijing");
        assert_eq!(config.cloud.page_size, 100);
        assert_eq!(config.cloud.scrape_timeout_secs, 30);
        assert!(config.collectors.es);
        assert!(config.collectors.cbs);
        assert_eq!(config.metrics.prefix, "tc_info");
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            server: {
                listen: "127.0.0.1:9151",
                path: "/tencent/metrics"
            },
            cloud: {
                region: "ap-guangzhou",
                page_size: 50,
                scrape_timeout_secs: 10
            },
            collectors: {
                es: false,
                cbs: true
            },
            metrics: {
                prefix: "cloud_inventory"
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:9151");
        assert_eq!(config.server.path, "/tencent/metrics");
        assert_eq!(config.cloud.region, "ap-guangzhou");
        assert_eq!(config.cloud.page_size, 50);
        assert!(!config.collectors.es);
        assert!(config.collectors.cbs);
        assert_eq!(config.metrics.prefix, "cloud_inventory");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_invalid_listen() {
        let result = ExporterConfig::parse(r#"{ server: { listen: "not-an-address" } }"#);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_invalid_path() {
        let result = ExporterConfig::parse(r#"{ server: { path: "no-leading-slash" } }"#);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must start with /"));
    }

    #[test]
    fn test_validate_zero_page_size() {
        let result = ExporterConfig::parse(r#"{ cloud: { page_size: 0 } }"#);

        assert!(result.is_err());
    }

    #[test]
    fn test_validate_zero_scrape_timeout() {
        let result = ExporterConfig::parse(r#"{ cloud: { scrape_timeout_secs: 0 } }"#);

        assert!(result.is_err());
    }

    #[test]
    fn test_validate_bad_prefix() {
        let result = ExporterConfig::parse(r#"{ metrics: { prefix: "9bad-prefix" } }"#);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid metric prefix")
        );
    }
}
