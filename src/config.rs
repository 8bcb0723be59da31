//! Operator configuration
//!
//! Loaded from environment variables:
//! - `RETRY_DELAY_SECS`: delay before a resource is checked again (default: 10)
//! - `LOG_FORMAT`: `json` or `plain` (default: json)
//! - `METRICS_PORT`: port of the metrics/health server (default: 8080)
//! - `OPERATION_SERVICE_PORT`: port of the operation service on each Cassandra pod (default: 4567)
//! - `OPERATION_TIMEOUT_SECS`: timeout of a single operation service request (default: 30)

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "plain" | "text" => Ok(LogFormat::Plain),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Delay between two checks of an in-flight backup or restore
    pub retry_delay: Duration,
    pub log_format: LogFormat,
    pub metrics_port: u16,
    pub operation_service_port: u16,
    /// Per-request timeout for operation service calls
    pub operation_timeout: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(10),
            log_format: LogFormat::Json,
            metrics_port: 8080,
            operation_service_port: 4567,
            operation_timeout: Duration::from_secs(30),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for unset or invalid values
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let retry_delay_secs = parse_or(&lookup, "RETRY_DELAY_SECS", defaults.retry_delay.as_secs());
        let retry_delay_secs = if retry_delay_secs == 0 {
            warn!("Invalid RETRY_DELAY_SECS=0, using default=10");
            defaults.retry_delay.as_secs()
        } else {
            retry_delay_secs
        };

        let timeout_secs = parse_or(
            &lookup,
            "OPERATION_TIMEOUT_SECS",
            defaults.operation_timeout.as_secs(),
        );
        let timeout_secs = if timeout_secs == 0 {
            warn!("Invalid OPERATION_TIMEOUT_SECS=0, using default=30");
            defaults.operation_timeout.as_secs()
        } else {
            timeout_secs
        };

        Self {
            retry_delay: Duration::from_secs(retry_delay_secs),
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format),
            metrics_port: parse_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            operation_service_port: parse_or(
                &lookup,
                "OPERATION_SERVICE_PORT",
                defaults.operation_service_port,
            ),
            operation_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> OperatorConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OperatorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]);
        assert_eq!(cfg.retry_delay, Duration::from_secs(10));
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.metrics_port, 8080);
        assert_eq!(cfg.operation_service_port, 4567);
        assert_eq!(cfg.operation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn values_are_read() {
        let cfg = config(&[
            ("RETRY_DELAY_SECS", "45"),
            ("LOG_FORMAT", "plain"),
            ("METRICS_PORT", "9090"),
            ("OPERATION_SERVICE_PORT", "4568"),
            ("OPERATION_TIMEOUT_SECS", "5"),
        ]);
        assert_eq!(cfg.retry_delay, Duration::from_secs(45));
        assert_eq!(cfg.log_format, LogFormat::Plain);
        assert_eq!(cfg.metrics_port, 9090);
        assert_eq!(cfg.operation_service_port, 4568);
        assert_eq!(cfg.operation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config(&[
            ("RETRY_DELAY_SECS", "0"),
            ("LOG_FORMAT", "xml"),
            ("METRICS_PORT", "not-a-port"),
            ("OPERATION_TIMEOUT_SECS", "-1"),
        ]);
        assert_eq!(cfg.retry_delay, Duration::from_secs(10));
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.metrics_port, 8080);
        assert_eq!(cfg.operation_timeout, Duration::from_secs(30));
    }
}
