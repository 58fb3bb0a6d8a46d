//! Broker configuration
//!
//! Parsed from command-line flags with `BROKER_*` environment fallbacks.
//!
//! ## Defaults
//! - `name = "operator-broker"`
//! - `controllers = None` (only built-in controllers listed in `builtins`)
//! - `http_addr = 0.0.0.0:8080`
//! - `log.level = "info"`, `log.format = text`

use std::net::SocketAddr;

use clap::{Args, Parser, ValueEnum};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct LogConfig {
    /// Log filter directive (overridden by RUST_LOG)
    #[arg(long = "log-level", env = "BROKER_LOG_LEVEL", default_value = "info")]
    pub level: String,

    /// Log output format
    #[arg(long = "log-format", env = "BROKER_LOG_FORMAT", value_enum, default_value = "text")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "operator-broker")]
#[command(about = "Drives pluggable Kubernetes controllers through init, start and stop", long_about = None)]
#[command(version)]
pub struct BrokerConfig {
    /// Broker name, attached to every log line
    #[arg(long, env = "BROKER_NAME", default_value = "operator-broker")]
    pub name: String,

    /// Glob pattern locating controller descriptors (e.g. "ctrls/*.ctrl")
    #[arg(short, long, env = "BROKER_CONTROLLERS")]
    pub controllers: Option<String>,

    /// Built-in controllers registered before discovery, in order
    #[arg(long = "builtin", env = "BROKER_BUILTINS", value_delimiter = ',')]
    pub builtins: Vec<String>,

    /// Kubeconfig context to use instead of the inferred one
    #[arg(long, env = "BROKER_KUBE_CONTEXT")]
    pub kube_context: Option<String>,

    /// Address for the health/metrics/status API
    #[arg(long, env = "BROKER_HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: SocketAddr,

    /// Do not serve the health/metrics/status API
    #[arg(long, env = "BROKER_NO_HTTP")]
    pub no_http: bool,

    #[command(flatten)]
    pub log: LogConfig,
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ConfigError("broker name must not be empty".to_string()));
        }
        if let Some(pattern) = &self.controllers {
            if pattern.trim().is_empty() {
                return Err(Error::ConfigError(
                    "controller pattern must not be empty".to_string(),
                ));
            }
        }
        if self.builtins.iter().any(|b| b.trim().is_empty()) {
            return Err(Error::ConfigError(
                "built-in controller names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// True when neither built-ins nor a discovery pattern were given
    pub fn has_no_controllers(&self) -> bool {
        self.controllers.is_none() && self.builtins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrokerConfig::try_parse_from(["operator-broker"]).unwrap();
        assert_eq!(config.name, "operator-broker");
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.log.format, LogFormat::Text);
        assert!(config.has_no_controllers());
        config.validate().unwrap();
    }

    #[test]
    fn test_flags() {
        let config = BrokerConfig::try_parse_from([
            "operator-broker",
            "--name",
            "edge",
            "--controllers",
            "ctrls/*.ctrl",
            "--builtin",
            "api-probe,other",
            "--log-format",
            "json",
            "--no-http",
        ])
        .unwrap();
        assert_eq!(config.name, "edge");
        assert_eq!(config.controllers.as_deref(), Some("ctrls/*.ctrl"));
        assert_eq!(config.builtins, vec!["api-probe", "other"]);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.no_http);
    }

    #[test]
    fn test_validate_rejects_blank_pattern() {
        let config =
            BrokerConfig::try_parse_from(["operator-broker", "--controllers", " "]).unwrap();
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }
}
