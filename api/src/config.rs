use std::time::Duration;

use url::Url;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_AGENTS_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SENTIMENT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_RISK_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_WAREHOUSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Where one upstream service lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub base_url: Url,
    /// Project segment of the warehouse query endpoint path.
    pub project: String,
    pub timeout: Duration,
}

/// Full service configuration, read from the environment exactly once at
/// startup. Everything below main receives these values explicitly —
/// no component reaches into the environment for its own wiring.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub agents: UpstreamConfig,
    pub sentiment: UpstreamConfig,
    pub risk: UpstreamConfig,
    pub warehouse: WarehouseConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not a valid URL: {value:?}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("{name} is not a valid integer: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_port(env_var("PORT"))?,
            database_url: require("DATABASE_URL")?,
            agents: UpstreamConfig {
                base_url: require_url("HEARTH_AGENTS_URL")?,
                timeout: parse_timeout(
                    "HEARTH_AGENTS_TIMEOUT_MS",
                    env_var("HEARTH_AGENTS_TIMEOUT_MS"),
                    DEFAULT_AGENTS_TIMEOUT,
                )?,
            },
            sentiment: UpstreamConfig {
                base_url: require_url("HEARTH_SENTIMENT_URL")?,
                timeout: parse_timeout(
                    "HEARTH_SENTIMENT_TIMEOUT_MS",
                    env_var("HEARTH_SENTIMENT_TIMEOUT_MS"),
                    DEFAULT_SENTIMENT_TIMEOUT,
                )?,
            },
            risk: UpstreamConfig {
                base_url: require_url("HEARTH_RISK_URL")?,
                timeout: parse_timeout(
                    "HEARTH_RISK_TIMEOUT_MS",
                    env_var("HEARTH_RISK_TIMEOUT_MS"),
                    DEFAULT_RISK_TIMEOUT,
                )?,
            },
            warehouse: WarehouseConfig {
                base_url: require_url("HEARTH_WAREHOUSE_URL")?,
                project: require("HEARTH_WAREHOUSE_PROJECT")?,
                timeout: parse_timeout(
                    "HEARTH_WAREHOUSE_TIMEOUT_MS",
                    env_var("HEARTH_WAREHOUSE_TIMEOUT_MS"),
                    DEFAULT_WAREHOUSE_TIMEOUT,
                )?,
            },
        })
    }
}

/// Treats set-but-empty the same as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env_var(name).ok_or(ConfigError::Missing(name))
}

fn require_url(name: &'static str) -> Result<Url, ConfigError> {
    let raw = require(name)?;
    Url::parse(&raw).map_err(|_| ConfigError::InvalidUrl { name, value: raw })
}

fn parse_port(raw: Option<String>) -> Result<u16, ConfigError> {
    match raw {
        None => Ok(DEFAULT_PORT),
        Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            name: "PORT",
            value,
        }),
    }
}

fn parse_timeout(
    name: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_unset() {
        assert_eq!(parse_port(None).unwrap(), DEFAULT_PORT);
        assert_eq!(parse_port(Some("3100".into())).unwrap(), 3100);
        assert!(parse_port(Some("eighty".into())).is_err());
    }

    #[test]
    fn timeout_parses_milliseconds() {
        let default = Duration::from_secs(10);
        assert_eq!(parse_timeout("T", None, default).unwrap(), default);
        assert_eq!(
            parse_timeout("T", Some("2500".into()), default).unwrap(),
            Duration::from_millis(2500)
        );
        assert!(parse_timeout("T", Some("fast".into()), default).is_err());
    }
}
