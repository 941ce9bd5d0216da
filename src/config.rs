//! Process configuration, read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `REGISTRARD_BIND` | `127.0.0.1` |
//! | `PORT` or `REGISTRARD_PORT` | `5000` |
//! | `REGISTRARD_WORKSPACE` | `./data` |
//! | `REGISTRARD_ENV` | `production` |
//! | `REGISTRARD_LOG_FORMAT` | `pretty` |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("expected development or production, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected pretty or json, got {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Directory holding the SQLite database file.
    pub workspace: PathBuf,
    pub environment: Environment,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            workspace: PathBuf::from("data"),
            environment: Environment::Production,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = match lookup("REGISTRARD_BIND") {
            Some(v) => parse("REGISTRARD_BIND", v)?,
            None => defaults.host,
        };
        let port = match lookup("PORT").or_else(|| lookup("REGISTRARD_PORT")) {
            Some(v) => parse("PORT", v)?,
            None => defaults.port,
        };
        let workspace = lookup("REGISTRARD_WORKSPACE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.workspace);
        let environment = match lookup("REGISTRARD_ENV") {
            Some(v) => parse("REGISTRARD_ENV", v)?,
            None => defaults.environment,
        };
        let log_format = match lookup("REGISTRARD_LOG_FORMAT") {
            Some(v) => parse("REGISTRARD_LOG_FORMAT", v)?,
            None => defaults.log_format,
        };

        Ok(Self {
            host,
            port,
            workspace,
            environment,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}
