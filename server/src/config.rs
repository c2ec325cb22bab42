//! Server configuration module.
//!
//! Parses configuration from environment variables for the EventDesk server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `EVENTDESK_ADMIN_PASSWORD` | Yes | - | Shared password for the admin login |
//! | `PORT` | No | 3000 | HTTP server port |
//! | `EVENTDESK_SESSION_SWEEP_SECS` | No | 300 | Expired-session sweep interval, `0` disables |

use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 3000;

/// Default interval between expired-session sweeps.
const DEFAULT_SWEEP_SECS: u64 = 300;

const ADMIN_PASSWORD_VAR: &str = "EVENTDESK_ADMIN_PASSWORD";
const PORT_VAR: &str = "PORT";
const SWEEP_VAR: &str = "EVENTDESK_SESSION_SWEEP_SECS";

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[source] std::num::ParseIntError),

    /// Sweep interval is invalid.
    #[error("invalid session sweep interval: {0}")]
    InvalidSweepInterval(#[source] std::num::ParseIntError),
}

/// Server configuration parsed from environment variables.
#[derive(Clone)]
pub struct Config {
    /// The single shared admin password.
    pub admin_password: String,

    /// HTTP server port.
    pub port: u16,

    /// How often expired sessions are purged. `None` disables the sweep.
    pub session_sweep_interval: Option<Duration>,
}

impl Config {
    /// Builds a configuration with defaults for everything but the password.
    pub fn new(admin_password: impl Into<String>) -> Self {
        Self {
            admin_password: admin_password.into(),
            port: DEFAULT_PORT,
            session_sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_SECS)),
        }
    }

    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `EVENTDESK_ADMIN_PASSWORD` is missing or empty
    /// - `PORT` is not a valid u16
    /// - `EVENTDESK_SESSION_SWEEP_SECS` is not a non-negative integer
    ///
    /// # Example
    ///
    /// ```no_run
    /// use eventdesk_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let admin_password = parse_admin_password()?;
        let port = parse_port()?;
        let session_sweep_interval = parse_sweep_interval()?;

        Ok(Self {
            admin_password,
            port,
            session_sweep_interval,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("admin_password", &"<redacted>")
            .field("port", &self.port)
            .field("session_sweep_interval", &self.session_sweep_interval)
            .finish()
    }
}

/// Read a variable, treating non-unicode values as a format error.
fn read_var(name: &str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse the admin password. Empty values count as missing.
fn parse_admin_password() -> Result<String, ConfigError> {
    match read_var(ADMIN_PASSWORD_VAR)? {
        Some(password) if !password.is_empty() => Ok(password),
        _ => Err(ConfigError::MissingEnvVar(ADMIN_PASSWORD_VAR.to_string())),
    }
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match read_var(PORT_VAR)? {
        Some(port_str) => port_str.trim().parse().map_err(ConfigError::InvalidPort),
        None => Ok(DEFAULT_PORT),
    }
}

/// Parse the sweep interval; `0` turns the sweep off.
fn parse_sweep_interval() -> Result<Option<Duration>, ConfigError> {
    let secs = match read_var(SWEEP_VAR)? {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(ConfigError::InvalidSweepInterval)?,
        None => DEFAULT_SWEEP_SECS,
    };

    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
