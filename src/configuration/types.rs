use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// `[endpoint]` section: where the management endpoint lives.
#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct EndpointConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u32,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    /// Backing document of the inventory gateway.
    pub inventory: PathBuf,
}

fn default_port() -> u32 {
    443
}

fn default_verify_tls() -> bool {
    true
}

/// `[display]` section.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// IANA timezone name used to render every timestamp.
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: String::from("UTC"),
        }
    }
}

/// `[sessions]` section.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Sessions idle for strictly longer than this are expired.
    pub max_idle_hours: u32,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { max_idle_hours: 24 }
    }
}

/// `[logging]` section.
#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub debug: bool,
    pub log_dir: Option<PathBuf>,
}

/// Endpoint credentials, only ever sourced from the environment.
#[derive(PartialEq, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}
