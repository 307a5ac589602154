use super::types::*;
use crate::error_handling::types::ConfigError;
use chrono::Duration;
use chrono_tz::Tz;
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the endpoint user name.
pub const USERNAME_ENV: &str = "VSPHERE_USERNAME";
/// Environment variable holding the endpoint password.
pub const PASSWORD_ENV: &str = "VSPHERE_PASSWORD";

/// Application configuration.
///
/// Built once at process start from a TOML file plus the credentials found in
/// the environment, then handed by reference to every component. Nothing
/// mutates it afterwards.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use vcadmin::configuration::Config;
///
/// let config = Config::from_file(Path::new("vcadmin.toml")).unwrap();
/// println!("Endpoint: {}:{}", config.endpoint.host, config.endpoint.port);
/// ```
///
/// # Fields Overview
///
/// - `endpoint`: host/port of the management endpoint, TLS verification flag and
///   the inventory document backing the gateway
/// - `display`: timezone used when rendering timestamps
/// - `sessions`: idle threshold for the session sweep
/// - `logging`: debug switch and optional log directory
/// - `credentials`: user name and password, from `VSPHERE_USERNAME`/`VSPHERE_PASSWORD`
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub display: DisplayConfig,
    pub sessions: SessionsConfig,
    pub logging: LoggingConfig,
    pub credentials: Credentials,
    timezone: Tz,
}

/// On-disk shape of the configuration file.
#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConfigFile {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}

impl Credentials {
    /// Reads the credentials from `VSPHERE_USERNAME` and `VSPHERE_PASSWORD`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let username = read_env(USERNAME_ENV)?;
        let password = read_env(PASSWORD_ENV)?;
        Ok(Self { username, password })
    }
}

fn read_env(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingCredentials(format!(
            "environment variable {} is not set",
            name
        ))),
    }
}

impl Config {
    /// Loads the configuration file at `path` and the credentials from the environment.
    ///
    /// A relative `endpoint.inventory` path is resolved against the directory
    /// holding the configuration file.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let mut file = ConfigFile::from_toml_str(&content)?;

        if file.endpoint.inventory.is_relative() {
            if let Some(parent) = path.parent() {
                file.endpoint.inventory = parent.join(&file.endpoint.inventory);
            }
        }

        Config::from_parts(file, Credentials::from_env()?)
    }

    /// Validates a parsed file and combines it with `credentials`.
    pub fn from_parts(file: ConfigFile, credentials: Credentials) -> Result<Config, ConfigError> {
        let ConfigFile {
            endpoint,
            display,
            sessions,
            logging,
        } = file;

        if endpoint.host.trim().is_empty() {
            return Err(ConfigError::NotInRange(String::from(
                "endpoint.host must not be empty",
            )));
        }
        if endpoint.port == 0 || endpoint.port > u16::MAX as u32 {
            return Err(ConfigError::NotInRange(format!(
                "endpoint.port must be between 1 and 65535, got {}",
                endpoint.port
            )));
        }
        if sessions.max_idle_hours == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "sessions.max_idle_hours must be at least 1",
            )));
        }
        if let Some(dir) = &logging.log_dir {
            if !dir.is_dir() {
                return Err(ConfigError::DirectoryDoesNotExist(format!(
                    "logging.log_dir {} does not exist",
                    dir.display()
                )));
            }
        }

        let timezone: Tz = display
            .timezone
            .parse()
            .map_err(|e| ConfigError::InvalidTimezone(format!("{}: {}", display.timezone, e)))?;

        debug!(
            "Configuration: endpoint {}:{}, timezone {}, max idle {}h",
            endpoint.host, endpoint.port, timezone, sessions.max_idle_hours
        );

        Ok(Config {
            endpoint,
            display,
            sessions,
            logging,
            credentials,
            timezone,
        })
    }

    /// Timezone every rendered timestamp is converted to.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Idle threshold past which a session counts as expired.
    pub fn max_idle(&self) -> Duration {
        Duration::hours(i64::from(self.sessions.max_idle_hours))
    }
}
