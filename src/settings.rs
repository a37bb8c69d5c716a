//! Process settings read from the environment.

use std::path::PathBuf;

use thiserror::Error;

/// Environment variable naming the rule document
pub const CONFIG_PATH_ENV: &str = "PISW_CONFIG_PATH";
/// Environment variable naming the TLS certificate directory
pub const CERT_DIR_ENV: &str = "PISW_CERT_DIR";
/// Environment variable overriding the webhook port
pub const WEBHOOK_PORT_ENV: &str = "PISW_WEBHOOK_PORT";
/// Environment variable overriding the health server port
pub const HEALTH_PORT_ENV: &str = "PISW_HEALTH_PORT";

/// Default rule document path, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
/// Default directory holding `tls.crt` and `tls.key`
pub const DEFAULT_CERT_DIR: &str = "/etc/webhook/certs";
/// Default webhook server port
pub const DEFAULT_WEBHOOK_PORT: u16 = 9443;
/// Default health server port
pub const DEFAULT_HEALTH_PORT: u16 = 8081;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("invalid value {value:?} for {name}: {source}")]
    InvalidPort {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Settings for the webhook process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_path: PathBuf,
    pub cert_dir: PathBuf,
    pub webhook_port: u16,
    pub health_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            cert_dir: PathBuf::from(DEFAULT_CERT_DIR),
            webhook_port: DEFAULT_WEBHOOK_PORT,
            health_port: DEFAULT_HEALTH_PORT,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`. Unset or empty values fall back to
    /// the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            config_path: get(CONFIG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            cert_dir: get(CERT_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.cert_dir),
            webhook_port: parse_port(WEBHOOK_PORT_ENV, get(WEBHOOK_PORT_ENV))?
                .unwrap_or(defaults.webhook_port),
            health_port: parse_port(HEALTH_PORT_ENV, get(HEALTH_PORT_ENV))?
                .unwrap_or(defaults.health_port),
        })
    }

    /// Path to the TLS certificate (PEM)
    pub fn cert_path(&self) -> PathBuf {
        self.cert_dir.join("tls.crt")
    }

    /// Path to the TLS private key (PEM)
    pub fn key_path(&self) -> PathBuf {
        self.cert_dir.join("tls.key")
    }
}

fn parse_port(name: &'static str, value: Option<String>) -> Result<Option<u16>, SettingsError> {
    value
        .map(|value| {
            value
                .parse::<u16>()
                .map_err(|source| SettingsError::InvalidPort {
                    name,
                    value,
                    source,
                })
        })
        .transpose()
}
