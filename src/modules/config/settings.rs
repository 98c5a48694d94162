use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modules::auth::password::DEFAULT_ITERATIONS;
use crate::modules::email::SmtpSettings;
use crate::modules::utils::io::is_valid_email;

pub const ENV_BIND: &str = "REGISTRATION_BIND";
pub const ENV_DATA_FILE: &str = "REGISTRATION_DATA_FILE";
pub const ENV_PUBLIC_HOST: &str = "REGISTRATION_PUBLIC_HOST";
pub const ENV_SMTP_PASSWORD: &str = "REGISTRATION_SMTP_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where confirmation emails go
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    #[default]
    Smtp,
    /// Log messages instead of sending them
    Log,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    pub transport: MailTransport,
    pub smtp: SmtpSettings,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "noreply@domain.com".to_string(),
            transport: MailTransport::default(),
            smtp: SmtpSettings::default(),
        }
    }
}

/// Application configuration, read from a JSON file with every field optional
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    // Used in confirmation links when no X-Forwarded-Proto header is present
    pub public_scheme: String,
    // Host for confirmation links when the request has no usable Host header
    pub public_host: Option<String>,
    // Accounts live only in memory when unset
    pub data_file: Option<PathBuf>,
    pub mail: MailConfig,
    pub hash_iterations: u32,
    pub clear_token_on_activation: bool,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            public_scheme: "http".to_string(),
            public_host: None,
            data_file: None,
            mail: MailConfig::default(),
            hash_iterations: DEFAULT_ITERATIONS,
            clear_token_on_activation: false,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply `REGISTRATION_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup (environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(host) = lookup(ENV_PUBLIC_HOST) {
            self.public_host = Some(host);
        }
        if let Some(data_file) = lookup(ENV_DATA_FILE) {
            self.data_file = Some(PathBuf::from(data_file));
        }
        if let Some(password) = lookup(ENV_SMTP_PASSWORD) {
            self.mail.smtp.password = Some(password);
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bind address {:?}", self.bind)))
    }

    /// Host placed in links when the request does not name one; the bind
    /// address only when no public host is configured
    pub fn link_host(&self) -> &str {
        self.public_host.as_deref().unwrap_or(&self.bind)
    }

    /// Check the values that would otherwise fail deep inside a request
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if !matches!(self.public_scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "public_scheme must be http or https, got {:?}",
                self.public_scheme
            )));
        }
        if let Some(host) = &self.public_host {
            if host.is_empty() || host.contains(|c: char| c == '/' || c.is_whitespace()) {
                return Err(ConfigError::Invalid(format!(
                    "public_host must be a bare host[:port], got {:?}",
                    host
                )));
            }
        }
        if !is_valid_email(&self.mail.from) {
            return Err(ConfigError::Invalid(format!(
                "mail.from {:?} is not an email address",
                self.mail.from
            )));
        }
        if self.hash_iterations == 0 {
            return Err(ConfigError::Invalid(
                "hash_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
