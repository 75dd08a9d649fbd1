//! Configuration schema definitions.
//!
//! This module defines the structure of the typoshield configuration files.
//! Configuration is loaded from multiple sources and merged in order:
//!
//! 1. Embedded defaults (compiled into the binary)
//! 2. System config: `/etc/typoshield/config.toml`
//! 3. User config: `~/.config/typoshield/config.toml`
//! 4. Additional config file (via `--config` flag)
//! 5. CLI flags (highest priority)

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use super::error::ConfigError;

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Detection policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Registry persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Merge another config into this one.
    ///
    /// Lists (seed hosts) are merged (appended).
    /// Scalars (listen, log_level, flags) are overridden when set.
    pub fn merge(&mut self, other: Config) {
        self.general.merge(other.general);
        self.policy.merge(other.policy);
        self.storage.merge(other.storage);
    }

    /// Validate the merged configuration.
    ///
    /// The well-formedness checks: the listen address must parse, and seed
    /// hosts must be non-empty strings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.general.listen_addr()?;

        if let Some(bad) = self.policy.seed_hosts.iter().find(|h| h.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "policy.seed_hosts".to_string(),
                message: format!("empty hostname entry: {:?}", bad),
            });
        }

        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub log_level: String,

    /// Listen address for the proxy, e.g. "127.0.0.1:8118".
    #[serde(default)]
    pub listen: String,
}

impl GeneralConfig {
    fn merge(&mut self, other: GeneralConfig) {
        // Scalars are overridden if non-default
        if !other.log_level.is_empty() {
            self.log_level = other.log_level;
        }
        if !other.listen.is_empty() {
            self.listen = other.listen;
        }
    }

    /// Parse the configured listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                field: "general.listen".to_string(),
                message: format!("not a socket address: {:?}", self.listen),
            })
    }
}

/// What to do with a flagged HTML navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlaggedMode {
    /// Serve the warning interstitial with proceed/redirect choices.
    Warn,
    /// Answer 403 without a choice.
    Block,
}

/// Detection policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PolicyConfig {
    /// Action for flagged navigations. Defaults to warn.
    #[serde(default)]
    pub flagged_action: Option<FlaggedMode>,

    /// Learn hostnames from clean HTML navigations. Defaults to true.
    #[serde(default)]
    pub auto_learn: Option<bool>,

    /// Screen login submissions for weak passwords. Defaults to true.
    #[serde(default)]
    pub check_passwords: Option<bool>,

    /// Hosts trusted before anything has been learned.
    #[serde(default)]
    pub seed_hosts: Vec<String>,

    /// Common-password list overriding the embedded one.
    #[serde(default)]
    pub popular_passwords_file: Option<PathBuf>,
}

impl PolicyConfig {
    fn merge(&mut self, other: PolicyConfig) {
        if other.flagged_action.is_some() {
            self.flagged_action = other.flagged_action;
        }
        if other.auto_learn.is_some() {
            self.auto_learn = other.auto_learn;
        }
        if other.check_passwords.is_some() {
            self.check_passwords = other.check_passwords;
        }
        self.seed_hosts.extend(other.seed_hosts);
        if other.popular_passwords_file.is_some() {
            self.popular_passwords_file = other.popular_passwords_file;
        }
    }

    /// Effective flagged action.
    pub fn flagged_mode(&self) -> FlaggedMode {
        self.flagged_action.unwrap_or(FlaggedMode::Warn)
    }

    /// Effective auto-learn flag.
    pub fn auto_learn(&self) -> bool {
        self.auto_learn.unwrap_or(true)
    }

    /// Effective password-screening flag.
    pub fn check_passwords(&self) -> bool {
        self.check_passwords.unwrap_or(true)
    }
}

/// Registry persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    /// Path of the registry file. Defaults to
    /// `~/.config/typoshield/websites.json` when unset.
    #[serde(default)]
    pub websites_file: Option<PathBuf>,
}

impl StorageConfig {
    fn merge(&mut self, other: StorageConfig) {
        if other.websites_file.is_some() {
            self.websites_file = other.websites_file;
        }
    }
}
