//! Configuration loading with hierarchy merging.
//!
//! Configuration is loaded from multiple sources and merged in order:
//!
//! 1. Embedded defaults (compiled into the binary)
//! 2. System config: `/etc/typoshield/config.toml`
//! 3. User config: `~/.config/typoshield/config.toml`
//! 4. Additional config file (via `--config` flag)
//! 5. CLI flags (highest priority)
//!
//! Lists (seed hosts) are **merged** (appended).
//! Scalars (listen, log_level) are **overridden**.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::error::ConfigError;
use super::schema::{Config, FlaggedMode, GeneralConfig, PolicyConfig};
use crate::cli::Cli;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// System-wide configuration path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/typoshield/config.toml";

/// User configuration directory name.
pub const USER_CONFIG_DIR: &str = "typoshield";

/// User configuration filename.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Registry filename inside the user configuration directory.
pub const WEBSITES_FILE: &str = "websites.json";

/// Configuration loader with support for hierarchy merging.
pub struct ConfigLoader {
    /// Path to system-wide configuration.
    system_path: PathBuf,
    /// Path to user configuration.
    user_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new ConfigLoader with default paths.
    #[must_use]
    pub fn new() -> Self {
        let user_config_dir = user_config_dir();

        Self {
            system_path: PathBuf::from(SYSTEM_CONFIG_PATH),
            user_path: user_config_dir.join(USER_CONFIG_FILE),
        }
    }

    /// Create a ConfigLoader with custom paths (for testing).
    #[must_use]
    pub fn with_paths(system_path: PathBuf, user_path: PathBuf) -> Self {
        Self {
            system_path,
            user_path,
        }
    }

    /// Load and merge configuration from all sources.
    ///
    /// Missing system/user config files are not errors - they are simply
    /// skipped. A missing `--config` file is an error (the user asked for
    /// it explicitly). Invalid TOML is an error (fail fast with a clear
    /// message). The merged result is validated before it is returned.
    pub fn load(&self, cli: &Cli) -> Result<Config, ConfigError> {
        // Start with embedded defaults
        let mut config: Config =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| ConfigError::ParseError {
                path: PathBuf::from("<embedded default.toml>"),
                source: e,
            })?;
        debug!("Loaded embedded default configuration");

        // Load and merge system config
        if let Some(system_config) = self.load_file(&self.system_path)? {
            config.merge(system_config);
            debug!("Loaded system config from {:?}", self.system_path);
        } else {
            debug!("No system config found at {:?}", self.system_path);
        }

        // Load and merge user config
        if let Some(user_config) = self.load_file(&self.user_path)? {
            config.merge(user_config);
            debug!("Loaded user config from {:?}", self.user_path);
        } else {
            debug!("No user config found at {:?}", self.user_path);
        }

        // Load and merge additional config file from CLI
        if let Some(ref cli_config_path) = cli.config {
            match self.load_file(cli_config_path)? {
                Some(cli_config) => {
                    config.merge(cli_config);
                    debug!("Loaded additional config from {:?}", cli_config_path);
                }
                None => {
                    // Unlike system/user config, a missing CLI-specified config is an error
                    return Err(ConfigError::ReadError {
                        path: cli_config_path.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "Specified config file not found",
                        ),
                    });
                }
            }
        }

        // Apply CLI flags (highest priority)
        let mut cli_overlay = Config::default();
        if let Some(ref listen) = cli.listen {
            cli_overlay.general = GeneralConfig {
                listen: listen.clone(),
                ..Default::default()
            };
        }
        if !cli.trust_hosts.is_empty() || cli.block {
            cli_overlay.policy = PolicyConfig {
                seed_hosts: cli.trust_hosts.clone(),
                flagged_action: cli.block.then_some(FlaggedMode::Block),
                ..Default::default()
            };
            debug!("Added {} trusted hosts from CLI flags", cli.trust_hosts.len());
        }
        config.merge(cli_overlay);

        config.validate()?;
        Ok(config)
    }

    /// Resolve the registry file path: the configured one, or
    /// `<user config dir>/websites.json`.
    pub fn websites_path(config: &Config) -> PathBuf {
        config
            .storage
            .websites_file
            .clone()
            .unwrap_or_else(|| user_config_dir().join(WEBSITES_FILE))
    }

    /// Load a config file, returning None if it doesn't exist.
    fn load_file(&self, path: &PathBuf) -> Result<Option<Config>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config =
                    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                        path: path.clone(),
                        source: e,
                    })?;
                Ok(Some(config))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::ReadError {
                path: path.clone(),
                source: e,
            }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// The user configuration directory (`~/.config/typoshield`).
fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join(USER_CONFIG_DIR))
        .unwrap_or_else(|| PathBuf::from(".config").join(USER_CONFIG_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_cli() -> Cli {
        Cli {
            command: None,
            config: None,
            listen: None,
            trust_hosts: vec![],
            block: false,
            verbose: 0,
        }
    }

    fn loader_in(dir: &std::path::Path) -> ConfigLoader {
        ConfigLoader::with_paths(dir.join("system.toml"), dir.join("user.toml"))
    }

    #[test]
    fn missing_files_use_defaults() {
        let dir = tempdir().unwrap();
        let loader = loader_in(dir.path());

        let config = loader.load(&create_test_cli()).unwrap();

        assert_eq!(config.general.listen, "127.0.0.1:8118");
        assert!(config.policy.seed_hosts.contains(&"www.google.com".to_string()));
    }

    #[test]
    fn user_config_overrides_system() {
        let dir = tempdir().unwrap();

        fs::write(
            dir.path().join("system.toml"),
            "[general]\nlisten = \"127.0.0.1:9001\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("user.toml"),
            "[general]\nlisten = \"127.0.0.1:9002\"\n",
        )
        .unwrap();

        let loader = loader_in(dir.path());
        let config = loader.load(&create_test_cli()).unwrap();

        assert_eq!(config.general.listen, "127.0.0.1:9002");
    }

    #[test]
    fn seed_hosts_are_merged_across_sources() {
        let dir = tempdir().unwrap();

        fs::write(
            dir.path().join("user.toml"),
            "[policy]\nseed_hosts = [\"intranet.corp\"]\n",
        )
        .unwrap();

        let loader = loader_in(dir.path());
        let config = loader.load(&create_test_cli()).unwrap();

        // Both default seeds and user seeds are present
        assert!(config.policy.seed_hosts.contains(&"www.google.com".to_string()));
        assert!(config.policy.seed_hosts.contains(&"intranet.corp".to_string()));
    }

    #[test]
    fn cli_flags_have_highest_priority() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("user.toml"),
            "[general]\nlisten = \"127.0.0.1:9002\"\n",
        )
        .unwrap();

        let loader = loader_in(dir.path());
        let mut cli = create_test_cli();
        cli.listen = Some("127.0.0.1:9003".to_string());
        cli.trust_hosts = vec!["cli-host.example.com".to_string()];
        cli.block = true;

        let config = loader.load(&cli).unwrap();

        assert_eq!(config.general.listen, "127.0.0.1:9003");
        assert!(config
            .policy
            .seed_hosts
            .contains(&"cli-host.example.com".to_string()));
        assert_eq!(config.policy.flagged_mode(), FlaggedMode::Block);
    }

    #[test]
    fn missing_cli_config_is_an_error() {
        let dir = tempdir().unwrap();
        let loader = loader_in(dir.path());

        let mut cli = create_test_cli();
        cli.config = Some(dir.path().join("absent.toml"));

        let result = loader.load(&cli);
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn invalid_toml_returns_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("system.toml"), "this is not valid TOML [[[").unwrap();

        let loader = loader_in(dir.path());
        let result = loader.load(&create_test_cli());

        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn invalid_listen_override_fails_validation() {
        let dir = tempdir().unwrap();
        let loader = loader_in(dir.path());

        let mut cli = create_test_cli();
        cli.listen = Some("nonsense".to_string());

        let result = loader.load(&cli);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn websites_path_prefers_configured_file() {
        let config = Config {
            storage: super::super::schema::StorageConfig {
                websites_file: Some(PathBuf::from("/var/lib/typoshield/websites.json")),
            },
            ..Default::default()
        };
        assert_eq!(
            ConfigLoader::websites_path(&config),
            PathBuf::from("/var/lib/typoshield/websites.json")
        );

        let default_path = ConfigLoader::websites_path(&Config::default());
        assert!(default_path.ends_with("typoshield/websites.json"));
    }
}
