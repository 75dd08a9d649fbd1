//! Configuration system for typoshield.
//!
//! This module provides TOML configuration loading with hierarchy merging.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded from multiple sources and merged in order:
//!
//! 1. Embedded defaults (compiled into the binary)
//! 2. System config: `/etc/typoshield/config.toml`
//! 3. User config: `~/.config/typoshield/config.toml`
//! 4. Additional config file (via `--config` flag)
//! 5. CLI flags (highest priority)
//!
//! # Merge Behavior
//!
//! - **Lists** (seed hosts) are **merged** (appended)
//! - **Scalars** (listen, log_level, policy flags) are **overridden**
//!
//! # Example
//!
//! ```toml
//! [general]
//! listen = "127.0.0.1:8118"
//!
//! [policy]
//! flagged_action = "warn"
//! seed_hosts = ["www.google.com"]
//! ```

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::{ConfigLoader, SYSTEM_CONFIG_PATH, USER_CONFIG_DIR};
pub use schema::{Config, FlaggedMode, GeneralConfig, PolicyConfig, StorageConfig};
