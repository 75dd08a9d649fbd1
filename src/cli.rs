//! Command-line interface definitions for typoshield.
//!
//! Uses clap's derive API for type-safe argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Typosquatting-prevention security proxy.
///
/// typoshield runs as a forward HTTP(S) proxy. Point your browser at it and
/// it compares every destination hostname against the sites you actually
/// visit, warning you before a one-keystroke impostor gets the request.
/// Login submissions are additionally screened for credential reuse on
/// unfamiliar hosts and for weak passwords.
#[derive(Parser, Debug)]
#[command(name = "typoshield")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run (or omit to run the proxy).
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to additional config file.
    ///
    /// This config file is merged on top of system and user configs,
    /// giving it the highest priority (except for CLI flags).
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Listen address for the proxy (e.g. 127.0.0.1:8118).
    ///
    /// Overrides the `general.listen` config value.
    #[arg(short = 'l', long = "listen", value_name = "ADDR")]
    pub listen: Option<String>,

    /// Trust a hostname before anything has been learned (repeatable).
    ///
    /// These hosts are merged into the known-good registry at startup,
    /// exactly as if they had been learned from browsing.
    #[arg(short = 't', long = "trust-host", value_name = "HOST")]
    pub trust_hosts: Vec<String>,

    /// Block flagged hostnames instead of serving the warning page.
    ///
    /// Flagged HTML navigations normally get an interstitial with the
    /// choice to proceed; with --block they get a plain 403. Useful where
    /// nobody is around to read the warning.
    #[arg(long = "block")]
    pub block: bool,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = info level
    /// -vv   = debug level
    /// -vvv  = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Subcommands for typoshield.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect or edit the known-host registry without running the proxy.
    Hosts {
        /// Registry operation to perform.
        #[command(subcommand)]
        action: HostsAction,
    },
}

/// Operations on the persisted known-host registry.
#[derive(Subcommand, Debug)]
pub enum HostsAction {
    /// List all registry entries (known hosts and remembered typos).
    List,
    /// Add a hostname to the known-good registry.
    Add {
        /// Hostname to trust.
        host: String,
    },
    /// Remove a hostname from the registry.
    Remove {
        /// Hostname to forget.
        host: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic() {
        let cli = Cli::parse_from(["typoshield"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(cli.listen.is_none());
        assert!(cli.trust_hosts.is_empty());
        assert!(!cli.block);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_with_options() {
        let cli = Cli::parse_from([
            "typoshield",
            "-l",
            "127.0.0.1:9000",
            "-t",
            "www.example.com",
            "-t",
            "intranet.corp",
            "--block",
            "-vv",
        ]);

        assert_eq!(cli.listen, Some("127.0.0.1:9000".to_string()));
        assert_eq!(cli.trust_hosts, vec!["www.example.com", "intranet.corp"]);
        assert!(cli.block);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["typoshield", "--config", "/tmp/extra.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/extra.toml")));
    }

    #[test]
    fn parse_hosts_subcommands() {
        let cli = Cli::parse_from(["typoshield", "hosts", "list"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Hosts {
                action: HostsAction::List
            })
        ));

        let cli = Cli::parse_from(["typoshield", "hosts", "add", "www.example.com"]);
        match cli.command {
            Some(Commands::Hosts {
                action: HostsAction::Add { host },
            }) => assert_eq!(host, "www.example.com"),
            _ => panic!("Expected hosts add"),
        }

        let cli = Cli::parse_from(["typoshield", "hosts", "remove", "www.example.com"]);
        match cli.command {
            Some(Commands::Hosts {
                action: HostsAction::Remove { host },
            }) => assert_eq!(host, "www.example.com"),
            _ => panic!("Expected hosts remove"),
        }
    }
}
