//! typoshield: typosquatting-prevention security proxy
//!
//! This is the main entry point for the typoshield binary. It handles CLI
//! argument parsing, configuration loading, telemetry initialization, and
//! runs the proxy until interrupted.
//!
//! # I/O Architecture
//!
//! - **Audit logging**: Goes to syslog (not stdout/stderr), so SIEM
//!   pipelines see every security event without scraping terminal output
//! - **Debug logging**: Goes to stderr via `tracing`
//! - **User decisions**: Arrive in-band, through the control endpoints
//!   linked from the interstitial pages the proxy serves

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use typoshield::{
    cli::{Cli, Commands, HostsAction},
    config::{Config, ConfigLoader},
    detect::PasswordPolicy,
    proxy::ProxyServerBuilder,
    store::WebsiteStore,
    telemetry::{AuditEvent, AuditLogger, LearnSource},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before any other initialization)
    let cli = Cli::parse();

    // Load configuration with hierarchy merging
    let config_loader = ConfigLoader::new();
    let config = config_loader
        .load(&cli)
        .context("Failed to load configuration")?;

    // Tracing verbosity: -v flags win over the configured log level
    init_tracing(cli.verbose, &config.general.log_level)?;
    debug!("Parsed CLI arguments: {:?}", cli);
    debug!("Loaded configuration: {:?}", config);

    // Open the website registry
    let websites_path = ConfigLoader::websites_path(&config);
    let store = Arc::new(
        WebsiteStore::open(&websites_path)
            .with_context(|| format!("Failed to open registry at {:?}", websites_path))?,
    );

    // Audit logging goes to syslog; when no daemon is reachable the proxy
    // still runs, it just loses the audit trail.
    let audit = match AuditLogger::new() {
        Ok(logger) => Arc::new(logger),
        Err(e) => {
            warn!("Audit logging disabled: {}", e);
            Arc::new(AuditLogger::new_null())
        }
    };

    // Registry management without running the proxy
    if let Some(Commands::Hosts { action }) = cli.command {
        return run_hosts_command(action, &store, &audit);
    }

    // Seed hosts from config (and --trust-host flags, merged by the loader)
    for host in &config.policy.seed_hosts {
        if store.add_known_host(host) {
            audit.log(AuditEvent::HostLearned {
                host: host.to_lowercase(),
                source: LearnSource::Seed,
            });
        }
    }

    let listen = config.general.listen_addr()?;
    let password_policy = load_password_policy(&config)?;

    audit.log(AuditEvent::SessionStart {
        user: whoami(),
        listen: listen.to_string(),
        pid: std::process::id(),
    });
    let started = Instant::now();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = ProxyServerBuilder::new()
        .listen(listen)
        .store(store.clone())
        .flagged_mode(config.policy.flagged_mode())
        .auto_learn(config.policy.auto_learn())
        .check_passwords(config.policy.check_passwords())
        .password_policy(password_policy)
        .audit(audit.clone())
        .build(shutdown_rx);

    info!(
        "typoshield proxying on {} with {} registry entries",
        listen,
        store.len()
    );

    let server_handle = tokio::spawn(server.run());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    info!("Interrupted, shutting down");

    shutdown_tx
        .send(true)
        .context("Failed to signal shutdown")?;
    server_handle
        .await
        .context("Proxy task panicked")?
        .context("Proxy error")?;

    // Persist everything learned this session
    store.save().context("Failed to save registry")?;

    audit.log(AuditEvent::SessionEnd {
        user: whoami(),
        duration_sec: started.elapsed().as_secs(),
    });

    Ok(())
}

/// Run a `hosts` subcommand against the persisted registry.
fn run_hosts_command(action: HostsAction, store: &WebsiteStore, audit: &AuditLogger) -> Result<()> {
    match action {
        HostsAction::List => {
            for website in store.websites() {
                match website.directed_host() {
                    Some(directed) => println!("{} -> {}", website.host(), directed),
                    None => println!("{}", website.host()),
                }
            }
        }
        HostsAction::Add { host } => {
            if store.add_known_host(&host) {
                store.save().context("Failed to save registry")?;
                audit.log(AuditEvent::HostLearned {
                    host: host.to_lowercase(),
                    source: LearnSource::Cli,
                });
                println!("Added {}", host.to_lowercase());
            } else {
                println!("{} is already in the registry", host.to_lowercase());
            }
        }
        HostsAction::Remove { host } => {
            if store.remove_host(&host) {
                store.save().context("Failed to save registry")?;
                println!("Removed {}", host.to_lowercase());
            } else {
                println!("{} is not in the registry", host.to_lowercase());
            }
        }
    }
    Ok(())
}

/// Build the password rule chain, honoring a configured list override.
fn load_password_policy(config: &Config) -> Result<PasswordPolicy> {
    match config.policy.popular_passwords_file {
        Some(ref path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read password list {:?}", path))?;
            Ok(PasswordPolicy::with_popular_list(&contents))
        }
        None => Ok(PasswordPolicy::standard()),
    }
}

/// Initialize the tracing subscriber for debug/development logging.
///
/// This is separate from the audit telemetry which goes to syslog.
///
/// # Verbosity Levels
/// - 0 (default): The configured log level (or `warn`)
/// - 1 (-v): Info level
/// - 2 (-vv): Debug level
/// - 3+ (-vvv): Trace level
fn init_tracing(verbose: u8, configured_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 if !configured_level.is_empty() => EnvFilter::new(configured_level),
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    Ok(())
}

/// Get the current username for audit logging.
fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
