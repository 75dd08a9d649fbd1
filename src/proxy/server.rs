//! Proxy server implementation.
//!
//! This module provides the main proxy server that:
//! - Listens for browser connections on a TCP socket
//! - Handles HTTP CONNECT for HTTPS destinations
//! - Handles plain HTTP requests, serving interstitials where needed
//! - Runs every request through the typosquat and login gates
//!
//! # Architecture
//!
//! The proxy uses hyper's HTTP/1.1 server with upgrade support for CONNECT.
//! Each connection is handled in a separate Tokio task; shared state lives
//! in an [`Arc<ProxyState>`].
//!
//! # Example
//!
//! ```ignore
//! use typoshield::proxy::{ProxyServer, ProxyConfig};
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let server = ProxyServer::new(config, shutdown_rx);
//! server.run().await?;
//!
//! // To shutdown:
//! shutdown_tx.send(true)?;
//! ```

use super::error::ProxyError;
use super::handler::{proxy_request, ProxyState};
use crate::config::FlaggedMode;
use crate::detect::PasswordPolicy;
use crate::store::WebsiteStore;
use crate::telemetry::AuditLogger;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Configuration for the proxy server.
pub struct ProxyConfig {
    /// Address to listen on.
    pub listen: SocketAddr,
    /// Shared website registry.
    pub store: Arc<WebsiteStore>,
    /// Action for flagged HTML navigations.
    pub flagged_mode: FlaggedMode,
    /// Learn hostnames from clean traffic.
    pub auto_learn: bool,
    /// Screen login submissions for weak passwords.
    pub check_passwords: bool,
    /// Password rule chain.
    pub password_policy: PasswordPolicy,
    /// Audit logger for security events.
    pub audit: Arc<AuditLogger>,
}

/// The main proxy server.
pub struct ProxyServer {
    listen: SocketAddr,
    /// Shared pipeline state.
    state: Arc<ProxyState>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl ProxyServer {
    /// Create a new proxy server.
    pub fn new(config: ProxyConfig, shutdown_rx: watch::Receiver<bool>) -> Self {
        let state = Arc::new(ProxyState::new(
            config.store,
            config.flagged_mode,
            config.auto_learn,
            config.check_passwords,
            config.password_policy,
            config.audit,
        ));

        Self {
            listen: config.listen,
            state,
            shutdown_rx,
        }
    }

    /// Shared pipeline state (registry access for CLI and tests).
    pub fn state(&self) -> Arc<ProxyState> {
        self.state.clone()
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(self) -> Result<(), ProxyError> {
        let listener = TcpListener::bind(self.listen).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener until the shutdown
    /// signal is received. Split from [`ProxyServer::run`] so tests can
    /// bind an ephemeral port themselves.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ProxyError> {
        let local_addr = listener.local_addr()?;
        info!("Proxy listening on {}", local_addr);

        let mut shutdown_rx = self.shutdown_rx.clone();
        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            debug!("Accepted connection from {}", addr);
                            self.spawn_connection_handler(stream);
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Proxy shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawn a task to handle a single connection.
    fn spawn_connection_handler(&self, stream: TcpStream) {
        let state = self.state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                // Connection resets are common and not worth a warning.
                let err_str = e.to_string();
                if err_str.contains("connection reset")
                    || err_str.contains("broken pipe")
                    || err_str.contains("Connection reset")
                {
                    debug!("Connection ended: {}", e);
                } else {
                    warn!("Connection error: {}", e);
                }
            }
        });
    }
}

/// Handle a single client connection.
async fn handle_connection(stream: TcpStream, state: Arc<ProxyState>) -> Result<(), ProxyError> {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req| proxy_request(req, state.clone()));

    // Serve HTTP/1.1 with support for upgrades (needed for CONNECT)
    http1::Builder::new()
        .preserve_header_case(true)
        .title_case_headers(true)
        .serve_connection(io, service)
        .with_upgrades()
        .await
        .map_err(ProxyError::from)
}

/// Builder for ProxyServer configuration.
pub struct ProxyServerBuilder {
    listen: Option<SocketAddr>,
    store: Option<Arc<WebsiteStore>>,
    flagged_mode: FlaggedMode,
    auto_learn: bool,
    check_passwords: bool,
    password_policy: Option<PasswordPolicy>,
    audit: Option<Arc<AuditLogger>>,
}

impl ProxyServerBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            listen: None,
            store: None,
            flagged_mode: FlaggedMode::Warn,
            auto_learn: true,
            check_passwords: true,
            password_policy: None,
            audit: None,
        }
    }

    /// Set the listen address.
    pub fn listen(mut self, listen: SocketAddr) -> Self {
        self.listen = Some(listen);
        self
    }

    /// Set the website registry.
    pub fn store(mut self, store: Arc<WebsiteStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the flagged-navigation action.
    pub fn flagged_mode(mut self, mode: FlaggedMode) -> Self {
        self.flagged_mode = mode;
        self
    }

    /// Enable or disable automatic host learning.
    pub fn auto_learn(mut self, auto_learn: bool) -> Self {
        self.auto_learn = auto_learn;
        self
    }

    /// Enable or disable password screening.
    pub fn check_passwords(mut self, check: bool) -> Self {
        self.check_passwords = check;
        self
    }

    /// Set the password rule chain.
    pub fn password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = Some(policy);
        self
    }

    /// Set the audit logger.
    pub fn audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build the proxy server.
    ///
    /// # Panics
    ///
    /// Panics if required fields are not set.
    pub fn build(self, shutdown_rx: watch::Receiver<bool>) -> ProxyServer {
        let config = ProxyConfig {
            listen: self.listen.expect("listen is required"),
            store: self.store.expect("store is required"),
            flagged_mode: self.flagged_mode,
            auto_learn: self.auto_learn,
            check_passwords: self.check_passwords,
            password_policy: self
                .password_policy
                .unwrap_or_else(PasswordPolicy::standard),
            audit: self.audit.expect("audit is required"),
        };

        ProxyServer::new(config, shutdown_rx)
    }
}

impl Default for ProxyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
