//! The interception layer: a forward HTTP(S) proxy in front of the browser.
//!
//! This module provides the proxy server with:
//! - Plain-HTTP handling with interstitial pages (warning, redirect,
//!   phishing, weak password) and in-band control endpoints
//! - HTTP CONNECT handling for HTTPS destinations, fail-closed for
//!   flagged hostnames
//! - Typosquat evaluation of every destination hostname
//! - Login screening for credential reuse and weak passwords
//!
//! # Architecture
//!
//! ```text
//! ┌─────────┐     HTTP / CONNECT      ┌─────────────────┐
//! │ Browser │────────────────────────►│    typoshield   │
//! └─────────┘                         │  ┌───────────┐  │
//!       ▲  interstitials / tunnels    │  │ registry  │  │
//!       └─────────────────────────────│  │ + engines │  │
//!                                     │  └───────────┘  │
//!                                     └────────┬────────┘
//!                                              │ clean traffic
//!                                              ▼
//!                                         ┌──────────┐
//!                                         │ Internet │
//!                                         └──────────┘
//! ```

pub mod error;
pub mod handler;
pub mod server;
pub mod tunnel;

// Re-export main types for convenient access
pub use error::{ProxyError, ProxyResult};
pub use handler::{proxy_request, ProxyBody, ProxyState, CONTROL_PREFIX};
pub use server::{ProxyConfig, ProxyServer, ProxyServerBuilder};
