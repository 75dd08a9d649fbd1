//! Telemetry and audit logging for typoshield.
//!
//! This module provides structured logging to syslog with the `TYPOSHIELD`
//! tag. All security-relevant events are logged for later review.
//!
//! # Architecture
//!
//! - **Audit logging** (syslog): Security events go to syslog, never stdout/stderr
//! - **Debug logging** (tracing): Development logs go to stderr via `tracing`
//! - These are completely separate concerns
//!
//! # Usage
//!
//! ```ignore
//! use typoshield::telemetry::{self, AuditEvent};
//!
//! // Initialize at startup
//! telemetry::init_logger()?;
//!
//! // Log events throughout the application
//! telemetry::audit().log(AuditEvent::SessionStart {
//!     user: "developer".to_string(),
//!     listen: "127.0.0.1:8118".to_string(),
//!     pid: std::process::id(),
//! });
//! ```
//!
//! # Event Format
//!
//! Events are logged as JSON with an ISO8601 timestamp:
//!
//! ```json
//! {"ts":"2026-08-06T14:32:01Z","event":"typo_flag","host":"www.youtbe.com","matched":"www.youtube.com","rule":"missing_char","action":"warned"}
//! ```

mod error;
mod events;
mod syslog;

pub use error::TelemetryError;
pub use events::{
    AuditEvent, ControlKind, FlaggedAction, ForwardReason, LearnSource, TimestampedEvent,
};
pub use syslog::{audit, init_logger, try_audit, AuditLogger, SYSLOG_TAG};
