//! Audit event types for structured logging.
//!
//! These events are logged to syslog with the `TYPOSHIELD` tag for SIEM
//! integration and later review of what the proxy flagged and why.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Audit events for security logging.
///
/// Each variant represents a significant security-relevant event that
/// is logged to syslog for audit purposes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Proxy started.
    SessionStart {
        /// Username of the person running the proxy.
        user: String,
        /// Listen address.
        listen: String,
        /// Process ID of the proxy.
        pid: u32,
    },

    /// Proxy stopped.
    SessionEnd {
        /// Username of the person who ran the proxy.
        user: String,
        /// Duration of the session in seconds.
        duration_sec: u64,
    },

    /// A request was forwarded.
    RequestForward {
        /// Destination hostname.
        host: String,
        /// Why it was allowed through.
        reason: ForwardReason,
    },

    /// A hostname was flagged as a likely typosquat.
    TypoFlag {
        /// The flagged hostname.
        host: String,
        /// The known hostname it imitates.
        matched: String,
        /// Name of the rule that fired.
        rule: String,
        /// What the proxy did about it.
        action: FlaggedAction,
    },

    /// A remembered typo hostname was answered with its redirect page.
    TypoRedirect {
        /// The typo hostname.
        host: String,
        /// The legitimate host the user is sent to.
        directed: String,
    },

    /// A hostname entered the known-good registry.
    HostLearned {
        /// The learned hostname.
        host: String,
        /// How it was learned.
        source: LearnSource,
    },

    /// A login submission carried a credential already used elsewhere.
    PhishingFlag {
        /// The host receiving the submission.
        host: String,
        /// The host where the credential legitimately lives.
        credential_host: String,
        /// The username involved.
        username: String,
    },

    /// A login submission carried a weak password.
    WeakPassword {
        /// The host receiving the submission.
        host: String,
        /// The username involved.
        username: String,
        /// Which rule rejected the password.
        reason: String,
    },

    /// A new credential was recorded for a known-good host.
    CredentialStored {
        /// The host the credential belongs to.
        host: String,
        /// The username involved.
        username: String,
    },

    /// The user resolved a warning through a control endpoint.
    ControlAction {
        /// Which endpoint was used.
        action: ControlKind,
        /// The host the action applies to.
        host: String,
    },
}

/// Reasons for forwarding a request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardReason {
    /// Destination is in the known-good registry.
    KnownHost,
    /// Destination is unknown but not close to anything known.
    NotSuspicious,
    /// The page context (Origin/Referer) is known-good.
    ContextSafe,
}

/// What the proxy did with a flagged hostname.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlaggedAction {
    /// Served the warning interstitial.
    Warned,
    /// Answered 403.
    Blocked,
}

/// How a hostname entered the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnSource {
    /// Learned from a clean HTML navigation.
    Navigation,
    /// Learned from a clean CONNECT tunnel.
    Tunnel,
    /// The user trusted it through the warning page.
    ControlEndpoint,
    /// Added via the `hosts` CLI subcommand.
    Cli,
    /// Seeded from configuration.
    Seed,
}

/// Control endpoint kinds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// `/__typoshield/trust` - add a host to the registry.
    Trust,
    /// `/__typoshield/redirect` - remember a typo redirect.
    Redirect,
    /// `/__typoshield/ignore-credential` - exempt a host/username pair.
    IgnoreCredential,
}

/// Wrapper for serializing events with timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct TimestampedEvent<'a> {
    /// ISO8601 timestamp.
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,

    /// The actual event (flattened into this struct).
    #[serde(flatten)]
    pub event: &'a AuditEvent,
}

impl AuditEvent {
    /// Wrap this event with a timestamp for serialization.
    pub fn with_timestamp(&self) -> TimestampedEvent<'_> {
        TimestampedEvent {
            timestamp: Utc::now(),
            event: self,
        }
    }
}
