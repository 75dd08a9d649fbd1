//! Credential-reuse phishing detection.
//!
//! A phishing site does not look like a typo - it looks like a login page.
//! The tell is the credential: when a username/password pair the user
//! normally types on `www.bank.com` shows up in a form submission to some
//! other host, the submission is almost certainly going to an impostor.
//!
//! The check never sees stored plaintext: candidate passwords are hashed
//! against each stored credential's salt (see [`crate::store::Credential`]).

use crate::store::WebsiteStore;
use std::collections::HashSet;
use std::sync::RwLock;

/// Form field names treated as a username.
const USERNAME_FIELDS: &[&str] = &["username", "user", "uname"];

/// Form field names treated as a password.
const PASSWORD_FIELDS: &[&str] = &["pass", "password", "pwd"];

/// Outcome of a phishing evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhishingVerdict {
    /// The submission goes where this credential belongs (or the
    /// credential is new).
    Safe,
    /// The credential is already in use on a different known-good host.
    CredentialReuse {
        /// The host where the credential legitimately lives.
        credential_host: String,
    },
}

/// A username and password extracted from a login form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFields {
    /// Value of the username field.
    pub username: String,
    /// Value of the password field.
    pub password: String,
}

/// Extract login fields from decoded form parameters.
///
/// Returns `Some` only when both a username field and a password field are
/// present - the original definition of a login submission.
pub fn login_fields(params: &[(String, String)]) -> Option<LoginFields> {
    let username = params
        .iter()
        .find(|(name, _)| USERNAME_FIELDS.contains(&name.as_str()))
        .map(|(_, value)| value.clone())?;
    let password = params
        .iter()
        .find(|(name, _)| PASSWORD_FIELDS.contains(&name.as_str()))
        .map(|(_, value)| value.clone())?;

    Some(LoginFields { username, password })
}

/// Credential-reuse checker with a per-session exemption list.
pub struct PhishingCheck {
    /// (sanitized host, username) pairs the user chose to exempt.
    ignored: RwLock<HashSet<(String, String)>>,
}

impl PhishingCheck {
    /// Create a checker with an empty exemption list.
    pub fn new() -> Self {
        Self {
            ignored: RwLock::new(HashSet::new()),
        }
    }

    /// Evaluate a login submission to `host`.
    pub fn evaluate(
        &self,
        host: &str,
        login: &LoginFields,
        store: &WebsiteStore,
    ) -> PhishingVerdict {
        if self.is_ignored(host, &login.username) {
            return PhishingVerdict::Safe;
        }

        // The user already has this account here.
        if store.has_credential(host, &login.username) {
            return PhishingVerdict::Safe;
        }

        match store.credential_reused_on(host, &login.username, &login.password) {
            Some(credential_host) => PhishingVerdict::CredentialReuse { credential_host },
            None => PhishingVerdict::Safe,
        }
    }

    /// Exempt a (host, username) combination from future checks.
    pub fn ignore(&self, host: &str, username: &str) {
        self.ignored
            .write()
            .unwrap()
            .insert((crate::store::sanitize_host(host), username.to_string()));
    }

    /// True when the combination has been exempted.
    pub fn is_ignored(&self, host: &str, username: &str) -> bool {
        self.ignored
            .read()
            .unwrap()
            .contains(&(crate::store::sanitize_host(host), username.to_string()))
    }
}

impl Default for PhishingCheck {
    fn default() -> Self {
        Self::new()
    }
}
