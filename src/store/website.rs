//! The website record kept in the registry.
//!
//! A record is either a *known-good* website (no redirect target) or a
//! remembered *typo* whose `directed_host` names the legitimate site the
//! user wants to land on instead. Known-good records also carry the
//! credentials seen on them, for phishing detection.

use super::credential::Credential;
use serde::{Deserialize, Serialize};

/// A visited website - compact enough to persist, complete enough to
/// answer future requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Website {
    host: String,
    /// Set when this record is a typo hostname with a remembered redirect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    directed_host: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    credentials: Vec<Credential>,
}

impl Website {
    /// Create a known-good website record.
    pub fn known(host: &str) -> Self {
        Self {
            host: host.to_lowercase(),
            directed_host: None,
            credentials: Vec::new(),
        }
    }

    /// Create a typo record pointing at the legitimate host.
    pub fn typo(host: &str, directed_host: &str) -> Self {
        Self {
            host: host.to_lowercase(),
            directed_host: Some(directed_host.to_lowercase()),
            credentials: Vec::new(),
        }
    }

    /// The hostname of this record.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Redirect target when this record is a typo, `None` otherwise.
    pub fn directed_host(&self) -> Option<&str> {
        self.directed_host.as_deref()
    }

    /// True when this record is a remembered typo.
    pub fn is_typo(&self) -> bool {
        self.directed_host.is_some()
    }

    /// Credentials seen on this website.
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Add a credential unless one with the same username already exists.
    /// Returns false on a duplicate username.
    pub fn add_credential(&mut self, credential: Credential) -> bool {
        if self
            .credentials
            .iter()
            .any(|c| c.username() == credential.username())
        {
            return false;
        }
        self.credentials.push(credential);
        true
    }

    /// Remove the credential for a username. Returns true if one existed.
    pub fn remove_credential(&mut self, username: &str) -> bool {
        let before = self.credentials.len();
        self.credentials.retain(|c| c.username() != username);
        self.credentials.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_records_have_no_redirect() {
        let site = Website::known("WWW.Example.COM");
        assert_eq!(site.host(), "www.example.com");
        assert!(!site.is_typo());
        assert!(site.directed_host().is_none());
    }

    #[test]
    fn typo_records_point_at_the_legit_host() {
        let site = Website::typo("www.exmaple.com", "www.example.com");
        assert!(site.is_typo());
        assert_eq!(site.directed_host(), Some("www.example.com"));
    }

    #[test]
    fn duplicate_usernames_are_rejected() {
        let mut site = Website::known("www.example.com");
        assert!(site.add_credential(Credential::new("alice", "one")));
        assert!(!site.add_credential(Credential::new("alice", "two")));
        assert_eq!(site.credentials().len(), 1);
        // The original credential survives.
        assert!(site.credentials()[0].matches("one"));
    }

    #[test]
    fn remove_credential_by_username() {
        let mut site = Website::known("www.example.com");
        site.add_credential(Credential::new("alice", "one"));
        assert!(site.remove_credential("alice"));
        assert!(!site.remove_credential("alice"));
        assert!(site.credentials().is_empty());
    }
}
