//! Stored login credentials.
//!
//! Only the username travels in the clear; the password is kept as a salted
//! SHA-512 digest so the registry file never contains anything replayable.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use uuid::Uuid;

/// A credential the user has used on a known-good website.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    username: String,
    /// Per-credential salt, 16 random bytes in hex.
    salt: String,
    /// Hex SHA-512 over salt bytes followed by password bytes.
    password_hash: String,
}

impl Credential {
    /// Create a credential from a plaintext password. The plaintext is
    /// hashed immediately and never stored.
    pub fn new(username: &str, password: &str) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        let password_hash = hash_password(&salt, password);
        Self {
            username: username.to_string(),
            salt,
            password_hash,
        }
    }

    /// The username this credential belongs to.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check a plaintext password against this credential's digest.
    pub fn matches(&self, password: &str) -> bool {
        hash_password(&self.salt, password) == self.password_hash
    }
}

/// Salted SHA-512, hex encoded.
fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_accepts_the_original_password() {
        let cred = Credential::new("alice", "hunter2!");
        assert!(cred.matches("hunter2!"));
        assert!(!cred.matches("hunter2"));
        assert!(!cred.matches(""));
    }

    #[test]
    fn salts_differ_between_credentials() {
        let a = Credential::new("alice", "same-password");
        let b = Credential::new("alice", "same-password");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn plaintext_never_appears_in_serialized_form() {
        let cred = Credential::new("alice", "super-secret-password");
        let json = serde_json::to_string(&cred).unwrap();
        assert!(!json.contains("super-secret-password"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn round_trips_through_json() {
        let cred = Credential::new("bob", "pa55word");
        let json = serde_json::to_string(&cred).unwrap();
        let back: Credential = serde_json::from_str(&json).unwrap();
        assert!(back.matches("pa55word"));
        assert_eq!(back.username(), "bob");
    }
}
