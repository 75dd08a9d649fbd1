//! Known-website registry with JSON persistence.
//!
//! The registry is the proxy's memory: every known-good website the user
//! has visited, every remembered typo redirect, and the credentials seen on
//! known-good sites. It is shared across connection tasks behind an
//! internal `RwLock`, so all methods take `&self`.
//!
//! Persistence is a plain JSON file. A missing file yields an empty
//! registry; the file is rewritten on [`WebsiteStore::save`].

mod credential;
mod error;
mod website;

pub use credential::Credential;
pub use error::StoreError;
pub use website::Website;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// Shared registry of known websites, typo redirects, and credentials.
pub struct WebsiteStore {
    websites: RwLock<Vec<Website>>,
    path: Option<PathBuf>,
}

impl WebsiteStore {
    /// Create an empty registry with no backing file (tests, `hosts` CLI
    /// dry runs).
    pub fn in_memory() -> Self {
        Self {
            websites: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Open the registry at `path`, creating an empty one if the file does
    /// not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let websites = match fs::read_to_string(path) {
            Ok(contents) => {
                let websites: Vec<Website> =
                    serde_json::from_str(&contents).map_err(|e| StoreError::Parse {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                info!("Loaded {} registry entries from {:?}", websites.len(), path);
                websites
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No registry file at {:?}, starting empty", path);
                Vec::new()
            }
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        Ok(Self {
            websites: RwLock::new(websites),
            path: Some(path.to_path_buf()),
        })
    }

    /// Persist the registry to its backing file. A registry without a
    /// backing file saves nowhere and returns Ok.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let websites = self.websites.read().unwrap();
        let contents = serde_json::to_string_pretty(&*websites)?;
        fs::write(path, contents).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e,
        })?;

        debug!("Wrote {} registry entries to {:?}", websites.len(), path);
        Ok(())
    }

    /// Hostnames of all known-good entries (typo records excluded).
    pub fn known_hosts(&self) -> Vec<String> {
        self.websites
            .read()
            .unwrap()
            .iter()
            .filter(|w| !w.is_typo())
            .map(|w| w.host().to_string())
            .collect()
    }

    /// True when `host` is a known-good entry.
    pub fn is_known_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.websites
            .read()
            .unwrap()
            .iter()
            .any(|w| !w.is_typo() && w.host() == host)
    }

    /// True when `host` is a remembered typo.
    pub fn is_typo_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.websites
            .read()
            .unwrap()
            .iter()
            .any(|w| w.is_typo() && w.host() == host)
    }

    /// Redirect target for a remembered typo hostname.
    pub fn typo_redirect(&self, host: &str) -> Option<String> {
        let host = host.to_lowercase();
        self.websites
            .read()
            .unwrap()
            .iter()
            .find(|w| w.is_typo() && w.host() == host)
            .and_then(|w| w.directed_host().map(str::to_string))
    }

    /// Learn a known-good host. Returns false when the host is already
    /// present (as known-good or as a typo record).
    pub fn add_known_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        if host.is_empty() {
            return false;
        }

        let mut websites = self.websites.write().unwrap();
        if websites.iter().any(|w| w.host() == host) {
            return false;
        }
        websites.push(Website::known(&host));
        true
    }

    /// Remember a typo hostname with its redirect target. The target must
    /// already be a known-good entry. Returns false otherwise, or when the
    /// typo hostname is already recorded.
    pub fn add_typo_host(&self, typo: &str, directed: &str) -> bool {
        let typo = typo.to_lowercase();
        let directed = directed.to_lowercase();

        let mut websites = self.websites.write().unwrap();
        let directed_known = websites
            .iter()
            .any(|w| !w.is_typo() && w.host() == directed);
        if !directed_known || websites.iter().any(|w| w.host() == typo) {
            return false;
        }
        websites.push(Website::typo(&typo, &directed));
        true
    }

    /// Remove any record for `host`. Returns true if one existed.
    pub fn remove_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let mut websites = self.websites.write().unwrap();
        let before = websites.len();
        websites.retain(|w| w.host() != host);
        websites.len() != before
    }

    /// Attach a credential to a known-good host. Returns false when the
    /// host is unknown or already holds a credential for that username.
    pub fn add_credential(&self, host: &str, credential: Credential) -> bool {
        let host = host.to_lowercase();
        let mut websites = self.websites.write().unwrap();
        match websites
            .iter_mut()
            .find(|w| !w.is_typo() && w.host() == host)
        {
            Some(site) => site.add_credential(credential),
            None => false,
        }
    }

    /// True when the known-good entry for `host` (matched loosely, ignoring
    /// `www.` and scheme prefixes) holds a credential for `username`.
    pub fn has_credential(&self, host: &str, username: &str) -> bool {
        let host = sanitize_host(host);
        self.websites
            .read()
            .unwrap()
            .iter()
            .filter(|w| !w.is_typo() && sanitize_host(w.host()) == host)
            .any(|w| w.credentials().iter().any(|c| c.username() == username))
    }

    /// Find another known-good host where `username` uses this exact
    /// password. `exclude_host` (loosely matched) is skipped.
    pub fn credential_reused_on(
        &self,
        exclude_host: &str,
        username: &str,
        password: &str,
    ) -> Option<String> {
        let exclude = sanitize_host(exclude_host);
        self.websites
            .read()
            .unwrap()
            .iter()
            .filter(|w| !w.is_typo() && sanitize_host(w.host()) != exclude)
            .find(|w| {
                w.credentials()
                    .iter()
                    .any(|c| c.username() == username && c.matches(password))
            })
            .map(|w| w.host().to_string())
    }

    /// Snapshot of every record, for listing.
    pub fn websites(&self) -> Vec<Website> {
        self.websites.read().unwrap().clone()
    }

    /// Number of records (known-good and typo).
    pub fn len(&self) -> usize {
        self.websites.read().unwrap().len()
    }

    /// True when the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalize a hostname for credential-scoped comparisons: lowercase,
/// scheme and leading `www.` stripped. `login.example.com` stays distinct
/// from `example.com`; only the `www` alias folds.
pub fn sanitize_host(host: &str) -> String {
    let host = host.to_lowercase();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(&host);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
