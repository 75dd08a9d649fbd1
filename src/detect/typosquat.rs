//! Typosquat evaluation against the known-host registry.
//!
//! A hostname is evaluated in two passes:
//!
//! 1. The *search host* - the host of the page that issued the request
//!    (`Origin` header, else `Referer`, else the destination itself).
//! 2. The raw destination host, when it differs from the search host.
//!
//! A request is flagged only when **both** passes flag: subresources loaded
//! by a known-good page inherit that page's safety, and a known-good
//! destination is never blocked because of an odd referrer. An exact
//! registry match in either pass short-circuits to safe.

use super::rules::{AdjacentSwap, ExtraChar, MissingChar, ReplacedChar, TypoRule};
use tracing::info;
use url::Url;

/// Outcome of a typosquat evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypoVerdict {
    /// The hostname is known or not close to anything known.
    Safe,
    /// The hostname is one edit away from a known hostname.
    Typo {
        /// The known hostname the observed one imitates.
        matched: String,
        /// Name of the rule that fired.
        rule: &'static str,
    },
}

impl TypoVerdict {
    /// True when the verdict is [`TypoVerdict::Safe`].
    pub fn is_safe(&self) -> bool {
        matches!(self, TypoVerdict::Safe)
    }
}

/// The typosquat lookup-similarity engine.
///
/// Holds the ordered rule set; the known-host list is passed per call so
/// the engine itself stays free of locking concerns.
pub struct TyposquatCheck {
    rules: Vec<Box<dyn TypoRule>>,
}

impl TyposquatCheck {
    /// Create the engine with the standard single-edit rule set.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(AdjacentSwap),
                Box::new(ExtraChar),
                Box::new(MissingChar),
                Box::new(ReplacedChar),
            ],
        }
    }

    /// Evaluate a request against the registry.
    ///
    /// `request_host` is the destination from the request line; `search_host`
    /// is the contextual host from `Origin`/`Referer` (falling back to the
    /// destination). Both are matched case-insensitively.
    pub fn evaluate(
        &self,
        request_host: &str,
        search_host: &str,
        known_hosts: &[String],
    ) -> TypoVerdict {
        let request_host = request_host.to_lowercase();
        let search_host = search_host.to_lowercase();

        let first = match self.single_pass(&search_host, known_hosts) {
            PassResult::Known => return TypoVerdict::Safe,
            other => other,
        };

        if request_host == search_host {
            return first.into_verdict();
        }

        let second = match self.single_pass(&request_host, known_hosts) {
            PassResult::Known => return TypoVerdict::Safe,
            other => other,
        };

        // Flag only when both the page context and the destination look
        // like typos; report the context match.
        let both_flagged = matches!(first, PassResult::Flagged { .. })
            && matches!(second, PassResult::Flagged { .. });
        if both_flagged {
            first.into_verdict()
        } else {
            TypoVerdict::Safe
        }
    }

    /// Run one hostname through every known host and every rule.
    fn single_pass(&self, host: &str, known_hosts: &[String]) -> PassResult {
        let mut flagged: Option<(String, &'static str)> = None;

        for known in known_hosts {
            let known = known.to_lowercase();
            if known == host {
                return PassResult::Known;
            }

            for rule in &self.rules {
                if rule.matches(host, &known) {
                    info!(
                        "Rule {} flagged {} against known host {}",
                        rule.name(),
                        host,
                        known
                    );
                    flagged = Some((known.clone(), rule.name()));
                    break;
                }
            }
        }

        match flagged {
            Some((matched, rule)) => PassResult::Flagged { matched, rule },
            None => PassResult::Clean,
        }
    }
}

impl Default for TyposquatCheck {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one evaluation pass.
enum PassResult {
    /// Exact registry match.
    Known,
    /// No registry entry nearby.
    Clean,
    /// One edit away from `matched`.
    Flagged { matched: String, rule: &'static str },
}

impl PassResult {
    fn into_verdict(self) -> TypoVerdict {
        match self {
            PassResult::Flagged { matched, rule } => TypoVerdict::Typo { matched, rule },
            _ => TypoVerdict::Safe,
        }
    }
}

/// Pick the contextual *search host* for a request.
///
/// Precedence follows the browser's own signals: `Origin` header host,
/// else `Referer` header host, else the destination host itself.
pub fn search_host(origin: Option<&str>, referer: Option<&str>, request_host: &str) -> String {
    origin
        .and_then(host_of)
        .or_else(|| referer.and_then(host_of))
        .unwrap_or_else(|| request_host.to_string())
}

/// Extract the host portion of a URL string, if it has one.
pub fn host_of(uri: &str) -> Option<String> {
    Url::parse(uri)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<String> {
        vec!["www.youtube.com".to_string(), "www.google.com".to_string()]
    }

    #[test]
    fn known_hostnames_are_safe() {
        let check = TyposquatCheck::new();
        for host in ["www.youtube.com", "www.google.com"] {
            assert_eq!(check.evaluate(host, host, &known()), TypoVerdict::Safe);
        }
    }

    #[test]
    fn unknown_but_distant_hostnames_are_safe() {
        let check = TyposquatCheck::new();
        assert_eq!(
            check.evaluate("www.facebook.com", "www.facebook.com", &known()),
            TypoVerdict::Safe
        );
    }

    #[test]
    fn single_edit_typos_are_flagged() {
        let check = TyposquatCheck::new();
        for host in ["www.youtbe.com", "www.youutube.com", "www.gogle.com"] {
            assert!(
                !check.evaluate(host, host, &known()).is_safe(),
                "{host} should be flagged"
            );
        }
    }

    #[test]
    fn flagged_verdict_names_the_imitated_host() {
        let check = TyposquatCheck::new();
        for host in [
            "www.youtbe.com",
            "www.youtuube.com",
            "www.youutube.com",
            "www.yoatube.com",
            "www.yotuube.com",
        ] {
            match check.evaluate(host, host, &known()) {
                TypoVerdict::Typo { matched, .. } => assert_eq!(matched, "www.youtube.com"),
                TypoVerdict::Safe => panic!("{host} should be flagged"),
            }
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        let check = TyposquatCheck::new();
        assert_eq!(
            check.evaluate("WWW.YOUTUBE.COM", "WWW.YOUTUBE.COM", &known()),
            TypoVerdict::Safe
        );
        assert!(!check
            .evaluate("WWW.YOUTBE.COM", "WWW.YOUTBE.COM", &known())
            .is_safe());
    }

    #[test]
    fn known_context_rescues_a_typo_destination() {
        // A subresource on a typo-looking CDN host requested from a
        // known-good page passes: the search host is known.
        let check = TyposquatCheck::new();
        assert_eq!(
            check.evaluate("www.youtbe.com", "www.youtube.com", &known()),
            TypoVerdict::Safe
        );
    }

    #[test]
    fn clean_context_rescues_a_typo_destination() {
        // Either pass being clean means the request is not flagged.
        let check = TyposquatCheck::new();
        assert_eq!(
            check.evaluate("www.youtbe.com", "cdn.example.net", &known()),
            TypoVerdict::Safe
        );
    }

    #[test]
    fn typo_context_and_typo_destination_is_flagged() {
        let check = TyposquatCheck::new();
        match check.evaluate("www.gogle.com", "www.youtbe.com", &known()) {
            TypoVerdict::Typo { matched, .. } => assert_eq!(matched, "www.youtube.com"),
            TypoVerdict::Safe => panic!("both passes flagged, request must be flagged"),
        }
    }

    #[test]
    fn search_host_prefers_origin_over_referer() {
        assert_eq!(
            search_host(
                Some("https://a.example.com"),
                Some("https://b.example.com/page"),
                "c.example.com"
            ),
            "a.example.com"
        );
        assert_eq!(
            search_host(None, Some("https://b.example.com/page"), "c.example.com"),
            "b.example.com"
        );
        assert_eq!(search_host(None, None, "c.example.com"), "c.example.com");
    }

    #[test]
    fn search_host_ignores_unparseable_headers() {
        assert_eq!(
            search_host(Some("not a url"), None, "fallback.example.com"),
            "fallback.example.com"
        );
    }

    #[test]
    fn host_of_extracts_hosts() {
        assert_eq!(
            host_of("https://www.youtube.com/watch?v=x"),
            Some("www.youtube.com".to_string())
        );
        assert_eq!(host_of("nonsense"), None);
    }
}
