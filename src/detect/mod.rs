//! Detection engines: typosquat similarity, phishing, password vetting.
//!
//! Everything here is pure hostname/string work with no I/O, so the proxy
//! layer can call it from any connection task. The three engines mirror
//! the three questions asked about a request:
//!
//! - Is the destination a typo of somewhere the user actually goes?
//!   ([`TyposquatCheck`])
//! - Is this login sending a known credential to a stranger?
//!   ([`PhishingCheck`])
//! - Is the password worth protecting at all? ([`PasswordPolicy`])

pub mod password;
pub mod phishing;
pub mod rules;
pub mod typosquat;

pub use password::{PasswordPolicy, PasswordRule};
pub use phishing::{login_fields, LoginFields, PhishingCheck, PhishingVerdict};
pub use rules::TypoRule;
pub use typosquat::{search_host, TypoVerdict, TyposquatCheck};
