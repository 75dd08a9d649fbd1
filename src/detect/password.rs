//! Password strength vetting for intercepted login submissions.
//!
//! Rules run in order and the first failure wins; the reason string is
//! shown to the user on the weak-password interstitial.

use std::collections::HashSet;

/// Embedded common-password list, one password per line.
const POPULAR_PASSWORDS: &str = include_str!("../../assets/popular_passwords.txt");

/// A single password-strength rule.
pub trait PasswordRule: Send + Sync {
    /// Ok when the password passes, Err with a human-readable reason
    /// otherwise.
    fn check(&self, password: &str) -> Result<(), &'static str>;
}

/// Rejects passwords made entirely of digits.
pub struct NumericOnly;

impl PasswordRule for NumericOnly {
    fn check(&self, password: &str) -> Result<(), &'static str> {
        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            Err("the password contains only numbers")
        } else {
            Ok(())
        }
    }
}

/// Rejects passwords found on a common-password list.
pub struct PopularPassword {
    passwords: HashSet<String>,
}

impl PopularPassword {
    /// Build from the embedded list.
    pub fn embedded() -> Self {
        Self::from_lines(POPULAR_PASSWORDS)
    }

    /// Build from newline-separated list contents (e.g. a user-provided
    /// file). Blank lines are skipped.
    pub fn from_lines(contents: &str) -> Self {
        let passwords = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { passwords }
    }

    /// Number of passwords on the list.
    pub fn len(&self) -> usize {
        self.passwords.len()
    }

    /// True when the list is empty.
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }
}

impl PasswordRule for PopularPassword {
    fn check(&self, password: &str) -> Result<(), &'static str> {
        if self.passwords.contains(password) {
            Err("the password is on the common-password list")
        } else {
            Ok(())
        }
    }
}

/// Rejects passwords under a minimum length.
pub struct TooShort {
    min: usize,
}

impl TooShort {
    /// Minimum accepted length in characters.
    pub fn new(min: usize) -> Self {
        Self { min }
    }
}

impl PasswordRule for TooShort {
    fn check(&self, password: &str) -> Result<(), &'static str> {
        if password.chars().count() < self.min {
            Err("the password is shorter than 6 characters")
        } else {
            Ok(())
        }
    }
}

/// Ordered chain of password rules.
pub struct PasswordPolicy {
    rules: Vec<Box<dyn PasswordRule>>,
}

impl PasswordPolicy {
    /// The standard chain: numeric-only, common-password list, minimum
    /// length.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                Box::new(NumericOnly),
                Box::new(PopularPassword::embedded()),
                Box::new(TooShort::new(6)),
            ],
        }
    }

    /// The standard chain with a caller-provided common-password list.
    pub fn with_popular_list(contents: &str) -> Self {
        Self {
            rules: vec![
                Box::new(NumericOnly),
                Box::new(PopularPassword::from_lines(contents)),
                Box::new(TooShort::new(6)),
            ],
        }
    }

    /// Run the chain; the first failing rule's reason is returned.
    pub fn evaluate(&self, password: &str) -> Result<(), &'static str> {
        for rule in &self.rules {
            rule.check(password)?;
        }
        Ok(())
    }
}
