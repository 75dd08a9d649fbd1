//! Single-edit typo rules.
//!
//! A typosquatted hostname is almost always one keystroke away from the
//! hostname it imitates: one character replaced, one dropped, one doubled,
//! or two adjacent characters swapped. Each rule here detects exactly one
//! of those edits; anything further away is treated as a different name,
//! not a typo.
//!
//! Rules compare the *observed* hostname (taken from the request) against a
//! *known* hostname (taken from the registry). Identical strings never
//! match any rule - a rule reports a typo, not equality.

/// A rule that decides whether one hostname is a single-edit typo of another.
pub trait TypoRule: Send + Sync {
    /// Returns true if `observed` differs from `known` by exactly the edit
    /// this rule detects.
    fn matches(&self, observed: &str, known: &str) -> bool;

    /// Short rule name for audit events.
    fn name(&self) -> &'static str;
}

/// Exactly one character differs between two equal-length hostnames.
pub struct ReplacedChar;

impl TypoRule for ReplacedChar {
    fn matches(&self, observed: &str, known: &str) -> bool {
        let a: Vec<char> = observed.chars().collect();
        let b: Vec<char> = known.chars().collect();
        if a.len() != b.len() {
            return false;
        }

        let mut diffs = 0;
        for i in 0..a.len() {
            if a[i] != b[i] {
                diffs += 1;
                if diffs > 1 {
                    return false;
                }
            }
        }
        diffs == 1
    }

    fn name(&self) -> &'static str {
        "replaced_char"
    }
}

/// The observed hostname carries one extra character (`gooogle.com` for
/// `google.com`): removing a single character from it yields the known
/// hostname.
pub struct ExtraChar;

impl TypoRule for ExtraChar {
    fn matches(&self, observed: &str, known: &str) -> bool {
        skips_to_match(observed, known)
    }

    fn name(&self) -> &'static str {
        "extra_char"
    }
}

/// The observed hostname is missing one character (`gogle.com` for
/// `google.com`): inserting a single character into it yields the known
/// hostname.
pub struct MissingChar;

impl TypoRule for MissingChar {
    fn matches(&self, observed: &str, known: &str) -> bool {
        skips_to_match(known, observed)
    }

    fn name(&self) -> &'static str {
        "missing_char"
    }
}

/// Exactly one pair of adjacent characters is transposed (`googel.com`
/// for `google.com`).
pub struct AdjacentSwap;

impl TypoRule for AdjacentSwap {
    fn matches(&self, observed: &str, known: &str) -> bool {
        let a: Vec<char> = observed.chars().collect();
        let b: Vec<char> = known.chars().collect();
        let n = a.len();
        if b.len() != n || n < 2 {
            return false;
        }

        let mut swaps = 0;
        let mut i = 0;
        while i < n - 1 {
            if a[i] != b[i] {
                // Only a clean transposition is allowed at a mismatch.
                if a[i + 1] == b[i] && a[i] == b[i + 1] {
                    swaps += 1;
                    if swaps > 1 {
                        return false;
                    }
                    i += 1;
                } else {
                    return false;
                }
            }
            i += 1;
        }
        swaps == 1
    }

    fn name(&self) -> &'static str {
        "adjacent_swap"
    }
}

/// Check that `longer` equals `shorter` with exactly one character inserted.
///
/// Walks both strings in lockstep, allowing a single skip in `longer`.
fn skips_to_match(longer: &str, shorter: &str) -> bool {
    let long: Vec<char> = longer.chars().collect();
    let short: Vec<char> = shorter.chars().collect();
    let n = long.len();
    if short.len() + 1 != n {
        return false;
    }

    let mut skip = 0;
    for i in 0..n {
        if skip == 0 && i == n - 1 {
            // Reached the last character without skipping: the extra
            // character is the final one.
            return true;
        }
        if long[i] != short[i - skip] {
            skip += 1;
            if skip > 1 {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaced_char_detects_single_substitution() {
        let rule = ReplacedChar;
        for typo in ["abxde", "xbcde", "abcdx"] {
            assert!(rule.matches(typo, "abcde"), "{typo}");
        }
    }

    #[test]
    fn replaced_char_rejects_other_edits() {
        let rule = ReplacedChar;
        for not_typo in ["something_else", "xbcdx", "acbde", "abcde"] {
            assert!(!rule.matches(not_typo, "abcde"), "{not_typo}");
        }
    }

    #[test]
    fn extra_char_detects_single_insertion() {
        let rule = ExtraChar;
        for typo in ["aabcde", "abcxde", "abcdex"] {
            assert!(rule.matches(typo, "abcde"), "{typo}");
        }
    }

    #[test]
    fn extra_char_rejects_other_edits() {
        let rule = ExtraChar;
        for not_typo in ["something_else", "xabcdex", "abcxd", "abcde"] {
            assert!(!rule.matches(not_typo, "abcde"), "{not_typo}");
        }
    }

    #[test]
    fn missing_char_detects_single_deletion() {
        let rule = MissingChar;
        for typo in ["bcde", "abde", "abcd"] {
            assert!(rule.matches(typo, "abcde"), "{typo}");
        }
    }

    #[test]
    fn missing_char_rejects_other_edits() {
        let rule = MissingChar;
        for not_typo in ["something_else", "abcde", "abxd"] {
            assert!(!rule.matches(not_typo, "abcde"), "{not_typo}");
        }
    }

    #[test]
    fn adjacent_swap_detects_single_transposition() {
        let rule = AdjacentSwap;
        for typo in ["bacde", "acbde", "abced"] {
            assert!(rule.matches(typo, "abcde"), "{typo}");
        }
    }

    #[test]
    fn adjacent_swap_rejects_other_edits() {
        let rule = AdjacentSwap;
        for not_typo in ["something_else", "baced", "baxde", "abcde"] {
            assert!(!rule.matches(not_typo, "abcde"), "{not_typo}");
        }
    }

    #[test]
    fn rules_apply_to_real_hostnames() {
        assert!(MissingChar.matches("www.youtbe.com", "www.youtube.com"));
        assert!(ExtraChar.matches("www.youutube.com", "www.youtube.com"));
        assert!(ReplacedChar.matches("www.yoatube.com", "www.youtube.com"));
        assert!(AdjacentSwap.matches("www.yuotube.com", "www.youtube.com"));
        assert!(MissingChar.matches("www.gogle.com", "www.google.com"));
    }

    #[test]
    fn unrelated_hostnames_match_nothing() {
        let rules: [&dyn TypoRule; 4] = [&ReplacedChar, &ExtraChar, &MissingChar, &AdjacentSwap];
        for rule in rules {
            assert!(!rule.matches("www.example.com", "www.youtube.com"), "{}", rule.name());
            assert!(!rule.matches("", "www.youtube.com"), "{}", rule.name());
            assert!(!rule.matches("", ""), "{}", rule.name());
        }
    }
}
