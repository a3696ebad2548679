//! Password generation
//!
//! Generates the one-time mailbox password handed back to the user at
//! provisioning time. The value is security-sensitive and disclosed
//! exactly once, so every draw comes from the operating system CSPRNG,
//! never a seeded or thread-local generator.

use crate::error::{PortalError, Result};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const UPPERCASE_UNAMBIGUOUS: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const LOWERCASE_UNAMBIGUOUS: &str = "abcdefghjkmnpqrstuvwxyz";
const NUMBERS: &str = "0123456789";
const NUMBERS_UNAMBIGUOUS: &str = "23456789";
const SYMBOLS: &str = "!#$%&()*+,-./:;<=>?@[]^_`{|}~";
const SYMBOLS_UNAMBIGUOUS: &str = "!#$%&*+-=?@^_";

/// Character-class policy for generated passwords.
///
/// Defaults: every class enabled, similar-looking characters (`0`, `O`,
/// `l`, `1`, ...) and ambiguous symbols excluded.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub include_uppercase: bool,
    pub include_lowercase: bool,
    pub include_numbers: bool,
    pub include_symbols: bool,
    pub exclude_similar: bool,
    pub exclude_ambiguous: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            include_uppercase: true,
            include_lowercase: true,
            include_numbers: true,
            include_symbols: true,
            exclude_similar: true,
            exclude_ambiguous: true,
        }
    }
}

impl PasswordPolicy {
    /// Enabled character classes, each pre-filtered by the exclusion flags.
    fn classes(&self) -> Vec<&'static str> {
        let mut classes = Vec::new();

        if self.include_lowercase {
            classes.push(if self.exclude_similar {
                LOWERCASE_UNAMBIGUOUS
            } else {
                LOWERCASE
            });
        }
        if self.include_uppercase {
            classes.push(if self.exclude_similar {
                UPPERCASE_UNAMBIGUOUS
            } else {
                UPPERCASE
            });
        }
        if self.include_numbers {
            classes.push(if self.exclude_similar {
                NUMBERS_UNAMBIGUOUS
            } else {
                NUMBERS
            });
        }
        if self.include_symbols {
            classes.push(if self.exclude_ambiguous {
                SYMBOLS_UNAMBIGUOUS
            } else {
                SYMBOLS
            });
        }

        classes
    }
}

/// Generate a password of exactly `length` characters.
///
/// Guarantees at least one character from every enabled class: one
/// character per class is drawn up front, the remainder is drawn from
/// the union of all enabled classes, and the sequence is then shuffled
/// once (Fisher-Yates over the OS CSPRNG). Fails with `InvalidPolicy`
/// when no class is enabled or `length` is too short to hold one
/// character of each enabled class.
pub fn generate(length: usize, policy: &PasswordPolicy) -> Result<String> {
    let classes = policy.classes();

    if classes.is_empty() {
        return Err(PortalError::InvalidPolicy(
            "at least one character class must be enabled".to_string(),
        ));
    }

    if length < classes.len() {
        return Err(PortalError::InvalidPolicy(format!(
            "length {} cannot cover {} enabled character classes",
            length,
            classes.len()
        )));
    }

    let union: Vec<char> = classes.iter().flat_map(|c| c.chars()).collect();
    let mut rng = OsRng;
    let mut chars: Vec<char> = Vec::with_capacity(length);

    // One guaranteed character per enabled class.
    for class in &classes {
        let class_chars: Vec<char> = class.chars().collect();
        chars.push(class_chars[rng.gen_range(0..class_chars.len())]);
    }

    while chars.len() < length {
        chars.push(union[rng.gen_range(0..union.len())]);
    }

    chars.shuffle(&mut rng);

    Ok(chars.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(upper: bool, lower: bool, numbers: bool, symbols: bool) -> PasswordPolicy {
        PasswordPolicy {
            include_uppercase: upper,
            include_lowercase: lower,
            include_numbers: numbers,
            include_symbols: symbols,
            ..PasswordPolicy::default()
        }
    }

    #[test]
    fn test_length_and_charset_for_all_flag_combinations() {
        for bits in 1u8..16 {
            let policy = policy(
                bits & 1 != 0,
                bits & 2 != 0,
                bits & 4 != 0,
                bits & 8 != 0,
            );
            let classes = policy.classes();

            for length in [4, 8, 16, 64] {
                let password = generate(length, &policy).unwrap();
                assert_eq!(password.chars().count(), length);

                // Every character comes from the union of enabled classes.
                for c in password.chars() {
                    assert!(
                        classes.iter().any(|class| class.contains(c)),
                        "character {:?} not in enabled classes",
                        c
                    );
                }

                // At least one character from each enabled class.
                for class in &classes {
                    assert!(
                        password.chars().any(|c| class.contains(c)),
                        "no character from class {:?} in {:?}",
                        class,
                        password
                    );
                }
            }
        }
    }

    #[test]
    fn test_all_classes_disabled_is_invalid_policy() {
        let policy = policy(false, false, false, false);
        let result = generate(16, &policy);
        assert!(matches!(result, Err(PortalError::InvalidPolicy(_))));
    }

    #[test]
    fn test_length_shorter_than_enabled_classes_is_invalid_policy() {
        let result = generate(3, &PasswordPolicy::default());
        assert!(matches!(result, Err(PortalError::InvalidPolicy(_))));
    }

    #[test]
    fn test_no_collisions_over_many_draws() {
        let policy = PasswordPolicy::default();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..10_000 {
            let password = generate(16, &policy).unwrap();
            assert!(seen.insert(password), "duplicate password generated");
        }
    }

    #[test]
    fn test_similar_characters_excluded_by_default() {
        let policy = PasswordPolicy {
            include_symbols: false,
            ..PasswordPolicy::default()
        };

        for _ in 0..100 {
            let password = generate(32, &policy).unwrap();
            for c in ['0', 'O', 'I', 'l', '1', 'i', 'o'] {
                assert!(!password.contains(c), "similar character {:?} present", c);
            }
        }
    }
}
