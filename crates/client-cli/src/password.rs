//! Password generation and local strength rules.
//!
//! New accounts get a generated credential (mailed to the user); password
//! changes are validated locally before any network call.

use rand::seq::SliceRandom;
use rand::Rng;

pub const GENERATED_LENGTH: usize = 12;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"[!@#$%^&*(),.?:{}|]";

/// Symbols the strength check accepts, matching the backend's policy.
const REQUIRED_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const MIN_LENGTH: usize = 12;

/// Generate a password with at least one character from each class, the
/// rest drawn from their union, shuffled.
pub fn generate(length: usize) -> String {
    let mut rng = rand::thread_rng();

    let mut chars: Vec<u8> = vec![
        *LOWERCASE.choose(&mut rng).unwrap_or(&b'a'),
        *UPPERCASE.choose(&mut rng).unwrap_or(&b'A'),
        *DIGITS.choose(&mut rng).unwrap_or(&b'0'),
        *SYMBOLS.choose(&mut rng).unwrap_or(&b'!'),
    ];

    let all: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();
    while chars.len() < length.max(4) {
        let idx = rng.gen_range(0..all.len());
        chars.push(all[idx]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

/// The strength rules a candidate password fails to meet; empty means it
/// passes.
pub fn unmet_rules(password: &str) -> Vec<&'static str> {
    let mut rules = Vec::new();
    if password.chars().count() < MIN_LENGTH {
        rules.push("at least 12 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        rules.push("at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        rules.push("at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        rules.push("at least one digit");
    }
    if !password.chars().any(|c| REQUIRED_SYMBOLS.contains(c)) {
        rules.push("at least one special symbol");
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_has_requested_length() {
        assert_eq!(generate(GENERATED_LENGTH).chars().count(), 12);
        assert_eq!(generate(20).chars().count(), 20);
    }

    #[test]
    fn test_generated_password_covers_all_classes() {
        for _ in 0..50 {
            let pw = generate(GENERATED_LENGTH);
            assert!(pw.chars().any(|c| c.is_ascii_lowercase()), "{pw}");
            assert!(pw.chars().any(|c| c.is_ascii_uppercase()), "{pw}");
            assert!(pw.chars().any(|c| c.is_ascii_digit()), "{pw}");
            assert!(
                pw.chars().any(|c| SYMBOLS.contains(&(c as u8)) && !c.is_ascii_alphanumeric()),
                "{pw}"
            );
        }
    }

    #[test]
    fn test_short_length_still_includes_one_of_each() {
        let pw = generate(2);
        assert_eq!(pw.chars().count(), 4);
    }

    #[test]
    fn test_strong_password_passes() {
        assert!(unmet_rules("Abcdefgh1234!").is_empty());
    }

    #[test]
    fn test_all_rules_reported_for_empty_input() {
        let rules = unmet_rules("");
        assert_eq!(rules.len(), 5);
    }

    #[test]
    fn test_individual_rule_failures() {
        assert!(unmet_rules("abcdefgh1234!").contains(&"at least one uppercase letter"));
        assert!(unmet_rules("ABCDEFGH1234!").contains(&"at least one lowercase letter"));
        assert!(unmet_rules("Abcdefghijkl!").contains(&"at least one digit"));
        assert!(unmet_rules("Abcdefgh12345").contains(&"at least one special symbol"));
        assert!(unmet_rules("Ab1!").contains(&"at least 12 characters"));
    }
}
