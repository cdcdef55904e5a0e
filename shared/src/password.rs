use serde::{Deserialize, Serialize};

use crate::MIN_PASSWORD_LENGTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChecks {
    pub lowercase: bool,
    pub uppercase: bool,
    pub digit: bool,
    pub special: bool,
    pub min_length: bool,
}

impl PasswordChecks {
    #[must_use]
    pub fn passed(self) -> u8 {
        [
            self.lowercase,
            self.uppercase,
            self.digit,
            self.special,
            self.min_length,
        ]
        .into_iter()
        .map(u8::from)
        .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordStrength {
    pub checks: PasswordChecks,
    pub score: u8,
    pub percentage: u8,
    pub strength: Strength,
}

/// Scores a password on five independent character-class checks.
///
/// Classes are Unicode-aware: `Ä` counts as uppercase, `٣` as a digit. An
/// empty password is simply all-false and weak.
#[must_use]
pub fn score(password: &str) -> PasswordStrength {
    let checks = PasswordChecks {
        lowercase: password.chars().any(char::is_lowercase),
        uppercase: password.chars().any(char::is_uppercase),
        digit: password.chars().any(char::is_numeric),
        special: password.chars().any(|c| !c.is_alphanumeric()),
        min_length: password.chars().count() >= MIN_PASSWORD_LENGTH,
    };

    let score = checks.passed();
    let strength = match score {
        0..=2 => Strength::Weak,
        3 => Strength::Medium,
        _ => Strength::Strong,
    };

    PasswordStrength {
        checks,
        score,
        percentage: score * 20,
        strength,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_password_is_weak_zero() {
        let result = score("");
        assert_eq!(result.checks, PasswordChecks::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.percentage, 0);
        assert_eq!(result.strength, Strength::Weak);
    }

    #[test]
    fn test_all_checks_pass() {
        let result = score("Abc123!$");
        assert!(result.checks.lowercase);
        assert!(result.checks.uppercase);
        assert!(result.checks.digit);
        assert!(result.checks.special);
        assert!(result.checks.min_length);
        assert_eq!(result.score, 5);
        assert_eq!(result.percentage, 100);
        assert_eq!(result.strength, Strength::Strong);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(score("ab").strength, Strength::Weak);
        assert_eq!(score("aB").strength, Strength::Weak);
        assert_eq!(score("aB1").strength, Strength::Medium);
        assert_eq!(score("aB1!").strength, Strength::Strong);
        assert_eq!(score("aB1!").percentage, 80);
    }

    #[test]
    fn test_unicode_classes() {
        let result = score("äÖ٣");
        assert!(result.checks.lowercase);
        assert!(result.checks.uppercase);
        assert!(result.checks.digit);
        assert!(!result.checks.special);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        assert!(!score("ééééééé").checks.min_length);
        assert!(score("éééééééé").checks.min_length);
    }

    proptest! {
        #[test]
        fn prop_percentage_tracks_score(password in ".{0,24}") {
            let result = score(&password);
            prop_assert!(result.score <= 5);
            prop_assert_eq!(u32::from(result.percentage), u32::from(result.score) * 20);
            prop_assert_eq!(result.score, result.checks.passed());
        }
    }
}
