//! Password complexity validation.
//!
//! The validator checks a candidate against five independent count-based
//! rules. Every active rule is evaluated on every call and all failures are
//! collected; a rule whose threshold is zero is not evaluated at all.
//!
//! Lengths are byte lengths and the character classes are ASCII only. Since
//! UTF-8 never uses ASCII bytes inside multi-byte sequences, counting bytes
//! gives the same class counts as counting characters.
//!
//! # Example
//! ```rust
//! use pwguard_core::complexity::{ComplexityOptions, PasswordComplexityValidator, RuleKind};
//!
//! let validator = PasswordComplexityValidator::new(ComplexityOptions {
//!     min_length: 8,
//!     min_upper: 1,
//!     min_lower: 1,
//!     min_digit: 1,
//!     min_special: 1,
//! });
//!
//! assert!(validator.validate("Passw0rd!").valid);
//!
//! let result = validator.validate("password");
//! assert!(!result.valid);
//! assert!(result.failed_rules.contains(&RuleKind::Upper));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Characters counted by the special-character rule.
pub const SPECIAL_CHARACTERS: &[u8] = b"[].'\"+=\\@_!#$%^&*()<>?|}{~:-";

/// Identifier of the complexity validator in the registry and settings tree.
pub const IDENTIFIER: &str = "password_complexity";

/// The individual complexity rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Minimum overall length in bytes
    Length,
    /// Minimum number of `A-Z`
    Upper,
    /// Minimum number of `a-z`
    Lower,
    /// Minimum number of `0-9`
    Digit,
    /// Minimum number of characters from [`SPECIAL_CHARACTERS`]
    Special,
}

impl RuleKind {
    /// All rules in evaluation order.
    pub const ALL: [Self; 5] = [
        Self::Length,
        Self::Upper,
        Self::Lower,
        Self::Digit,
        Self::Special,
    ];

    /// Configuration key of the rule's threshold.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Digit => "digit",
            Self::Special => "special",
        }
    }

    fn matches(self, byte: u8) -> bool {
        match self {
            Self::Length => true,
            Self::Upper => byte.is_ascii_uppercase(),
            Self::Lower => byte.is_ascii_lowercase(),
            Self::Digit => byte.is_ascii_digit(),
            Self::Special => SPECIAL_CHARACTERS.contains(&byte),
        }
    }

    /// Human-readable failure message for the given threshold.
    pub fn message(self, threshold: usize) -> String {
        match self {
            Self::Length => format!(
                "Password must be at least {} characters in length.",
                threshold
            ),
            Self::Upper => format!(
                "Password must contain at least {} uppercase letter(s).",
                threshold
            ),
            Self::Lower => format!(
                "Password must contain at least {} lowercase letter(s).",
                threshold
            ),
            Self::Digit => format!(
                "Password must contain at least {} numeric character(s).",
                threshold
            ),
            Self::Special => format!(
                "Password must contain at least {} special character(s).",
                threshold
            ),
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Complexity thresholds. Zero means "no requirement".
///
/// Deserializes from either a mapping (`length`, `upper`, `lower`, `digit`,
/// `special`, or their `min_*` spellings) or a bare number, which is taken
/// as the minimum length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OptionsRepr")]
pub struct ComplexityOptions {
    /// Minimum length in bytes
    #[serde(rename = "length")]
    pub min_length: usize,
    /// Minimum uppercase letters
    #[serde(rename = "upper")]
    pub min_upper: usize,
    /// Minimum lowercase letters
    #[serde(rename = "lower")]
    pub min_lower: usize,
    /// Minimum digits
    #[serde(rename = "digit")]
    pub min_digit: usize,
    /// Minimum special characters
    #[serde(rename = "special")]
    pub min_special: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionsRepr {
    Length(usize),
    Fields(OptionFields),
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct OptionFields {
    #[serde(alias = "min_length")]
    length: usize,
    #[serde(alias = "min_upper")]
    upper: usize,
    #[serde(alias = "min_lower")]
    lower: usize,
    #[serde(alias = "min_digit")]
    digit: usize,
    #[serde(alias = "min_special")]
    special: usize,
}

impl From<OptionsRepr> for ComplexityOptions {
    fn from(repr: OptionsRepr) -> Self {
        match repr {
            OptionsRepr::Length(min_length) => Self::from(min_length),
            OptionsRepr::Fields(fields) => Self {
                min_length: fields.length,
                min_upper: fields.upper,
                min_lower: fields.lower,
                min_digit: fields.digit,
                min_special: fields.special,
            },
        }
    }
}

impl From<usize> for ComplexityOptions {
    fn from(min_length: usize) -> Self {
        Self {
            min_length,
            ..Self::default()
        }
    }
}

/// Rewrites a bare-number setting as `{"length": n}` so mapping overrides
/// merge into it instead of replacing it.
pub fn expand_length_shorthand(settings: serde_json::Value) -> serde_json::Value {
    match settings {
        serde_json::Value::Number(length) => serde_json::json!({ "length": length }),
        other => other,
    }
}

impl ComplexityOptions {
    /// Threshold configured for a rule.
    pub const fn threshold(&self, rule: RuleKind) -> usize {
        match rule {
            RuleKind::Length => self.min_length,
            RuleKind::Upper => self.min_upper,
            RuleKind::Lower => self.min_lower,
            RuleKind::Digit => self.min_digit,
            RuleKind::Special => self.min_special,
        }
    }

    /// Builder method to set the minimum length.
    pub const fn with_min_length(mut self, n: usize) -> Self {
        self.min_length = n;
        self
    }

    /// Builder method to set the minimum uppercase count.
    pub const fn with_min_upper(mut self, n: usize) -> Self {
        self.min_upper = n;
        self
    }

    /// Builder method to set the minimum lowercase count.
    pub const fn with_min_lower(mut self, n: usize) -> Self {
        self.min_lower = n;
        self
    }

    /// Builder method to set the minimum digit count.
    pub const fn with_min_digit(mut self, n: usize) -> Self {
        self.min_digit = n;
        self
    }

    /// Builder method to set the minimum special-character count.
    pub const fn with_min_special(mut self, n: usize) -> Self {
        self.min_special = n;
        self
    }
}

/// Outcome of one complexity validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexityResult {
    /// True iff no rule failed
    pub valid: bool,
    /// Rules the candidate did not satisfy
    pub failed_rules: BTreeSet<RuleKind>,
    options: ComplexityOptions,
}

impl ComplexityResult {
    /// Failure messages keyed by rule, with thresholds interpolated.
    pub fn messages(&self) -> BTreeMap<RuleKind, String> {
        self.failed_rules
            .iter()
            .map(|rule| (*rule, rule.message(self.options.threshold(*rule))))
            .collect()
    }
}

/// Validates passwords against [`ComplexityOptions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordComplexityValidator {
    options: ComplexityOptions,
}

impl From<ComplexityOptions> for PasswordComplexityValidator {
    fn from(options: ComplexityOptions) -> Self {
        Self::new(options)
    }
}

impl PasswordComplexityValidator {
    /// Creates a validator from a full set of thresholds.
    pub const fn new(options: ComplexityOptions) -> Self {
        Self { options }
    }

    /// Shorthand for a validator that only requires a minimum length.
    pub const fn with_min_length(min_length: usize) -> Self {
        Self::new(ComplexityOptions {
            min_length,
            min_upper: 0,
            min_lower: 0,
            min_digit: 0,
            min_special: 0,
        })
    }

    /// Thresholds this validator was built with.
    pub const fn options(&self) -> &ComplexityOptions {
        &self.options
    }

    /// Runs every active rule against the candidate.
    pub fn validate(&self, candidate: &str) -> ComplexityResult {
        let failed_rules: BTreeSet<RuleKind> = RuleKind::ALL
            .into_iter()
            .filter(|rule| {
                let threshold = self.options.threshold(*rule);
                threshold > 0 && count_matching(candidate, *rule) < threshold
            })
            .collect();

        if !failed_rules.is_empty() {
            tracing::debug!(failed = ?failed_rules, "password complexity check failed");
        }

        ComplexityResult {
            valid: failed_rules.is_empty(),
            failed_rules,
            options: self.options,
        }
    }
}

fn count_matching(candidate: &str, rule: RuleKind) -> usize {
    match rule {
        RuleKind::Length => candidate.len(),
        _ => candidate.bytes().filter(|b| rule.matches(*b)).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> PasswordComplexityValidator {
        PasswordComplexityValidator::new(ComplexityOptions {
            min_length: 8,
            min_upper: 1,
            min_lower: 1,
            min_digit: 1,
            min_special: 1,
        })
    }

    #[test]
    fn test_strong_password_passes() {
        let result = strict().validate("Passw0rd!");
        assert!(result.valid);
        assert!(result.failed_rules.is_empty());
        assert!(result.messages().is_empty());
    }

    #[test]
    fn test_all_failures_are_collected() {
        let result = strict().validate("password");
        assert!(!result.valid);
        assert_eq!(
            result.failed_rules,
            BTreeSet::from([RuleKind::Upper, RuleKind::Digit, RuleKind::Special])
        );
    }

    #[test]
    fn test_empty_candidate_with_no_requirements() {
        let result = PasswordComplexityValidator::default().validate("");
        assert!(result.valid);
    }

    #[test]
    fn test_empty_candidate_fails_every_active_rule() {
        let result = strict().validate("");
        assert_eq!(result.failed_rules.len(), 5);
    }

    #[test]
    fn test_length_boundary() {
        let validator = PasswordComplexityValidator::with_min_length(4);
        assert!(validator.validate("abcd").valid);
        assert!(!validator.validate("abc").valid);
        assert!(validator.validate("abcde").valid);
    }

    #[test]
    fn test_length_counts_bytes() {
        // "é" is two bytes in UTF-8
        let validator = PasswordComplexityValidator::with_min_length(4);
        assert!(validator.validate("ééé").valid);
        assert!(!validator.validate("éa").valid);
    }

    #[test]
    fn test_class_counts_ignore_non_ascii() {
        let validator = PasswordComplexityValidator::new(
            ComplexityOptions::default().with_min_upper(1).with_min_lower(1),
        );
        let result = validator.validate("ÉÀéà");
        assert_eq!(
            result.failed_rules,
            BTreeSet::from([RuleKind::Upper, RuleKind::Lower])
        );
    }

    #[test]
    fn test_every_special_character_counts() {
        let all: String = SPECIAL_CHARACTERS.iter().map(|b| char::from(*b)).collect();
        let validator =
            PasswordComplexityValidator::new(ComplexityOptions::default().with_min_special(all.len()));
        assert!(validator.validate(&all).valid);

        // Space, comma, slash and backtick are not in the class
        let validator =
            PasswordComplexityValidator::new(ComplexityOptions::default().with_min_special(1));
        assert!(!validator.validate("a b,c/d`e").valid);
    }

    #[test]
    fn test_counts_must_reach_threshold() {
        let validator = PasswordComplexityValidator::new(
            ComplexityOptions::default().with_min_upper(2).with_min_digit(3),
        );
        assert_eq!(
            validator.validate("Ab12").failed_rules,
            BTreeSet::from([RuleKind::Upper, RuleKind::Digit])
        );
        assert!(validator.validate("ABc123").valid);
    }

    #[test]
    fn test_messages_carry_thresholds() {
        let validator = PasswordComplexityValidator::new(
            ComplexityOptions::default().with_min_length(12).with_min_special(2),
        );
        let messages = validator.validate("short").messages();

        assert_eq!(
            messages.get(&RuleKind::Length).map(String::as_str),
            Some("Password must be at least 12 characters in length.")
        );
        assert_eq!(
            messages.get(&RuleKind::Special).map(String::as_str),
            Some("Password must contain at least 2 special character(s).")
        );
    }

    #[test]
    fn test_options_from_mapping() {
        let options: ComplexityOptions = serde_json::from_value(serde_json::json!({
            "length": 10,
            "upper": 2,
            "min_digit": 1,
        }))
        .unwrap();

        assert_eq!(
            options,
            ComplexityOptions {
                min_length: 10,
                min_upper: 2,
                min_lower: 0,
                min_digit: 1,
                min_special: 0,
            }
        );
    }

    #[test]
    fn test_options_from_bare_length() {
        let options: ComplexityOptions = serde_json::from_value(serde_json::json!(12)).unwrap();
        assert_eq!(options, ComplexityOptions::from(12));
        assert_eq!(options.min_upper, 0);
    }

    #[test]
    fn test_options_from_empty_mapping() {
        let options: ComplexityOptions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(options, ComplexityOptions::default());
    }

    #[test]
    fn test_expand_length_shorthand() {
        assert_eq!(
            expand_length_shorthand(serde_json::json!(10)),
            serde_json::json!({ "length": 10 })
        );
        assert_eq!(
            expand_length_shorthand(serde_json::json!({ "upper": 1 })),
            serde_json::json!({ "upper": 1 })
        );
    }
}
