use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use super::errors::PolicyViolation;

/// Composition rules a password must meet. Each rule is independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOptions {
    /// Minimum number of characters.
    pub required_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_non_alphanumeric: bool,
    /// Minimum number of distinct characters; zero disables the rule.
    pub required_unique_chars: usize,
}

impl Default for PolicyOptions {
    /// At least 6 characters with an uppercase letter, a lowercase letter and a digit.
    fn default() -> Self {
        Self {
            required_length: 6,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_non_alphanumeric: false,
            required_unique_chars: 0,
        }
    }
}

/// Validates password composition before hashing.
#[derive(Debug, Clone, Default)]
pub struct PasswordPolicy {
    options: PolicyOptions,
}

impl PasswordPolicy {
    pub fn new(options: PolicyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PolicyOptions {
        &self.options
    }

    /// Check a password against the policy.
    ///
    /// Rules are checked in order: length, uppercase, lowercase, digit,
    /// non-alphanumeric, unique characters. Letters and digits are ASCII.
    ///
    /// # Errors
    /// The first rule the password fails
    pub fn validate(&self, password: &str) -> Result<(), PolicyViolation> {
        if password.is_empty() {
            return Err(PolicyViolation::Required);
        }

        let options = &self.options;

        if password.chars().count() < options.required_length {
            return Err(PolicyViolation::TooShort {
                min: options.required_length,
            });
        }

        let mut has_upper = false;
        let mut has_lower = false;
        let mut has_digit = false;
        let mut has_non_alphanumeric = false;
        let mut unique = HashSet::new();

        for c in password.chars() {
            has_upper |= c.is_ascii_uppercase();
            has_lower |= c.is_ascii_lowercase();
            has_digit |= c.is_ascii_digit();
            has_non_alphanumeric |= !c.is_ascii_alphanumeric();
            unique.insert(c);
        }

        if options.require_uppercase && !has_upper {
            return Err(PolicyViolation::MissingUppercase);
        }

        if options.require_lowercase && !has_lower {
            return Err(PolicyViolation::MissingLowercase);
        }

        if options.require_digit && !has_digit {
            return Err(PolicyViolation::MissingDigit);
        }

        if options.require_non_alphanumeric && !has_non_alphanumeric {
            return Err(PolicyViolation::MissingNonAlphanumeric);
        }

        if options.required_unique_chars > 0 && unique.len() < options.required_unique_chars {
            return Err(PolicyViolation::TooFewUniqueChars {
                min: options.required_unique_chars,
            });
        }

        Ok(())
    }
}
