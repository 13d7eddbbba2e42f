//! Pattern validation and matching

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern is empty")]
    EmptyPattern,
    #[error("Pattern must start with the network tag \"{0}\"")]
    WrongTag(String),
    #[error("Pattern contains invalid character '{0}' (valid: {1})")]
    InvalidCharacter(char, String),
    #[error("Pattern too long (max {0} characters)")]
    PatternTooLong(usize),
    #[error("Address must be exactly {expected} characters, got {found}")]
    WrongLength { expected: usize, found: usize },
}

/// Type of pattern matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternType {
    /// Match the leading characters of the address
    Prefix,
    /// Match the whole address
    Exact,
}

/// Shape of a valid address on some network
#[derive(Debug, Clone, Copy)]
pub struct AddressRules<'a> {
    /// Characters every address starts with
    pub tag: &'a str,
    /// Full address length in characters
    pub length: usize,
    /// Characters an address may contain
    pub alphabet: &'a str,
}

/// A pattern to search for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// The pattern string to match
    pub value: String,
    /// Type of matching
    pub pattern_type: PatternType,
}

impl Pattern {
    /// Create a new prefix pattern
    pub fn prefix(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            pattern_type: PatternType::Prefix,
        }
    }

    /// Create a new exact-address pattern
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            pattern_type: PatternType::Exact,
        }
    }

    /// Validate pattern against the address rules of a network
    pub fn validate(&self, rules: &AddressRules<'_>) -> Result<(), PatternError> {
        if self.value.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        if !self.value.starts_with(rules.tag) {
            return Err(PatternError::WrongTag(rules.tag.to_string()));
        }

        let len = self.value.chars().count();
        match self.pattern_type {
            PatternType::Prefix if len > rules.length => {
                return Err(PatternError::PatternTooLong(rules.length));
            }
            PatternType::Exact if len != rules.length => {
                return Err(PatternError::WrongLength {
                    expected: rules.length,
                    found: len,
                });
            }
            _ => {}
        }

        if let Some(c) = self.value.chars().find(|&c| !rules.alphabet.contains(c)) {
            return Err(PatternError::InvalidCharacter(c, rules.alphabet.to_string()));
        }

        Ok(())
    }

    /// Check if address matches this pattern
    pub fn matches(&self, address: &str) -> bool {
        match self.pattern_type {
            PatternType::Prefix => address.starts_with(&self.value),
            PatternType::Exact => address == self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

    fn rules() -> AddressRules<'static> {
        AddressRules {
            tag: "TA",
            length: 97,
            alphabet: ALPHABET,
        }
    }

    #[test]
    fn test_prefix_match() {
        let pattern = Pattern::prefix("TAbc");
        assert!(pattern.matches("TAbcdef"));
        assert!(!pattern.matches("TAxbcdef"));
    }

    #[test]
    fn test_exact_match() {
        let pattern = Pattern::exact("TAbc");
        assert!(pattern.matches("TAbc"));
        assert!(!pattern.matches("TAbcd"));
    }

    #[test]
    fn test_validate_prefix() {
        assert!(Pattern::prefix("TA").validate(&rules()).is_ok());
        assert!(Pattern::prefix("TAWork").validate(&rules()).is_ok());
        assert_eq!(Pattern::prefix("").validate(&rules()), Err(PatternError::EmptyPattern));
        assert_eq!(
            Pattern::prefix("Tb").validate(&rules()),
            Err(PatternError::WrongTag("TA".to_string()))
        );
        assert_eq!(
            Pattern::prefix("TA0").validate(&rules()),
            Err(PatternError::InvalidCharacter('0', ALPHABET.to_string()))
        );
        let too_long = format!("TA{}", "z".repeat(96));
        assert_eq!(
            Pattern::prefix(too_long).validate(&rules()),
            Err(PatternError::PatternTooLong(97))
        );
    }

    #[test]
    fn test_validate_exact_length() {
        let full = format!("TA{}", "z".repeat(95));
        assert!(Pattern::exact(full).validate(&rules()).is_ok());
        assert_eq!(
            Pattern::exact("TAzz").validate(&rules()),
            Err(PatternError::WrongLength {
                expected: 97,
                found: 4
            })
        );
    }
}
