//! Input validation helpers shared by the directory and task services.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid username regex"));

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Flattens `validator` derive output into field errors, sorted by field name
pub fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();

    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

/// Whether `value` (surrounding whitespace ignored) looks like an email address
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

/// Canonical stored form of an email: trimmed and lowercased
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Whether `value` only uses username characters (letters, digits, `_`, `.`, `-`)
pub fn is_valid_username_charset(value: &str) -> bool {
    USERNAME_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("tester@example.com"));
        assert!(is_valid_email("  First.Last+tag@Mail.Example.ORG "));
        assert!(!is_valid_email("tester"));
        assert!(!is_valid_email("tester@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("tester@example.c"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" TESTER@Example.COM "), "tester@example.com");
    }

    #[test]
    fn test_username_charset() {
        assert!(is_valid_username_charset("tester_01"));
        assert!(is_valid_username_charset("a.b-c"));
        assert!(!is_valid_username_charset("has space"));
        assert!(!is_valid_username_charset("at@sign"));
        assert!(!is_valid_username_charset(""));
    }
}
