//! Credential validation
//!
//! Pure checks run before anything touches the store or the hasher.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Minimum password length, in characters
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Maximum password length, in bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Why a set of credentials was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Missing field or malformed email
    #[error("{0}")]
    InvalidInput(&'static str),

    /// Password does not satisfy the length policy
    #[error("{0}")]
    PolicyViolation(&'static str),
}

/// Trim and lowercase an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Validate registration credentials
///
/// Rules are checked in order and the first failure wins:
/// 1. email and password are non-empty
/// 2. email looks like `local@domain.tld`
/// 3. password has at least 6 characters
/// 4. password is at most 72 bytes
pub fn validate_credentials(email: &str, password: &str) -> Result<(), CredentialError> {
    if email.is_empty() || password.is_empty() {
        return Err(CredentialError::InvalidInput(
            "email and password are required",
        ));
    }

    if !EMAIL_PATTERN.is_match(email) {
        return Err(CredentialError::InvalidInput("invalid email format"));
    }

    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(CredentialError::PolicyViolation(
            "password must be at least 6 characters long",
        ));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(CredentialError::PolicyViolation(
            "password must not exceed 72 bytes",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_credentials() {
        assert!(validate_credentials("a@b.com", "secret1").is_ok());
        assert!(validate_credentials("first.last+tag@mail.example.org", "123456").is_ok());
        assert!(validate_credentials("x_y%z-1@sub-domain.io", &"p".repeat(72)).is_ok());
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            validate_credentials("", "secret1"),
            Err(CredentialError::InvalidInput("email and password are required"))
        );
        assert!(matches!(
            validate_credentials("a@b.com", ""),
            Err(CredentialError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_malformed_emails() {
        for email in [
            "plainaddress",
            "@b.com",
            "a@",
            "a@b",
            "a@b.c",
            "a b@c.com",
            "a@b.c0m",
            "ü@b.com",
        ] {
            assert!(
                matches!(
                    validate_credentials(email, "secret1"),
                    Err(CredentialError::InvalidInput("invalid email format"))
                ),
                "email: {email}"
            );
        }
    }

    #[test]
    fn test_rule_order() {
        // Malformed email wins over a short password
        assert!(matches!(
            validate_credentials("nope", "123"),
            Err(CredentialError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_password_length_policy() {
        assert!(matches!(
            validate_credentials("a@b.com", "12345"),
            Err(CredentialError::PolicyViolation(_))
        ));
        assert!(matches!(
            validate_credentials("a@b.com", &"p".repeat(73)),
            Err(CredentialError::PolicyViolation(
                "password must not exceed 72 bytes"
            ))
        ));
    }

    #[test]
    fn test_password_length_counts_characters_and_bytes() {
        // Six characters, twelve bytes: long enough
        assert!(validate_credentials("a@b.com", "пароль").is_ok());
        // 25 characters, 75 bytes: too long
        assert!(matches!(
            validate_credentials("a@b.com", &"€".repeat(25)),
            Err(CredentialError::PolicyViolation(_))
        ));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("a@b.com"), "a@b.com");
    }

    proptest! {
        #[test]
        fn accepts_well_formed(
            local in "[a-zA-Z0-9._%+-]{1,20}",
            domain in "[a-z0-9]{1,12}",
            tld in "[a-z]{2,6}",
            password in "[ -~]{6,72}",
        ) {
            let email = format!("{local}@{domain}.{tld}");
            prop_assert!(validate_credentials(&email, &password).is_ok());
        }

        #[test]
        fn rejects_short_passwords(password in "[ -~]{1,5}") {
            prop_assert!(matches!(
                validate_credentials("a@b.com", &password),
                Err(CredentialError::PolicyViolation(_))
            ));
        }

        #[test]
        fn rejects_long_passwords(password in "[ -~]{73,120}") {
            prop_assert!(matches!(
                validate_credentials("a@b.com", &password),
                Err(CredentialError::PolicyViolation(_))
            ));
        }

        #[test]
        fn rejects_emails_without_at(email in "[a-zA-Z0-9.]{1,30}") {
            prop_assert!(matches!(
                validate_credentials(&email, "secret1"),
                Err(CredentialError::InvalidInput(_))
            ));
        }
    }
}
