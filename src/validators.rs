/// Input validators for registration, login and profile data
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Normalization: trimming, lowercased emails
/// 3. Format checks for email, phone number and employee id
/// 4. Control character rejection in names

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

pub use crate::auth::validate_password_strength;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 50;
const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15; // E.164
const MIN_EMPLOYEE_ID_LENGTH: usize = 3;
const MAX_EMPLOYEE_ID_LENGTH: usize = 32;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$"
    ).unwrap();

    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9]+$").unwrap();

    static ref EMPLOYEE_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap();
}

/// Validates and normalizes an email address (trimmed, lowercased)
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let normalized = email.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if normalized.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    // Local part limit (RFC 5321)
    if let Some((local, _)) = normalized.split_once('@') {
        if local.len() > 64 {
            return Err(ValidationError::SuspiciousContent("email".to_string()));
        }
    }

    Ok(normalized)
}

/// Validates a required name field, returning it trimmed
pub fn validate_name(field: &str, name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    let length = trimmed.chars().count();
    if length < MIN_NAME_LENGTH {
        return Err(ValidationError::TooShort(field.to_string(), MIN_NAME_LENGTH));
    }

    if length > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_NAME_LENGTH));
    }

    if has_suspicious_name_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Middle names are optional; an empty (or blank) value is returned as ""
/// so callers can use it to clear the field.
pub fn validate_middle_name(name: &str) -> Result<String, ValidationError> {
    if name.trim().is_empty() {
        return Ok(String::new());
    }
    validate_name("middle name", name)
}

/// Digits with an optional leading `+`; separators are not accepted
pub fn validate_phone_number(phone: &str) -> Result<String, ValidationError> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("phone number".to_string()));
    }

    if !PHONE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("phone number".to_string()));
    }

    let digits = trimmed.trim_start_matches('+').len();
    if digits < MIN_PHONE_DIGITS {
        return Err(ValidationError::TooShort(
            "phone number".to_string(),
            MIN_PHONE_DIGITS,
        ));
    }
    if digits > MAX_PHONE_DIGITS {
        return Err(ValidationError::TooLong(
            "phone number".to_string(),
            MAX_PHONE_DIGITS,
        ));
    }

    Ok(trimmed.to_string())
}

pub fn validate_employee_id(employee_id: &str) -> Result<String, ValidationError> {
    let trimmed = employee_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("employee ID".to_string()));
    }

    if trimmed.len() < MIN_EMPLOYEE_ID_LENGTH {
        return Err(ValidationError::TooShort(
            "employee ID".to_string(),
            MIN_EMPLOYEE_ID_LENGTH,
        ));
    }

    if trimmed.len() > MAX_EMPLOYEE_ID_LENGTH {
        return Err(ValidationError::TooLong(
            "employee ID".to_string(),
            MAX_EMPLOYEE_ID_LENGTH,
        ));
    }

    if !EMPLOYEE_ID_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("employee ID".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Presence check only; used where the value is compared, not stored
pub fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    Ok(())
}

/// Detects suspicious patterns in names
fn has_suspicious_name_patterns(name: &str) -> bool {
    // Null bytes and other control characters
    if name.chars().any(|c| c.is_control()) {
        return true;
    }

    // Excessive special characters
    let special_char_count = name
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !matches!(c, '-' | '.' | '\''))
        .count();

    special_char_count > 5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("test.email@domain.co.uk").is_ok());
        assert!(validate_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(
            validate_email("  Ada.Lovelace@Example.COM ").unwrap(),
            "ada.lovelace@example.com"
        );
    }

    #[test]
    fn test_invalid_email_format() {
        for email in ["invalid", "user@", "@example.com", "user@@example.com", "user@localhost"] {
            assert!(validate_email(email).is_err(), "{} should be rejected", email);
        }
        assert_eq!(
            validate_email("   "),
            Err(ValidationError::EmptyField("email".to_string()))
        );
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&too_long).is_err());

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(validate_email(&long_local).is_err());
    }

    #[test]
    fn test_valid_name() {
        assert_eq!(validate_name("first name", " Ada ").unwrap(), "Ada");
        assert!(validate_name("first name", "Jean-Pierre").is_ok());
        assert!(validate_name("last name", "O'Brien").is_ok());
    }

    #[test]
    fn test_name_length_limits() {
        assert_eq!(
            validate_name("first name", ""),
            Err(ValidationError::EmptyField("first name".to_string()))
        );
        assert!(matches!(
            validate_name("first name", "A"),
            Err(ValidationError::TooShort(_, MIN_NAME_LENGTH))
        ));
        assert!(validate_name("first name", &"a".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_suspicious_names() {
        assert!(validate_name("first name", "Name\0with\0null").is_err());
        assert!(validate_name("first name", "!!!!!!@@@@").is_err());
    }

    #[test]
    fn test_middle_name_may_be_blank() {
        assert_eq!(validate_middle_name("").unwrap(), "");
        assert_eq!(validate_middle_name("  ").unwrap(), "");
        assert_eq!(validate_middle_name(" Mary ").unwrap(), "Mary");
        assert!(validate_middle_name("M").is_err());
    }

    #[test]
    fn test_phone_number() {
        assert_eq!(validate_phone_number(" +15550001234 ").unwrap(), "+15550001234");
        assert!(validate_phone_number("5550001234").is_ok());
        assert!(validate_phone_number("555-000-1234").is_err());
        assert!(validate_phone_number("+1555").is_err());
        assert!(validate_phone_number(&"9".repeat(16)).is_err());
    }

    #[test]
    fn test_employee_id() {
        assert_eq!(validate_employee_id(" E100 ").unwrap(), "E100");
        assert!(validate_employee_id("EMP-2024_01").is_ok());
        assert!(validate_employee_id("E1").is_err());
        assert!(validate_employee_id("E 100").is_err());
        assert!(validate_employee_id("-E100").is_err());
    }

    #[test]
    fn test_require() {
        assert!(require("password", "x").is_ok());
        assert!(require("password", "  ").is_err());
    }
}
