//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Trim and lowercase an email address; every lookup and write goes through this
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate display name
pub fn validate_name(name: &str) -> Result<(), String> {
    let length = name.trim().chars().count();

    if length == 0 {
        return Err("Name is required".to_string());
    }

    if length < MIN_NAME_LENGTH {
        return Err(format!(
            "Name must be at least {} characters",
            MIN_NAME_LENGTH
        ));
    }

    if length > MAX_NAME_LENGTH {
        return Err(format!("Name cannot exceed {} characters", MAX_NAME_LENGTH));
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("Failed to compile email regex"));

    if !regex.is_match(email.trim()) {
        return Err("Please enter a valid email".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }

    Ok(())
}

/// Validate contact number: exactly ten digits
pub fn validate_contact_number(contact_number: &str) -> Result<(), String> {
    static CONTACT_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = CONTACT_REGEX
        .get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("Failed to compile contact regex"));

    if !regex.is_match(contact_number.trim()) {
        return Err("Please enter a valid 10-digit phone number".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn name_bounds() {
        assert!(validate_name("Al").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name("A").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
        assert!(validate_name(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("alice example@x.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn password_minimum_length() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn contact_number_is_ten_digits() {
        assert!(validate_contact_number("9876543210").is_ok());
        assert!(validate_contact_number("987654321").is_err());
        assert!(validate_contact_number("98765432100").is_err());
        assert!(validate_contact_number("98765-4321").is_err());
    }
}
