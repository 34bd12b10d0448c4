//! Account rules: usernames and passwords.

use super::error::DomainError;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// Validate a username: 1–150 characters of letters, digits and `@.+-_`.
pub fn validate_username(input: &str) -> Result<String, DomainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("This field is required."));
    }
    if trimmed.chars().count() > USERNAME_MAX_CHARS {
        return Err(DomainError::validation(
            "Ensure this value has at most 150 characters.",
        ));
    }
    let valid = trimmed
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        return Err(DomainError::validation(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate a new password and its confirmation.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), DomainError> {
    if password != confirmation {
        return Err(DomainError::validation(
            "The two password fields didn't match.",
        ));
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(DomainError::validation(
            "This password is too short. It must contain at least 8 characters.",
        ));
    }
    if password.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(DomainError::validation("This password is entirely numeric."));
    }
    Ok(())
}
