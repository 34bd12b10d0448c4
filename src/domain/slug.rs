//! Group slug rules.

use slug::slugify;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug must not be empty")]
    Empty,
    #[error("slug `{0}` may only contain lower-case letters, digits, hyphens and underscores")]
    InvalidCharacters(String),
    #[error("failed to derive slug from `{0}`")]
    Unrepresentable(String),
}

/// Validate a user-supplied slug.
pub fn validate_slug(input: &str) -> Result<String, SlugError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SlugError::Empty);
    }

    let valid = trimmed
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_');
    if !valid {
        return Err(SlugError::InvalidCharacters(trimmed.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Derive a slug from a human-readable title.
pub fn derive_slug(title: &str) -> Result<String, SlugError> {
    if title.trim().is_empty() {
        return Err(SlugError::Empty);
    }
    let candidate = slugify(title);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable(title.to_string()));
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_slug() {
        assert_eq!(validate_slug(" rust_fans-2 ").unwrap(), "rust_fans-2");
    }

    #[test]
    fn rejects_uppercase_and_spaces() {
        assert!(matches!(
            validate_slug("Rust Fans"),
            Err(SlugError::InvalidCharacters(_))
        ));
        assert_eq!(validate_slug(""), Err(SlugError::Empty));
    }

    #[test]
    fn derives_slug_from_title() {
        assert_eq!(derive_slug("Rust Fans Club").unwrap(), "rust-fans-club");
        assert_eq!(derive_slug("  "), Err(SlugError::Empty));
    }
}
