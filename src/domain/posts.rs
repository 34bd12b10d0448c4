//! Post and comment rules shared by the services and the views.

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use super::error::DomainError;

/// Number of characters a post shows when rendered as a one-line label.
pub const HEADLINE_CHARS: usize = 15;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year]");
pub const HUMAN_DATETIME_FORMAT: &[FormatItem<'static>] = format_description!(
    "[day padding:none] [month repr:long] [year], [hour]:[minute]"
);

pub const INVALID_IMAGE_MESSAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// First [`HEADLINE_CHARS`] characters of a post body.
pub fn headline(text: &str) -> &str {
    match text.char_indices().nth(HEADLINE_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn format_human_date(value: OffsetDateTime) -> String {
    value
        .format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}

pub fn format_human_datetime(value: OffsetDateTime) -> String {
    value
        .format(HUMAN_DATETIME_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

/// Normalise a post body, rejecting blank input.
pub fn validate_post_text(text: &str) -> Result<String, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("This field is required."));
    }
    Ok(trimmed.to_string())
}

/// Normalise a comment body, rejecting blank input.
pub fn validate_comment_text(text: &str) -> Result<String, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("This field is required."));
    }
    Ok(trimmed.to_string())
}

/// Ensure the payload decodes as an image format we can serve back.
pub fn validate_image(bytes: &[u8]) -> Result<(), DomainError> {
    match imagesize::blob_size(bytes) {
        Ok(size) if size.width > 0 && size.height > 0 => Ok(()),
        _ => Err(DomainError::validation(INVALID_IMAGE_MESSAGE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
    ];

    #[test]
    fn headline_truncates_to_fifteen_characters() {
        assert_eq!(headline("A reasonably long post body"), "A reasonably lo");
        assert_eq!(headline("short"), "short");
    }

    #[test]
    fn headline_counts_characters_not_bytes() {
        let text = "Тестовый пост для проверки";
        assert_eq!(headline(text), "Тестовый пост д");
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(validate_post_text("   \n ").is_err());
        assert_eq!(validate_post_text("  hello ").unwrap(), "hello");
        assert!(validate_comment_text("").is_err());
    }

    #[test]
    fn gif_payload_is_an_image() {
        assert!(validate_image(SMALL_GIF).is_ok());
    }

    #[test]
    fn text_payload_is_not_an_image() {
        let err = validate_image(b"not image").unwrap_err();
        assert!(err.to_string().contains("Upload a valid image"));
    }

    #[test]
    fn human_date_uses_long_month() {
        let value = datetime!(2024-03-05 14:07 UTC);
        assert_eq!(format_human_date(value), "5 March 2024");
        assert_eq!(format_human_datetime(value), "5 March 2024, 14:07");
    }
}
