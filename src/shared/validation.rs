use axum::http::HeaderValue;
use lazy_static::lazy_static;
use regex::Regex;

/// Longest display name stored for a file
pub const MAX_DISPLAY_NAME_LEN: usize = 255;

/// Longest content type stored for a file
pub const MAX_CONTENT_TYPE_LEN: usize = 255;

/// Content type recorded when the client sends none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

lazy_static! {
    /// Control characters are never allowed in display names
    /// - Valid: "report.pdf", "Q3 budget (final).xlsx"
    /// - Invalid: "a\nb.txt", "tab\there"
    pub static ref CONTROL_CHARS_REGEX: Regex = Regex::new(r"[\x00-\x1F\x7F]").unwrap();
}

/// Validate a user-supplied file display name, returning it trimmed
pub fn validate_display_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("File name must not be empty".to_string());
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(format!(
            "File name must be at most {} characters",
            MAX_DISPLAY_NAME_LEN
        ));
    }
    if CONTROL_CHARS_REGEX.is_match(trimmed) {
        return Err("File name must not contain control characters".to_string());
    }

    Ok(trimmed.to_string())
}

/// Validate a client-supplied content type. Blank means octet-stream.
///
/// The value is echoed back as the `Content-Type` of downloads, so it must be
/// a valid header value as well as fit the metadata column.
pub fn validate_content_type(content_type: &str) -> Result<String, String> {
    let trimmed = content_type.trim();

    if trimmed.is_empty() {
        return Ok(DEFAULT_CONTENT_TYPE.to_string());
    }
    if trimmed.len() > MAX_CONTENT_TYPE_LEN {
        return Err(format!(
            "Content type must be at most {} characters",
            MAX_CONTENT_TYPE_LEN
        ));
    }
    if CONTROL_CHARS_REGEX.is_match(trimmed) || HeaderValue::from_str(trimmed).is_err() {
        return Err("Content type is not a valid header value".to_string());
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_valid() {
        assert_eq!(validate_display_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(
            validate_display_name("  Q3 budget (final).xlsx ").unwrap(),
            "Q3 budget (final).xlsx"
        );
    }

    #[test]
    fn test_display_name_invalid() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name("a\nb.txt").is_err()); // newline
        assert!(validate_display_name(&"x".repeat(MAX_DISPLAY_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(validate_content_type("image/png").unwrap(), "image/png");
        assert_eq!(
            validate_content_type(" text/plain; charset=utf-8 ").unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(validate_content_type("").unwrap(), DEFAULT_CONTENT_TYPE);
        assert!(validate_content_type(&"a".repeat(MAX_CONTENT_TYPE_LEN + 1)).is_err());
        assert!(validate_content_type("text/plain\r\nX-Injected: 1").is_err());
        assert!(validate_content_type("text/plain\u{7f}").is_err());
    }
}
