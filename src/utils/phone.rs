//! E.164 phone number normalization
//!
//! The identity service only accepts E.164 (`+` followed by country code and
//! subscriber number, 8-15 digits total). Numbers submitted without the
//! leading `+` are normalized by prepending it; numbers that already carry it
//! are passed through unchanged.

use crate::errors::AuthError;
use once_cell::sync::Lazy;
use regex::Regex;

static E164_RE: Lazy<Regex> = Lazy::new(|| {
    // Pattern is a compile-time constant; a failure here is a programming error
    Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("invalid E.164 regex")
});

/// Normalize a submitted phone number to E.164 form.
///
/// # Errors
///
/// Returns `AuthError::InvalidRequest` if the number is not valid E.164 after
/// normalization (wrong length, non-digits, leading zero country code).
pub fn normalize_e164(raw: &str) -> Result<String, AuthError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidRequest(
            "phone number is required".to_string(),
        ));
    }

    let candidate = if trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+{trimmed}")
    };

    if E164_RE.is_match(&candidate) {
        Ok(candidate)
    } else {
        Err(AuthError::InvalidRequest(format!(
            "phone number is not in E.164 format: {raw}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepends_plus_when_missing() {
        assert_eq!(normalize_e164("15551234567").unwrap(), "+15551234567");
    }

    #[test]
    fn test_passes_through_with_plus() {
        assert_eq!(normalize_e164("+15551234567").unwrap(), "+15551234567");
    }

    #[test]
    fn test_rejects_non_digits() {
        assert!(normalize_e164("+1555abc4567").is_err());
        assert!(normalize_e164("555 123 4567").is_err());
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(normalize_e164("+123").is_err());
        assert!(normalize_e164("+1234567890123456").is_err());
    }

    #[test]
    fn test_rejects_leading_zero_country_code() {
        assert!(normalize_e164("+05551234567").is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(normalize_e164("").is_err());
        assert!(normalize_e164("   ").is_err());
    }
}
