//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest identifier accepted for sessions and attempts.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Validates that an identifier can safely name an archive folder.
///
/// # Examples
///
/// ```ignore
/// validate_identifier("g1")          // Ok
/// validate_identifier("")            // Err - empty
/// validate_identifier("team/a")      // Err - path separator
/// ```
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("identifier_empty");
        err.message = Some("identifier must not be empty".into());
        return Err(err);
    }

    let len = id.chars().count();
    if len > MAX_IDENTIFIER_LEN {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some(
            format!("identifier must be at most {MAX_IDENTIFIER_LEN} characters (got {len})")
                .into(),
        );
        return Err(err);
    }

    if id.chars().any(|c| c == '/' || c.is_control()) {
        let mut err = ValidationError::new("identifier_format");
        err.message = Some("identifier must not contain `/` or control characters".into());
        return Err(err);
    }

    Ok(())
}
