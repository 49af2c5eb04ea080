use super::error::{EngagementError, EngagementResult};

pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_HANDLE_LENGTH: usize = 64;

/// Returns the trimmed comment text.
pub fn validate_comment_text(text: &str) -> EngagementResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EngagementError::InvalidInput(
            "Comment text is required".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_COMMENT_LENGTH {
        return Err(EngagementError::InvalidInput(format!(
            "Comment text exceeds {} characters",
            MAX_COMMENT_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_handle(handle: &str) -> EngagementResult<()> {
    if handle.is_empty() {
        return Err(EngagementError::InvalidInput("Handle is required".to_string()));
    }
    if handle.chars().any(char::is_whitespace) {
        return Err(EngagementError::InvalidInput(
            "Handle must not contain whitespace".to_string(),
        ));
    }
    if handle.chars().count() > MAX_HANDLE_LENGTH {
        return Err(EngagementError::InvalidInput(format!(
            "Handle exceeds {} characters",
            MAX_HANDLE_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_text_is_trimmed() {
        assert_eq!(validate_comment_text("  nice shot \n").unwrap(), "nice shot");
    }

    #[test]
    fn blank_comment_is_rejected() {
        assert!(matches!(
            validate_comment_text("   "),
            Err(EngagementError::InvalidInput(_))
        ));
    }

    #[test]
    fn comment_length_is_counted_in_chars() {
        let at_limit = "é".repeat(MAX_COMMENT_LENGTH);
        assert!(validate_comment_text(&at_limit).is_ok());
        let over = "a".repeat(MAX_COMMENT_LENGTH + 1);
        assert!(validate_comment_text(&over).is_err());
    }

    #[test]
    fn handles() {
        assert!(validate_handle("alice_01").is_ok());
        assert!(validate_handle("").is_err());
        assert!(validate_handle("al ice").is_err());
        assert!(validate_handle(&"a".repeat(MAX_HANDLE_LENGTH + 1)).is_err());
    }
}
