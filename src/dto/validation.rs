//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

/// Longest accepted username, in characters.
pub const MAX_USERNAME_LEN: usize = 32;

/// Validates that a username is not blank and at most [`MAX_USERNAME_LEN`] characters long.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        let mut err = ValidationError::new("username_blank");
        err.message = Some("Username must not be blank".into());
        return Err(err);
    }

    let len = username.chars().count();
    if len > MAX_USERNAME_LEN {
        let mut err = ValidationError::new("username_length");
        err.message = Some(
            format!("Username must be at most {MAX_USERNAME_LEN} characters (got {len})").into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a question prompt contains more than whitespace.
pub fn validate_question_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut err = ValidationError::new("question_text_blank");
        err.message = Some("Question text must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that every choice is non-blank and that no choice is listed twice.
///
/// # Examples
///
/// ```ignore
/// validate_choices(&["Paris".into(), "Rome".into()]) // Ok
/// validate_choices(&["Paris".into(), " ".into()])    // Err - blank choice
/// validate_choices(&["Paris".into(), "Paris".into()]) // Err - duplicate
/// ```
pub fn validate_choices(choices: &[String]) -> Result<(), ValidationError> {
    if choices.iter().any(|choice| choice.trim().is_empty()) {
        let mut err = ValidationError::new("choice_blank");
        err.message = Some("Choices must not be blank".into());
        return Err(err);
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = choices.iter().find(|choice| !seen.insert(choice.as_str())) {
        let mut err = ValidationError::new("choice_duplicate");
        err.message = Some(format!("Choice `{duplicate}` is listed more than once").into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN)).is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_question_text() {
        assert!(validate_question_text("Capital of France?").is_ok());
        assert!(validate_question_text("").is_err());
        assert!(validate_question_text(" \t\n").is_err());
    }

    #[test]
    fn test_validate_choices_valid() {
        assert!(validate_choices(&choices(&["Paris", "Rome"])).is_ok());
        assert!(validate_choices(&choices(&["a", "A"])).is_ok()); // case-sensitive
    }

    #[test]
    fn test_validate_choices_invalid() {
        assert!(validate_choices(&choices(&["Paris", ""])).is_err());
        assert!(validate_choices(&choices(&["Paris", "  "])).is_err());
        assert!(validate_choices(&choices(&["Paris", "Rome", "Paris"])).is_err());
    }
}
