//! Validation rules for user-supplied fields.
//!
//! Each function returns `Err(message)` with the user-facing message that
//! ends up in an `Outcome::Failure`; handlers collect the messages before
//! touching any state.

/// Minimum username length.
pub const USERNAME_MIN: usize = 3;
/// Maximum username length.
pub const USERNAME_MAX: usize = 50;
/// Maximum post title length.
pub const TITLE_MAX: usize = 200;
/// Maximum profile bio length.
pub const BIO_MAX: usize = 1000;
/// Maximum tag name length.
pub const TAG_NAME_MAX: usize = 50;

/// Validates a username: required, 3–50 chars, letters/digits/underscore.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required.".to_string());
    }
    if username.chars().count() < USERNAME_MIN || username.chars().count() > USERNAME_MAX {
        return Err(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters."
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Username can only contain letters, numbers, and underscores.".to_string());
    }
    Ok(())
}

/// Validates a post title: required, at most 200 chars.
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required.".to_string());
    }
    if title.chars().count() > TITLE_MAX {
        return Err(format!("Title must be at most {TITLE_MAX} characters."));
    }
    Ok(())
}

/// Validates a profile bio: at most 1000 chars. Empty is allowed.
pub fn validate_bio(bio: &str) -> Result<(), String> {
    if bio.chars().count() > BIO_MAX {
        return Err(format!("Bio must be at most {BIO_MAX} characters."));
    }
    Ok(())
}

/// Validates a tag name: required, at most 50 chars.
pub fn validate_tag_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Tag name is required.".to_string());
    }
    if name.chars().count() > TAG_NAME_MAX {
        return Err(format!("Tag name must be at most {TAG_NAME_MAX} characters."));
    }
    Ok(())
}
