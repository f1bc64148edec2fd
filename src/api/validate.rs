//! Input validation rules shared by the auth and user endpoints.

use super::error::ApiError;

const PASSWORD_SPECIALS: &str = "@$!%*?&_";

/// Username: at least 3 characters, letters and numbers only.
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < 3 {
        return Err(ApiError::bad_request(
            "Username must be at least 3 characters long",
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::bad_request(
            "Username can only contain letters and numbers",
        ));
    }
    Ok(())
}

/// Minimal shape check: one `@` with a dotted domain, no whitespace.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request("Must be a valid email"));
    }
    Ok(())
}

/// Password policy: 8+ characters with upper, lower, digit, and special
/// character classes, and no spaces.
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::bad_request(
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ApiError::bad_request(
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "Password must contain at least one number",
        ));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(ApiError::bad_request(
            "Password must contain at least one special character (@, $, !, %, *, ?, &, _)",
        ));
    }
    if password.contains(char::is_whitespace) {
        return Err(ApiError::bad_request("Password must not contain spaces"));
    }
    Ok(())
}

/// Tag name: 2-30 characters, alphanumeric plus dashes and underscores.
pub fn validate_tag_name(name: &str) -> Result<(), ApiError> {
    if !(2..=30).contains(&name.len()) {
        return Err(ApiError::bad_request(
            "Tag name must be between 2 and 30 characters",
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::bad_request(
            "Tag name must be alphanumeric and may include dashes or underscores",
        ));
    }
    Ok(())
}

/// Post title: at least 3 characters.
pub fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.len() < 3 {
        return Err(ApiError::bad_request(
            "Title must be at least 3 characters long",
        ));
    }
    Ok(())
}

/// Post content: at least 10 characters.
pub fn validate_post_content(content: &str) -> Result<(), ApiError> {
    if content.len() < 10 {
        return Err(ApiError::bad_request(
            "Content must be at least 10 characters long",
        ));
    }
    Ok(())
}
