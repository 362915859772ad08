use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));
static FIELD_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid regex"));

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Slug must contain only lowercase letters, numbers and hyphens")]
    InvalidSlug,
    #[error(
        "Field key must start with a lowercase letter or underscore and contain only lowercase letters, numbers and underscores"
    )]
    InvalidFieldKey,
    #[error("{0} cannot be empty")]
    Blank(&'static str),
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters")]
    PasswordLength,
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG.is_match(slug) {
        Ok(())
    } else {
        Err(ValidationError::InvalidSlug)
    }
}

pub fn validate_field_key(key: &str) -> Result<(), ValidationError> {
    if FIELD_KEY.is_match(key) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFieldKey)
    }
}

pub fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Blank(field))
    } else {
        Ok(())
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') || email.contains(' ') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::PasswordLength)
    }
}
