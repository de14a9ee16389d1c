use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug pattern is valid"));

pub fn email(value: &str) -> AppResult<String> {
    let value = value.trim().to_lowercase();
    if EMAIL_RE.is_match(&value) {
        Ok(value)
    } else {
        Err(AppError::Validation(format!("{value:?} is not a valid email address")))
    }
}

/// Trimmed, non-empty and at most `max` characters.
pub fn text(field: &str, value: &str, max: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!("{field} must be at most {max} characters")));
    }
    Ok(value.to_string())
}

/// Like [`text`] but blank input means "not provided".
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> AppResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => text(field, v, max).map(Some),
    }
}

pub fn password(value: &str) -> AppResult<()> {
    if value.chars().count() < 8 {
        return Err(AppError::Validation("password must be at least 8 characters".into()));
    }
    Ok(())
}

pub fn positive_amount(field: &str, amount: i64) -> AppResult<i64> {
    if amount > 0 {
        Ok(amount)
    } else {
        Err(AppError::Validation(format!("{field} must be greater than zero")))
    }
}

pub fn slug(value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.len() <= 120 && SLUG_RE.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(AppError::Validation(format!(
            "{value:?} is not a valid slug (lowercase words joined by '-')"
        )))
    }
}
