//! Field validators shared by registration, recipe input and the data loaders.
//!
//! Each validator records messages into a [`FieldErrors`] so a request can
//! report every invalid field at once.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FieldErrors;

pub const MAX_NAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Upper bound for cooking times and ingredient amounts.
pub const MAX_SMALL_AMOUNT: i64 = 32_767;

/// Usernames that would shadow fixed routes under `/api/users/`.
const RESERVED_USERNAMES: &[&str] = &["me", "subscriptions", "set_password"];

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

/// Required, non-blank text no longer than `max` characters.
///
/// Returns the trimmed value when valid.
pub fn required_text<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&'a str>,
    max: usize,
) -> Option<&'a str> {
    let Some(value) = value else {
        errors.add(field, "This field is required.");
        return None;
    };
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "This field may not be blank.");
        return None;
    }
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
        return None;
    }
    Some(value)
}

pub fn username(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let value = required_text(errors, "username", value, MAX_NAME_LENGTH)?;
    if !USERNAME_RE.is_match(value) {
        errors.add(
            "username",
            "Enter a valid username. It may contain only letters, digits and @/./+/-/_ characters.",
        );
        return None;
    }
    if RESERVED_USERNAMES.contains(&value.to_lowercase().as_str()) {
        errors.add("username", format!("Username '{}' is reserved.", value));
        return None;
    }
    Some(value.to_string())
}

pub fn email(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let value = required_text(errors, "email", value, MAX_EMAIL_LENGTH)?;
    if !EMAIL_RE.is_match(value) {
        errors.add("email", "Enter a valid email address.");
        return None;
    }
    Some(value.to_lowercase())
}

/// Password strength rules applied on registration and password change.
pub fn password(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, "This field is required.");
        return None;
    };
    let before = errors.get(field).map(|m| m.len()).unwrap_or(0);

    if value.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            field,
            format!(
                "This password is too short. It must contain at least {} characters.",
                MIN_PASSWORD_LENGTH
            ),
        );
    }
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }

    let after = errors.get(field).map(|m| m.len()).unwrap_or(0);
    (after == before).then(|| value.to_string())
}

pub fn tag_color(errors: &mut FieldErrors, value: &str) -> Option<String> {
    if !COLOR_RE.is_match(value) {
        errors.add("color", "Enter a valid HEX color, e.g. #E26C2D.");
        return None;
    }
    Some(value.to_uppercase())
}

pub fn slug(errors: &mut FieldErrors, value: &str) -> Option<String> {
    if value.chars().count() > MAX_TITLE_LENGTH || !SLUG_RE.is_match(value) {
        errors.add(
            "slug",
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
        );
        return None;
    }
    Some(value.to_string())
}
