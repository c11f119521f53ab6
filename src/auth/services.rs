use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use regex::Regex;
use time::Duration;

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const RESET_TOKEN_LEN: usize = 48;
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases, then rejects anything that does not look like an address.
pub(crate) fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    Ok(email)
}

pub(crate) fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password too short"));
    }
    Ok(())
}

pub(crate) fn generate_reset_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}
