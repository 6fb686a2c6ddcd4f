/// Input validators for signup and login payloads
///
/// Every rule is checked and every offending field reported, so a client can
/// fix all of its input in one round trip.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

pub const MIN_USERNAME_LENGTH: usize = 4;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MIN_NICKNAME_LENGTH: usize = 2;
pub const MAX_NICKNAME_LENGTH: usize = 50;

lazy_static! {
    // Letters, digits and @/./+/-/_ only
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
}

fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
    errors: &mut Vec<ValidationError>,
) -> bool {
    let length = value.chars().count();
    if length == 0 {
        errors.push(ValidationError::EmptyField(field.to_string()));
        false
    } else if length < min {
        errors.push(ValidationError::TooShort(field.to_string(), min));
        false
    } else if length > max {
        errors.push(ValidationError::TooLong(field.to_string(), max));
        false
    } else {
        true
    }
}

/// Validates a signup payload, collecting one error per offending field.
pub fn validate_signup(
    username: &str,
    password: &str,
    nickname: &str,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if check_length("username", username, MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH, &mut errors)
        && !USERNAME_REGEX.is_match(username)
    {
        errors.push(ValidationError::InvalidFormat("username".to_string()));
    }
    check_length("password", password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH, &mut errors);
    check_length("nickname", nickname, MIN_NICKNAME_LENGTH, MAX_NICKNAME_LENGTH, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Login only requires both fields to be present.
pub fn validate_login(username: &str, password: &str) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push(ValidationError::EmptyField("username".to_string()));
    }
    if password.is_empty() {
        errors.push(ValidationError::EmptyField("password".to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
