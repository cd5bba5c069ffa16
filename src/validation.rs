//! Request body rules, checked before any handler logic touches the input.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

/// Unwraps a JSON body, turning axum's rejection into a validation error.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Same as [`body`] for path parameters.
pub fn path<T>(params: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    params
        .map(|Path(v)| v)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Same as [`body`] for query strings.
pub fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(v)| v)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

pub const MIN_PASSWORD_LEN: usize = 6;
pub const NAME_LEN: (usize, usize) = (3, 30);
pub const TITLE_LEN: (usize, usize) = (3, 100);
pub const MAX_DESCRIPTION_LEN: usize = 500;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn email(value: &str) -> Result<(), AppError> {
    if !is_valid_email(value) {
        return Err(AppError::Validation("\"email\" must be a valid email".into()));
    }
    Ok(())
}

pub fn password(field: &str, value: &str) -> Result<(), AppError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "\"{field}\" length must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

pub fn length(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min {
        return Err(AppError::Validation(format!(
            "\"{field}\" length must be at least {min} characters long"
        )));
    }
    if len > max {
        return Err(AppError::Validation(format!(
            "\"{field}\" length must be less than or equal to {max} characters long"
        )));
    }
    Ok(())
}

pub fn required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("\"{field}\" is not allowed to be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("jane@example.com"));
        assert!(email("a.b+tag@sub.example.org").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("jane"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("ja ne@example.com"));
        assert!(matches!(email(""), Err(AppError::Validation(_))));
    }

    #[test]
    fn password_minimum_length() {
        assert!(password("password", "12345").is_err());
        assert!(password("password", "123456").is_ok());
    }

    #[test]
    fn length_bounds_are_inclusive() {
        assert!(length("firstName", "Al", NAME_LEN).is_err());
        assert!(length("firstName", "Ada", NAME_LEN).is_ok());
        assert!(length("firstName", &"x".repeat(30), NAME_LEN).is_ok());
        assert!(length("firstName", &"x".repeat(31), NAME_LEN).is_err());
    }
}
