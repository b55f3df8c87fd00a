use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, FieldError};
use crate::users::dto::{CreateUserRequest, UpdateUserRequest};
use crate::users::repo_types::{NewUser, UserUpdate};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trim and lowercase the domain part. The local part is kept as typed.
pub(crate) fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn check_email(raw: &str, errors: &mut Vec<FieldError>) -> String {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "invalid email address"));
    }
    email
}

fn check_username(username: &str, errors: &mut Vec<FieldError>) {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        errors.push(FieldError::new(
            "username",
            format!("must be between {USERNAME_MIN} and {USERNAME_MAX} characters"),
        ));
    }
}

fn check_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < PASSWORD_MIN {
        errors.push(FieldError::new(
            "password",
            format!("must be at least {PASSWORD_MIN} characters"),
        ));
    }
}

pub fn validate_create(req: CreateUserRequest) -> Result<NewUser, ApiError> {
    let mut errors = Vec::new();
    let email = check_email(&req.email, &mut errors);
    check_username(&req.username, &mut errors);
    check_password(&req.password, &mut errors);

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(NewUser {
        email,
        username: req.username,
        full_name: req.full_name,
        password: req.password,
    })
}

pub fn validate_update(req: UpdateUserRequest) -> Result<UserUpdate, ApiError> {
    let mut errors = Vec::new();
    let email = req.email.map(|e| check_email(&e, &mut errors));
    if let Some(username) = &req.username {
        check_username(username, &mut errors);
    }
    if let Some(password) = &req.password {
        check_password(password, &mut errors);
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(UserUpdate {
        email,
        username: req.username,
        full_name: req.full_name,
        password: req.password,
    })
}
