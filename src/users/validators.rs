// src/users/validators.rs

use super::models::{CreateUserRequest, UpdateUserRequest};
use crate::common::{ValidationResult, Validator};

const MAX_EMAIL_LENGTH: usize = 255;
const MAX_FULL_NAME_LENGTH: usize = 255;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;

fn check_email(result: &mut ValidationResult, email: &str) {
    let email = email.trim();
    result.check_text("email", email, MAX_EMAIL_LENGTH);

    let well_formed = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'))
        .unwrap_or(false);
    if !email.is_empty() && !well_formed {
        result.add_error("email", "must be a valid email address");
    }
}

fn check_username(result: &mut ValidationResult, username: &str) {
    let username = username.trim();
    let len = username.chars().count();

    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        result.add_error(
            "username",
            &format!(
                "must be between {} and {} characters",
                MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
            ),
        );
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        result.add_error(
            "username",
            "may only contain letters, digits, '_', '-' and '.'",
        );
    }
}

fn check_full_name(result: &mut ValidationResult, full_name: Option<&str>) {
    if let Some(name) = full_name {
        if name.chars().count() > MAX_FULL_NAME_LENGTH {
            result.add_error(
                "full_name",
                &format!("must be at most {} characters", MAX_FULL_NAME_LENGTH),
            );
        }
    }
}

pub struct UserValidator;

impl Validator<CreateUserRequest> for UserValidator {
    fn validate(&self, data: &CreateUserRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        check_email(&mut result, &data.email);
        check_username(&mut result, &data.username);
        check_full_name(&mut result, data.full_name.as_deref());
        result
    }
}

impl Validator<UpdateUserRequest> for UserValidator {
    fn validate(&self, data: &UpdateUserRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.is_empty() {
            result.add_error("body", "at least one field must be provided");
            return result;
        }
        if let Some(email) = &data.email {
            check_email(&mut result, email);
        }
        if let Some(username) = &data.username {
            check_username(&mut result, username);
        }
        check_full_name(&mut result, data.full_name.as_deref());
        result
    }
}
