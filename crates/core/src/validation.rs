//! Request schemas for the authentication and settings flows.
//!
//! Each schema derives [`Validate`]; handlers call [`check`] to turn a failed
//! validation into a [`CoreError::Validation`].

use std::borrow::Cow;

use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::CoreError;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpInput {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// A TOTP code submitted for a specific factor.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TwoFactorInput {
    #[validate(length(min = 1, message = "Factor ID is required"))]
    pub factor_id: String,
    #[validate(
        length(equal = 6, message = "Code must be 6 digits"),
        custom(function = "validate_digits")
    )]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordInput {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordInput {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateEmailInput {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePasswordInput {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

fn validate_digits(code: &str) -> Result<(), ValidationError> {
    if code.chars().all(|c| c.is_ascii_digit()) {
        return Ok(());
    }
    let mut err = ValidationError::new("digits");
    err.message = Some(Cow::Borrowed("Code must contain only digits"));
    Err(err)
}

/// Validate `input`, mapping failures to [`CoreError::Validation`].
pub fn check<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(summarize(&errors)))
}

/// Collapse validation errors into one message.
///
/// Fields are reported in name order so the text is stable; within a field
/// the rules keep their declaration order.
pub fn summarize(errors: &ValidationErrors) -> String {
    let mut fields: Vec<(String, Vec<String>)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid ({})", e.code))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(_, messages)| messages)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const MSG_EMAIL: &str = "Please enter a valid email address";
    const MSG_PASSWORD_LENGTH: &str = "Password must be at least 8 characters";
    const MSG_PASSWORDS_MISMATCH: &str = "Passwords don't match";

    fn message(err: CoreError) -> String {
        match err {
            CoreError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_sign_up_passes() {
        let input = SignUpInput {
            email: "ada@example.com".into(),
            password: "correct-horse".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        assert!(check(&input).is_ok());
    }

    #[test]
    fn sign_up_reports_every_failing_field_in_name_order() {
        let input = SignUpInput {
            email: "not-an-email".into(),
            password: "short".into(),
            first_name: String::new(),
            last_name: "Lovelace".into(),
        };
        assert_eq!(
            message(check(&input).unwrap_err()),
            format!("{MSG_EMAIL}; First name is required; {MSG_PASSWORD_LENGTH}")
        );
    }

    #[test]
    fn login_requires_password() {
        let input = LoginInput {
            email: "ada@example.com".into(),
            password: String::new(),
        };
        assert_eq!(message(check(&input).unwrap_err()), "Password is required");
    }

    #[test]
    fn otp_code_must_be_six_digits() {
        let ok = TwoFactorInput {
            factor_id: "f-1".into(),
            code: "123456".into(),
        };
        assert!(check(&ok).is_ok());

        let short = TwoFactorInput {
            factor_id: "f-1".into(),
            code: "12345".into(),
        };
        assert_eq!(message(check(&short).unwrap_err()), "Code must be 6 digits");

        let letters = TwoFactorInput {
            factor_id: "f-1".into(),
            code: "12a456".into(),
        };
        assert_eq!(
            message(check(&letters).unwrap_err()),
            "Code must contain only digits"
        );
    }

    #[test]
    fn otp_requires_factor() {
        let input = TwoFactorInput {
            factor_id: String::new(),
            code: "123456".into(),
        };
        assert_matches!(check(&input), Err(CoreError::Validation(_)));
    }

    #[test]
    fn reset_password_must_match() {
        let input = ResetPasswordInput {
            password: "long-enough".into(),
            confirm_password: "different-one".into(),
        };
        assert_eq!(message(check(&input).unwrap_err()), MSG_PASSWORDS_MISMATCH);
    }

    #[test]
    fn update_password_checks_length_and_match() {
        let input = UpdatePasswordInput {
            current_password: "old".into(),
            new_password: "short".into(),
            confirm_password: "short".into(),
        };
        assert_eq!(message(check(&input).unwrap_err()), MSG_PASSWORD_LENGTH);

        let input = UpdatePasswordInput {
            current_password: "old".into(),
            new_password: "long-enough".into(),
            confirm_password: "long-enougH".into(),
        };
        assert_eq!(message(check(&input).unwrap_err()), MSG_PASSWORDS_MISMATCH);
    }

    #[test]
    fn profile_and_email_schemas() {
        let profile = UpdateProfileInput {
            first_name: "Grace".into(),
            last_name: String::new(),
        };
        assert_eq!(message(check(&profile).unwrap_err()), "Last name is required");

        let email = UpdateEmailInput {
            email: "grace@".into(),
        };
        assert_eq!(message(check(&email).unwrap_err()), MSG_EMAIL);

        let forgot = ForgotPasswordInput {
            email: "grace@example.com".into(),
        };
        assert!(check(&forgot).is_ok());
    }
}
