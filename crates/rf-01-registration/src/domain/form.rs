//! Registration and login input
//!
//! Forms arrive as submitted. `validate` produces the trimmed values the
//! workflow works with, or a user-facing `UserInput` message.

use crate::error::{RegistrationError, SessionError};
use serde::{Deserialize, Serialize};

/// Sign-up form as submitted by the caller. Missing fields read as blank.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    /// Raw referral code, normalized by the validator.
    pub referral_code: Option<String>,
}

/// Trimmed, checked sign-up input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub referral_code: Option<String>,
}

impl RegistrationForm {
    /// Fill the referral code from a `ref` query parameter.
    ///
    /// An explicit, non-blank body field wins over the query value.
    #[must_use]
    pub fn with_query_ref(mut self, query_ref: Option<&str>) -> Self {
        let body_has_code = self
            .referral_code
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());

        if !body_has_code {
            self.referral_code = query_ref
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned);
        }
        self
    }

    /// Check required fields and the password length.
    pub fn validate(
        &self,
        min_password_len: usize,
    ) -> Result<ValidatedRegistration, RegistrationError> {
        let name = self.name.trim();
        let email = self.email.trim();
        let phone = self.phone.trim();

        if name.is_empty() {
            return Err(RegistrationError::UserInput("Full name is required".into()));
        }
        if email.is_empty() {
            return Err(RegistrationError::UserInput("Email is required".into()));
        }
        if !is_plausible_email(email) {
            return Err(RegistrationError::UserInput(
                "Please enter a valid email address".into(),
            ));
        }
        if phone.is_empty() {
            return Err(RegistrationError::UserInput(
                "Phone number is required".into(),
            ));
        }
        if self.password.chars().count() < min_password_len {
            return Err(RegistrationError::UserInput(format!(
                "Password must be at least {min_password_len} characters"
            )));
        }

        Ok(ValidatedRegistration {
            name: name.to_owned(),
            email: email.to_owned(),
            phone: phone.to_owned(),
            password: self.password.clone(),
            referral_code: self.referral_code.clone(),
        })
    }
}

/// Login form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// Trimmed email, or a user-facing error when either field is blank.
    pub fn validated_email(&self) -> Result<&str, SessionError> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return Err(SessionError::UserInput(
                "Email and password are required".into(),
            ));
        }
        Ok(email)
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}
