//! Submitted form bodies and their validation.
//!
//! Every field defaults to empty so a missing input shows up as a field
//! error on the re-rendered page instead of an extractor rejection.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::constants::limits::{
    MAX_IMAGE_URL_LEN, MAX_MESSAGE_LEN, MAX_NAME_LEN, MAX_USERNAME_LEN,
};
use crate::models::{Message, MessageDraft, NewUser, ProfileUpdate, User};

/// Field name to error messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Appends another set of errors, keeping this set's messages first.
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        !self.field(field).is_empty()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

fn required<'a>(
    errors: &mut FormErrors,
    field: &'static str,
    value: &'a str,
    max_len: usize,
) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field is required.");
    } else if trimmed.chars().count() > max_len {
        errors.add(field, format!("Must be at most {max_len} characters."));
    }
    trimmed
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

impl UserForm {
    pub fn validate(&self, min_password_length: usize) -> Result<NewUser, FormErrors> {
        let mut errors = FormErrors::default();

        let first_name = required(&mut errors, "first_name", &self.first_name, MAX_NAME_LEN);
        let last_name = required(&mut errors, "last_name", &self.last_name, MAX_NAME_LEN);
        let username = required(&mut errors, "username", &self.username, MAX_USERNAME_LEN);

        if !username.is_empty()
            && !username
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            errors.add(
                "username",
                "Username can only contain letters, numbers, dots, hyphens, and underscores.",
            );
        }

        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        } else if self.password.chars().count() < min_password_length {
            errors.add(
                "password",
                format!("Password must be at least {min_password_length} characters."),
            );
        }

        errors.into_result(|| NewUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            username: username.to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserEditForm {
    pub first_name: String,
    pub last_name: String,
    pub csrf_token: String,
}

impl UserEditForm {
    pub fn validate(&self) -> Result<ProfileUpdate, FormErrors> {
        let mut errors = FormErrors::default();

        let first_name = required(&mut errors, "first_name", &self.first_name, MAX_NAME_LEN);
        let last_name = required(&mut errors, "last_name", &self.last_name, MAX_NAME_LEN);

        errors.into_result(|| ProfileUpdate {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        })
    }
}

impl From<&User> for UserEditForm {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            csrf_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

impl LoginForm {
    /// Returns the trimmed username and the password as typed.
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::default();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", "This field is required.");
        }
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }

        errors.into_result(|| (username.to_string(), self.password.clone()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessageForm {
    pub text: String,
    pub img: String,
    pub csrf_token: String,
}

impl MessageForm {
    pub fn validate(&self) -> Result<MessageDraft, FormErrors> {
        let mut errors = FormErrors::default();

        let text = required(&mut errors, "text", &self.text, MAX_MESSAGE_LEN);

        let img = self.img.trim();
        if !img.is_empty() {
            if !(img.starts_with("http://") || img.starts_with("https://")) {
                errors.add("img", "Image must be an http:// or https:// URL.");
            } else if img.len() > MAX_IMAGE_URL_LEN {
                errors.add("img", "Image URL is too long.");
            }
        }

        errors.into_result(|| MessageDraft {
            text: text.to_string(),
            img: (!img.is_empty()).then(|| img.to_string()),
        })
    }
}

impl From<&Message> for MessageForm {
    fn from(message: &Message) -> Self {
        Self {
            text: message.text.clone(),
            img: message.img.clone().unwrap_or_default(),
            csrf_token: String::new(),
        }
    }
}

/// Body of a delete button: nothing but the form token.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteForm {
    pub csrf_token: String,
}
