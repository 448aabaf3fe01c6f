//! Request bodies and their field rules.
//!
//! Failures are collected per field and reported together, sorted by field
//! name: `email: must be a valid email address; password: cannot be blank`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use axum::Json;
use axum::extract::{FromRequest, Request};
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::service::ServiceError;

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("static regex is valid")
});

const BLANK: &str = "cannot be blank";
const WHITESPACE: &str = "cannot contain whitespaces";

/// Field errors for one request.
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    /// Record the first failure for `field`.
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    fn required(&mut self, field: &'static str, value: &str) -> bool {
        if value.is_empty() {
            self.add(field, BLANK);
            return false;
        }
        true
    }

    fn length(&mut self, field: &'static str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            self.add(field, format!("the length must be between {min} and {max}"));
        }
    }

    fn email(&mut self, field: &'static str, value: &str) {
        if self.required(field, value) && !EMAIL_RE.is_match(value) {
            self.add(field, "must be a valid email address");
        }
    }

    fn no_whitespace(&mut self, field: &'static str, value: &str) {
        if value.chars().any(char::is_whitespace) {
            self.add(field, WHITESPACE);
        }
    }

    fn password(&mut self, field: &'static str, value: &str) {
        if self.required(field, value) {
            self.length(field, value, 8, 32);
            self.no_whitespace(field, value);
        }
    }

    fn finish(self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            return Ok(());
        }
        let message = self
            .0
            .into_iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ServiceError::Validation(message))
    }
}

/// A request body that checks its own fields.
pub trait Validate {
    /// Normalize in place, then check every field.
    fn validate(&mut self) -> Result<(), ServiceError>;
}

/// JSON body extractor that rejects with the response envelope and runs
/// [`Validate`] before the handler sees the value.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ServiceError::Validation(e.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&mut self) -> Result<(), ServiceError> {
        self.name = self.name.trim().to_string();

        let mut errors = FieldErrors::default();
        if errors.required("name", &self.name) {
            errors.length("name", &self.name, 3, 64);
        }
        errors.email("email", &self.email);
        errors.password("password", &self.password);
        errors.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&mut self) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::default();
        errors.email("email", &self.email);
        errors.password("password", &self.password);
        errors.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub token: String,
}

impl Validate for RefreshRequest {
    fn validate(&mut self) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::default();
        if errors.required("token", &self.token) {
            errors.no_whitespace("token", &self.token);
        }
        errors.finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NoteRequest {
    pub title: String,
    pub content: String,
}

impl Validate for NoteRequest {
    fn validate(&mut self) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::default();
        errors.required("title", &self.title);
        errors.required("content", &self.content);
        errors.finish()
    }
}

/// Parse the `page` query parameter. Absent means page 0.
pub fn parse_page(raw: Option<&str>) -> Result<u32, ServiceError> {
    match raw {
        None => Ok(0),
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| ServiceError::Validation(format!("invalid page: {raw}"))),
    }
}

/// Note IDs are UUIDs; anything else is rejected before any lookup.
pub fn check_note_id(id: &str) -> Result<(), ServiceError> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ServiceError::Validation(format!("invalid id: {id}")))
}
