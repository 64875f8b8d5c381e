//! Error types for Foodgram.
//!
//! Uses thiserror for ergonomic error definitions that integrate
//! with axum's response system. Response bodies follow the REST shapes
//! clients of the API expect: `{"detail": ..}`, `{"errors": ..}` or a
//! map of field name to messages.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum_extra::extract::QueryRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Fold another set of messages into this one.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Auth errors
    #[error("Authentication credentials were not provided.")]
    Unauthenticated,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("Unable to log in with provided credentials.")]
    InvalidCredentials,

    // Resource errors
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid page.")]
    InvalidPage,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// Relation already exists / does not exist (favorites, cart, follows).
    #[error("{0}")]
    Relation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Request body is too large.")]
    PayloadTooLarge,

    // Infrastructure errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found.", what))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            // 401
            Self::Unauthenticated | Self::InvalidToken => StatusCode::UNAUTHORIZED,

            // 403
            Self::Forbidden => StatusCode::FORBIDDEN,

            // 404
            Self::NotFound(_) | Self::InvalidPage => StatusCode::NOT_FOUND,

            // 400
            Self::InvalidCredentials
            | Self::Validation(_)
            | Self::Relation(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,

            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            // 500
            Self::Config(_) | Self::Database(_) | Self::Internal(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Self::Validation(fields) => json!(fields),
            Self::InvalidCredentials => json!({ "non_field_errors": [self.to_string()] }),
            Self::Relation(message) => json!({ "errors": message }),
            Self::Config(_) | Self::Database(_) | Self::Internal(_) | Self::Other(_) => {
                json!({ "detail": "Internal server error." })
            }
            _ => json!({ "detail": self.to_string() }),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, Json(self.body())).into_response()
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::BadRequest(format!("CSV parsing error: {}", err))
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.to_string())
    }
}

// Unparseable path ids are treated like missing objects
impl From<PathRejection> for Error {
    fn from(_: PathRejection) -> Self {
        Self::NotFound("Not found.".to_string())
    }
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::not_found("Recipe").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::Relation("Already added".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_field_error_body() {
        let mut errors = FieldErrors::new();
        errors.add("tags", "This field is required.");
        errors.add("tags", "Tags must be unique.");
        errors.add("name", "This field may not be blank.");

        let body = Error::Validation(errors).body();
        assert_eq!(body["tags"].as_array().unwrap().len(), 2);
        assert_eq!(body["name"][0], "This field may not be blank.");
    }

    #[test]
    fn test_relation_and_credentials_bodies() {
        assert_eq!(
            Error::Relation("Recipe already in favorites.".into()).body(),
            json!({ "errors": "Recipe already in favorites." })
        );
        assert_eq!(
            Error::InvalidCredentials.body()["non_field_errors"][0],
            "Unable to log in with provided credentials."
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let body = Error::Internal("disk on fire".into()).body();
        assert_eq!(body["detail"], "Internal server error.");
    }

    #[test]
    fn test_merge_field_errors() {
        let mut errors = FieldErrors::single("image", "This field is required.");
        errors.merge(FieldErrors::single("image", "Invalid base64 image data."));
        errors.merge(FieldErrors::single("name", "This field may not be blank."));
        assert_eq!(errors.get("image").unwrap().len(), 2);
        assert!(errors.contains("name"));
    }

    #[test]
    fn test_empty_field_errors_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::single("email", "bad").into_result().is_err());
    }
}
