//! Error types for the flagd-admin configuration store.
//!
//! Every failure of the store, its backends, the validator and the codec is
//! reported as a [`StoreError`] carrying an [`ErrorType`] discriminant, so a
//! boundary layer (HTTP, CLI) can map each kind to its own status and code.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

use crate::engine::ValidationError;

/// The kind of failure that occurred.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Malformed document URI, rejected before any backend access
    InvalidUri,
    /// No registered backend claims the URI's scheme
    UnsupportedScheme,
    /// The backend has no content at the addressed location
    NotFound,
    /// The location exists but may not be read or written
    AccessDenied,
    /// Any other I/O fault while reading or writing
    AccessError,
    /// Candidate content was rejected by the validator
    ContentValidation,
    /// A stored document could not be parsed while editing it
    MalformedDocument,
}

impl ErrorType {
    /// Stable machine-readable code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorType::InvalidUri => "INVALID_ARGUMENT",
            ErrorType::UnsupportedScheme => "UNSUPPORTED_SOURCE_URI",
            ErrorType::NotFound => "SOURCE_CONTENT_NOT_FOUND",
            ErrorType::AccessDenied | ErrorType::AccessError => "SOURCE_CONTENT_ACCESS_ERROR",
            ErrorType::ContentValidation => "CONTENT_VALIDATION_ERROR",
            ErrorType::MalformedDocument => "MALFORMED_DOCUMENT",
        }
    }
}

/// Represents an error raised by the configuration store.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("{error_type:?}: {message}")]
pub struct StoreError {
    /// Human-readable error message
    pub message: String,
    /// Type classification of the error
    pub error_type: ErrorType,
    /// Per-location validation failures, only set for content validation errors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ValidationError>,
}

impl StoreError {
    fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type,
            details: Vec::new(),
        }
    }

    /// Creates a new invalid URI error.
    ///
    /// # Example
    /// ```
    /// use flagd_admin::error::{ErrorType, StoreError};
    /// let err = StoreError::invalid_uri("missing scheme separator");
    /// assert_eq!(err.error_type, ErrorType::InvalidUri);
    /// ```
    pub fn invalid_uri(message: impl Into<String>) -> Self {
        Self::new(ErrorType::InvalidUri, message)
    }

    /// Creates a new unsupported scheme error.
    ///
    /// # Arguments
    /// * `scheme` - The scheme no backend claimed
    pub fn unsupported_scheme(scheme: &str) -> Self {
        Self::new(
            ErrorType::UnsupportedScheme,
            format!("Unsupported URI scheme: {}", scheme),
        )
    }

    /// Creates a new not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorType::NotFound, message)
    }

    /// Creates a new access denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorType::AccessDenied, message)
    }

    /// Creates a new generic access error.
    pub fn access_error(message: impl Into<String>) -> Self {
        Self::new(ErrorType::AccessError, message)
    }

    /// Creates a new content validation error.
    pub fn content_validation(message: impl Into<String>) -> Self {
        Self::new(ErrorType::ContentValidation, message)
    }

    /// Attaches per-location validation failures.
    pub fn with_details(mut self, details: Vec<ValidationError>) -> Self {
        self.details = details;
        self
    }

    /// Creates a new malformed document error.
    pub fn malformed_document(message: impl Into<String>) -> Self {
        Self::new(ErrorType::MalformedDocument, message)
    }

    /// Maps an I/O failure on `location` to the matching error kind.
    ///
    /// `action` is used in the message, e.g. "reading" or "writing".
    pub fn from_io(err: &io::Error, action: &str, location: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found(format!("File not found: {}", location)),
            io::ErrorKind::PermissionDenied => Self::access_denied(format!(
                "Permission denied {} file: {}",
                action, location
            )),
            _ => Self::access_error(format!("Error {} file: {}: {}", action, location, err)),
        }
    }

    /// Machine-readable code of this error.
    pub fn code(&self) -> &'static str {
        self.error_type.code()
    }

    /// Converts the error to a JSON string.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error_type":{},"message":"{}"}}"#,
                serde_json::to_string(&self.error_type).unwrap_or_default(),
                self.message
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = StoreError::not_found("File not found: /tmp/x.json");
        assert_eq!(err.error_type, ErrorType::NotFound);
        assert_eq!(err.message, "File not found: /tmp/x.json");
        assert!(err.details.is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::unsupported_scheme("s3");
        let display = format!("{}", err);
        assert!(display.contains("UnsupportedScheme"));
        assert!(display.contains("s3"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(StoreError::invalid_uri("x").code(), "INVALID_ARGUMENT");
        assert_eq!(StoreError::access_denied("x").code(), "SOURCE_CONTENT_ACCESS_ERROR");
        assert_eq!(StoreError::access_error("x").code(), "SOURCE_CONTENT_ACCESS_ERROR");
        assert_eq!(
            StoreError::content_validation("x").code(),
            "CONTENT_VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_io_mapping() {
        let not_found = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(
            StoreError::from_io(&not_found, "reading", "a.json").error_type,
            ErrorType::NotFound
        );

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            StoreError::from_io(&denied, "writing", "a.json").error_type,
            ErrorType::AccessDenied
        );

        let other = io::Error::other("disk on fire");
        let err = StoreError::from_io(&other, "reading", "a.json");
        assert_eq!(err.error_type, ErrorType::AccessError);
        assert!(err.message.contains("disk on fire"));
    }

    #[test]
    fn test_error_to_json() {
        let err = StoreError::content_validation("bad")
            .with_details(vec![ValidationError::new("/flags", "not an object")]);
        let json = err.to_json_string();
        assert!(json.contains("content_validation"));
        assert!(json.contains("not an object"));

        let plain = StoreError::not_found("gone").to_json_string();
        assert!(!plain.contains("details"));
    }
}
