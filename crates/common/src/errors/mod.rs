//! Error types for the Rollcall backend
//!
//! Provides:
//! - Distinct error types for authentication, validation, and the
//!   attendance business rules
//! - HTTP status code mapping
//! - Structured error responses with stable message strings

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidCredentials,
    InvalidToken,
    ExpiredToken,

    // Authorization errors (3xxx)
    Forbidden,
    RoleMismatch,
    NotEligible,

    // Resource errors (4xxx)
    NotFound,
    SessionNotFound,
    StudentNotFound,
    TeacherNotFound,

    // Conflict errors (5xxx)
    Duplicate,

    // Attendance rule rejections (6xxx)
    InvalidSessionCode,
    FaceNotRegistered,
    AlreadyMarked,
    NoFaceDetected,
    MultipleFacesDetected,
    FaceVerificationFailed,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    FaceEngineError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    ImageDecodeError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidCredentials => 2002,
            ErrorCode::InvalidToken => 2003,
            ErrorCode::ExpiredToken => 2004,

            // Authz (3xxx)
            ErrorCode::Forbidden => 3001,
            ErrorCode::RoleMismatch => 3002,
            ErrorCode::NotEligible => 3003,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::SessionNotFound => 4002,
            ErrorCode::StudentNotFound => 4003,
            ErrorCode::TeacherNotFound => 4004,

            // Conflicts (5xxx)
            ErrorCode::Duplicate => 5001,

            // Attendance rules (6xxx)
            ErrorCode::InvalidSessionCode => 6001,
            ErrorCode::FaceNotRegistered => 6002,
            ErrorCode::AlreadyMarked => 6003,
            ErrorCode::NoFaceDetected => 6004,
            ErrorCode::MultipleFacesDetected => 6005,
            ErrorCode::FaceVerificationFailed => 6006,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::FaceEngineError => 8001,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::ImageDecodeError => 9004,
        }
    }
}

/// Application error types
///
/// The attendance-rule variants carry fixed display strings; those strings
/// are part of the API contract and must not change between releases.
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token is invalid")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("You are not eligible for this subject")]
    NotEligible,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error("Student not found")]
    StudentNotFound,

    #[error("Teacher not found")]
    TeacherNotFound,

    // Conflict errors
    #[error("{message}")]
    Duplicate { message: String },

    // Attendance rule rejections
    #[error("Invalid code or session expired")]
    InvalidSessionCode,

    #[error("Face not registered")]
    FaceNotRegistered,

    #[error("Attendance already marked")]
    AlreadyMarked,

    #[error("No face detected")]
    NoFaceDetected,

    #[error("Multiple faces detected. Please ensure only one face is visible")]
    MultipleFacesDetected,

    #[error("Face verification failed")]
    FaceVerificationFailed,

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Face engine error: {message}")]
    FaceEngine { message: String },

    // Internal errors
    #[error("Error processing image: {message}")]
    ImageDecode { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::NotEligible => ErrorCode::NotEligible,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            AppError::StudentNotFound => ErrorCode::StudentNotFound,
            AppError::TeacherNotFound => ErrorCode::TeacherNotFound,
            AppError::Duplicate { .. } => ErrorCode::Duplicate,
            AppError::InvalidSessionCode => ErrorCode::InvalidSessionCode,
            AppError::FaceNotRegistered => ErrorCode::FaceNotRegistered,
            AppError::AlreadyMarked => ErrorCode::AlreadyMarked,
            AppError::NoFaceDetected => ErrorCode::NoFaceDetected,
            AppError::MultipleFacesDetected => ErrorCode::MultipleFacesDetected,
            AppError::FaceVerificationFailed => ErrorCode::FaceVerificationFailed,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::FaceEngine { .. } => ErrorCode::FaceEngineError,
            AppError::ImageDecode { .. } => ErrorCode::ImageDecodeError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. }
            | AppError::Duplicate { .. }
            | AppError::InvalidSessionCode
            | AppError::FaceNotRegistered
            | AppError::AlreadyMarked
            | AppError::NoFaceDetected
            | AppError::MultipleFacesDetected
            | AppError::FaceVerificationFailed => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. }
            | AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::Forbidden { .. } | AppError::NotEligible => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::SessionNotFound { .. }
            | AppError::StudentNotFound
            | AppError::TeacherNotFound => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::ImageDecode { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::FaceEngine { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::SessionNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::SessionNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_attendance_rejections_are_bad_requests() {
        for err in [
            AppError::InvalidSessionCode,
            AppError::FaceNotRegistered,
            AppError::AlreadyMarked,
            AppError::NoFaceDetected,
            AppError::MultipleFacesDetected,
            AppError::FaceVerificationFailed,
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn test_class_eligibility_is_forbidden() {
        let err = AppError::NotEligible;
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "You are not eligible for this subject");
    }

    #[test]
    fn test_stable_rejection_messages() {
        assert_eq!(
            AppError::InvalidSessionCode.to_string(),
            "Invalid code or session expired"
        );
        assert_eq!(AppError::FaceNotRegistered.to_string(), "Face not registered");
        assert_eq!(AppError::AlreadyMarked.to_string(), "Attendance already marked");
        assert_eq!(AppError::NoFaceDetected.to_string(), "No face detected");
        assert_eq!(
            AppError::MultipleFacesDetected.to_string(),
            "Multiple faces detected. Please ensure only one face is visible"
        );
        assert_eq!(
            AppError::FaceVerificationFailed.to_string(),
            "Face verification failed"
        );
    }

    #[test]
    fn test_server_error() {
        let err = AppError::ImageDecode {
            message: "truncated PNG".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
