/// Error response envelope and HTTP mapping for the match API.
///
/// This module provides:
/// - The JSON error shape shared by every operation
/// - A trait mapping domain errors to status codes and error codes
/// - Severity classification driving the log level
///
/// The routing layer itself lives outside this crate; 401 responses for
/// unauthenticated callers are issued there by the session collaborator
/// before an operation is ever invoked.
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard error response format for all API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "match_not_found")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (structured data)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Error classification for logging levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Client errors (4xx), expected during normal operation
    Client,
    /// Server errors (5xx), unexpected and worth investigating
    Server,
    /// Critical errors, data integrity at risk
    Critical,
}

/// Trait for converting domain errors to wire responses with proper logging.
pub trait IntoErrorResponse {
    /// HTTP status code for this error.
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error code string.
    fn error_code(&self) -> &'static str;

    /// Human-readable error message.
    fn error_message(&self) -> String;

    /// Optional structured details.
    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        if let Some(details) = self.error_details() {
            ErrorResponse::with_details(self.error_code(), self.error_message(), details)
        } else {
            ErrorResponse::new(self.error_code(), self.error_message())
        }
    }

    /// Produce the response body and status, logging at the severity level.
    fn into_response_parts(self) -> (StatusCode, ErrorResponse)
    where
        Self: Sized,
    {
        let status = self.status_code();
        let severity = self.severity();
        let response = self.to_error_response();

        match severity {
            ErrorSeverity::Client => {
                tracing::info!(code = %response.error, status = %status, "client error: {}", response.message);
            }
            ErrorSeverity::Server => {
                tracing::error!(code = %response.error, status = %status, "server error: {}", response.message);
            }
            ErrorSeverity::Critical => {
                tracing::error!(code = %response.error, status = %status, "critical error: {}", response.message);
            }
        }

        (status, response)
    }
}
