//! Response codes and request-level errors.
//!
//! Every response, success or failure, is a JSON envelope served with HTTP
//! 200. The `code` field tells clients what happened:
//! - `0` the body was decoded and validated (per-field results inside)
//! - `10000` the request itself was rejected (method, body)
//! - `20000` the server failed to produce a response

use crate::statistics::StatisticsError;
use crate::validation::ValueKind;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Envelope codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    RequestError = 10000,
    InternalError = 20000,
}

impl ErrorCode {
    /// Get the integer code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get the error category for logs
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::Ok => "ok",
            ErrorCode::RequestError => "client_error",
            ErrorCode::InternalError => "server_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// A request rejected before any field was validated.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("method '{0}' is not supported")]
    MethodNotSupported(String),

    #[error("failed to read request body: {0}")]
    BodyUnreadable(String),

    #[error("{0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("request body must be a JSON object, got {0}")]
    NotAnObject(ValueKind),

    #[error("{0}")]
    Internal(String),
}

impl RequestError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RequestError::Internal(_) => ErrorCode::InternalError,
            _ => ErrorCode::RequestError,
        }
    }
}

impl From<StatisticsError> for RequestError {
    fn from(error: StatisticsError) -> Self {
        RequestError::Internal(error.to_string())
    }
}

/// `{"code": ..., "msg": ...}`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub msg: String,
}

impl From<&RequestError> for ErrorEnvelope {
    fn from(error: &RequestError) -> Self {
        Self {
            code: error.code(),
            msg: error.to_string(),
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(ErrorEnvelope::from(&self))).into_response()
    }
}
