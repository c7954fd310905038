use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::users::store::StoreError;

/// Domain errors returned by the service layer.
///
/// Services return these as values; the translation to transport status
/// codes happens only here, in `into_response`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// One variant and one message for both unknown-email and
    /// wrong-password; login responses never reveal which accounts exist.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Not authorized to access this resource")]
    Forbidden,

    #[error("Inactive user")]
    InactiveUser,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Email already registered")]
    DuplicateKey,

    /// The insert landed but the record could not be read back; the caller
    /// must assume it may exist.
    #[error("Creation succeeded but retrieval failed")]
    RetrievalFailed,

    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable error kind, part of the response contract.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::InactiveUser => "inactive_user",
            AppError::NotFound(_) => "not_found",
            AppError::DuplicateKey => "duplicate_key",
            AppError::RetrievalFailed => "retrieval_failed",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::InactiveUser => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateKey => StatusCode::BAD_REQUEST,
            AppError::RetrievalFailed | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), detail = ?self, "request failed");
        }
        let body = ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AppError::DuplicateKey,
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
        }
    }
}
