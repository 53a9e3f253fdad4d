use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::{ErrorResponse, SubscriptionTier};
use crate::services::{AppwriteError, PostgresError};

/// Errors surfaced by the storage and directory ports
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Postgres(PostgresError),

    #[error(transparent)]
    Directory(#[from] AppwriteError),
}

impl From<PostgresError> for StoreError {
    fn from(value: PostgresError) -> Self {
        match value {
            PostgresError::UniqueViolation(constraint) => StoreError::Conflict(constraint),
            other => StoreError::Postgres(other),
        }
    }
}

/// Service-level error taxonomy
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    NotFound { kind: &'static str, message: String },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Daily interest limit of {limit} reached for the {tier} plan")]
    RateLimited {
        tier: SubscriptionTier,
        limit: u32,
        used: u64,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Infrastructure failure: {0}")]
    Infrastructure(#[source] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(kind: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound { kind, .. } => kind,
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Conflict(_) => "conflict",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Infrastructure(_) => "infrastructure",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::RateLimited { tier, limit, used } => Some(serde_json::json!({
                "tier": tier,
                "limit": limit,
                "used": used,
            })),
            _ => None,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(what) => AppError::Conflict(what),
            other => AppError::Infrastructure(other),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            AppError::Infrastructure(err) => {
                tracing::error!(error = %err, "infrastructure failure");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message,
            status_code: status.as_u16(),
            details: self.details(),
        })
    }
}
