use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

use crate::services::ledger::{LedgerOutcome, StepReport};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Per-step report when a ledger operation only partly completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepReport>>,
    /// Composite messages, one per ledger step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

/// Failures of the stock ledger.
///
/// The write failures are distinct because the aggregate and the log are two
/// separate writes; each carries the outcome of every step so the caller knows
/// which half landed.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Device aggregate write failed ({}): {source}", .outcome.summary())]
    AggregateWriteFailed {
        outcome: LedgerOutcome,
        #[source]
        source: DbErr,
    },

    #[error("Device log write failed ({}): {source}", .outcome.summary())]
    LogWriteFailed {
        outcome: LedgerOutcome,
        #[source]
        source: DbErr,
    },

    #[error("Cascade deletion failed ({}): {source}", .outcome.summary())]
    CascadeDeleteFailed {
        outcome: LedgerOutcome,
        #[source]
        source: DbErr,
    },

    /// A read failed; nothing was written.
    #[error("Store read failed: {0}")]
    StoreRead(#[source] DbErr),
}

impl LedgerError {
    /// Step report of a partially applied operation, if any write was attempted.
    pub fn outcome(&self) -> Option<&LedgerOutcome> {
        match self {
            Self::AggregateWriteFailed { outcome, .. }
            | Self::LogWriteFailed { outcome, .. }
            | Self::CascadeDeleteFailed { outcome, .. } => Some(outcome),
            Self::InvalidRequest(_) | Self::NotFound(_) | Self::StoreRead(_) => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AggregateWriteFailed { .. }
            | Self::LogWriteFailed { .. }
            | Self::CascadeDeleteFailed { .. }
            | Self::StoreRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to API callers. Store errors are not echoed.
    pub fn response_message(&self) -> String {
        match self {
            Self::InvalidRequest(_) | Self::NotFound(_) => self.to_string(),
            Self::AggregateWriteFailed { outcome, .. } => {
                format!("Device aggregate write failed: {}", outcome.summary())
            }
            Self::LogWriteFailed { outcome, .. } => {
                format!("Device log write failed: {}", outcome.summary())
            }
            Self::CascadeDeleteFailed { outcome, .. } => {
                format!("Cascade deletion failed: {}", outcome.summary())
            }
            Self::StoreRead(_) => "Database error".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for LedgerError {
    fn from(err: validator::ValidationErrors) -> Self {
        LedgerError::InvalidRequest(err.to_string())
    }
}

/// Error returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Ledger(err) => err.status_code(),
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Store errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::Forbidden(_) => self.to_string(),
            Self::Ledger(err) => err.response_message(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::DatabaseError(err) => tracing::error!(error = %err, "database error"),
            Self::Ledger(err) if err.outcome().is_some() => {
                tracing::error!(error = %err, "ledger operation partially applied")
            }
            _ => {}
        }

        let outcome = match &self {
            Self::Ledger(err) => err.outcome(),
            _ => None,
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            steps: outcome.map(|o| o.steps().to_vec()),
            messages: outcome.map(LedgerOutcome::messages),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
