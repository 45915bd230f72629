//! Application error types.
//!
//! Every failure a request can hit maps to one variant here. Handlers return
//! `AppResult<T>` and the `IntoResponse` impl renders the JSON error envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across all crates.
pub type AppResult<T> = Result<T, AppError>;

/// Application error enumeration.
#[derive(Debug, Error)]
pub enum AppError {
    /// The logical database id is not configured.
    #[error("unknown database: {0}")]
    UnknownDatabase(String),

    /// A connection (or pool) could not be established.
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    /// Query execution failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    /// The requested column is not part of the fetched row set.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// The requested plot kind is not line, bar or scatter.
    #[error("unsupported plot kind: {0}")]
    UnsupportedPlotKind(String),

    /// The table name is not in the introspected table list.
    #[error("table `{0}` is not present in the database")]
    UnknownTable(String),

    /// An operation exceeded its deadline.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Request input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Column values cannot be plotted.
    #[error("invalid plot data: {0}")]
    InvalidPlotData(String),

    /// Drawing or PNG encoding failed.
    #[error("chart rendering failed: {0}")]
    Chart(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UnknownDatabase(_) | AppError::UnknownTable(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ColumnNotFound(_)
            | AppError::UnsupportedPlotKind(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidPlotData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::DatabaseQuery(_)
            | AppError::Chart(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine readable error code carried in the response envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::UnknownDatabase(_) => "UNKNOWN_DATABASE",
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "DATABASE_QUERY_ERROR",
            AppError::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            AppError::UnsupportedPlotKind(_) => "UNSUPPORTED_PLOT_KIND",
            AppError::UnknownTable(_) => "IDENTIFIER_REJECTED",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidPlotData(_) => "INVALID_PLOT_DATA",
            AppError::Chart(_) => "CHART_RENDER_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.error_code(), error = %self, "request rejected");
        }

        let body = ApiResponse::err(self.error_code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
