// =============================================================================
// Dashboard Error: typed failures at the pipeline / API boundary
// =============================================================================
//
// Exchange clients speak `anyhow::Result`; the refresh pipeline folds those
// into `DashboardError::Fetch` so handlers can map every failure to a status
// code and a short user-facing message.
// =============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the refresh pipeline and the HTTP API.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardError {
    /// Network or exchange API failure. The refresh is aborted.
    Fetch(String),
    /// Too few candles for the configured indicator windows.
    InsufficientData { required: usize, available: usize },
    /// A caller-supplied argument could not be used.
    InvalidParameter(String),
    /// Currency code missing from the exchange-rate table.
    UnknownCurrency(String),
    /// A ratio whose denominator is zero.
    DivisionByZero(String),
}

impl DashboardError {
    /// Short machine-readable code, also stored in the recent-error log.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch_error",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::UnknownCurrency(_) => "unknown_currency",
            Self::DivisionByZero(_) => "division_by_zero",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::InsufficientData { .. } | Self::DivisionByZero(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::UnknownCurrency(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl std::fmt::Display for DashboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "failed to fetch market data: {msg}"),
            Self::InsufficientData {
                required,
                available,
            } => write!(
                f,
                "insufficient data: {available} candles available, {required} required"
            ),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::UnknownCurrency(code) => write!(f, "unknown currency: {code}"),
            Self::DivisionByZero(msg) => write!(f, "division by zero: {msg}"),
        }
    }
}

impl std::error::Error for DashboardError {}

impl From<anyhow::Error> for DashboardError {
    fn from(e: anyhow::Error) -> Self {
        // `{:#}` keeps the whole context chain on one line.
        Self::Fetch(format!("{e:#}"))
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_chain_becomes_fetch_error() {
        let err = anyhow::anyhow!("connection reset").context("GET /api/v3/klines request failed");
        let converted = DashboardError::from(err);
        match converted {
            DashboardError::Fetch(msg) => {
                assert!(msg.contains("GET /api/v3/klines"));
                assert!(msg.contains("connection reset"));
            }
            other => panic!("expected Fetch, got {other:?}"),
        }
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            DashboardError::Fetch("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            DashboardError::InsufficientData {
                required: 50,
                available: 3
            }
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            DashboardError::UnknownCurrency("xyz".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn insufficient_data_message_names_counts() {
        let msg = DashboardError::InsufficientData {
            required: 50,
            available: 12,
        }
        .to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("50"));
    }
}
