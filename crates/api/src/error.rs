//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use fulfillment::FulfillmentError;
use gateway::GatewayError;
use ledger::LedgerError;

/// API-level error type that maps to HTTP responses.
///
/// An already-fulfilled invoice is not represented here: repeat checks are
/// a success outcome and return 200 from the handler.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Purchase flow error.
    Fulfillment(FulfillmentError),
    /// Ledger storage error.
    Ledger(LedgerError),
    /// Catalog storage error.
    Catalog(CatalogError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Ledger(err) => ledger_error_to_response(err),
            ApiError::Catalog(err) => catalog_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    match &err {
        FulfillmentError::ProductUnavailable(_) | FulfillmentError::UnknownInvoice(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        // 503 marks the check as retryable: no state changed.
        FulfillmentError::Gateway(GatewayError::Unavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        FulfillmentError::Gateway(GatewayError::Rejected(_)) => {
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
        FulfillmentError::Ledger(ledger_err) => (ledger_status_code(ledger_err), err.to_string()),
        FulfillmentError::Catalog(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn ledger_error_to_response(err: LedgerError) -> (StatusCode, String) {
    (ledger_status_code(&err), err.to_string())
}

fn ledger_status_code(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::DuplicateInvoice(_) => StatusCode::CONFLICT,
        LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn catalog_error_to_response(err: CatalogError) -> (StatusCode, String) {
    match &err {
        CatalogError::ProductNotFound(_) | CatalogError::CategoryNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        CatalogError::InvalidProduct(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CatalogError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}
