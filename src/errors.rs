use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

use crate::clients::{LedgerError, MetadataError};
use crate::store::persist::StoreError;
use crate::wizard::FieldErrors;

/// Where the client should go when a requested poll does not exist.
pub const NOT_FOUND_REDIRECT: &str = "/dashboard";

#[derive(Debug)]
pub enum AppError {
    /// Form input failed validation; keyed by field.
    Validation(FieldErrors),
    /// Request is well formed but a business rule refuses it.
    Rejected(String),
    NotConnected,
    NotFound(String),
    Metadata(MetadataError),
    Ledger(LedgerError),
    Store(StoreError),
    Session(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(errors) => write!(f, "Validation failed on {} field(s)", errors.len()),
            AppError::Rejected(e) => write!(f, "{e}"),
            AppError::NotConnected => write!(f, "Wallet not connected"),
            AppError::NotFound(what) => write!(f, "{what} not found"),
            AppError::Metadata(e) => write!(f, "Metadata error: {e}"),
            AppError::Ledger(e) => write!(f, "Ledger error: {e}"),
            AppError::Store(e) => write!(f, "Store error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Rejected(_) | AppError::Ledger(LedgerError::Reverted(_)) => StatusCode::CONFLICT,
            AppError::NotConnected => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Metadata(_) | AppError::Ledger(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(errors) => serde_json::json!({
                "error": "Please fix the highlighted fields",
                "fields": errors,
            }),
            AppError::NotFound(_) => serde_json::json!({
                "error": self.to_string(),
                "redirect": NOT_FOUND_REDIRECT,
            }),
            AppError::Store(_) | AppError::Session(_) => {
                log::error!("{self}");
                serde_json::json!({ "error": "Internal Server Error" })
            }
            _ => {
                log::warn!("{self}");
                serde_json::json!({ "error": self.to_string() })
            }
        };
        HttpResponse::build(status).json(body)
    }
}

impl From<MetadataError> for AppError {
    fn from(e: MetadataError) -> Self {
        AppError::Metadata(e)
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        AppError::Ledger(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}
