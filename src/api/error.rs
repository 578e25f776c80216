//! HTTP rendering of catalog errors

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::{CatalogError, FieldErrors};

/// Wraps [`CatalogError`] so handlers can return it with `?`.
#[derive(Debug)]
pub struct AppError(pub CatalogError);

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let mut errors = FieldErrors::new();
        errors.add("non_field_errors", rejection.body_text());
        Self(CatalogError::Validation(errors))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if let Some(errors) = self.0.field_errors() {
            return (status, Json(errors.as_map().clone())).into_response();
        }

        let detail = match &self.0 {
            CatalogError::NotFound(_) => "Not found.".to_string(),
            CatalogError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error.".to_string()
            }
            CatalogError::MissingField(_) => {
                error!("{}", self.0);
                self.0.to_string()
            }
            other => {
                warn!("{}", other);
                other.to_string()
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
