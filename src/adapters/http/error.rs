use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use tracing::{error, warn};

use crate::application::dto::ErrorResponse;
use crate::domain::errors::DomainError;

/// Error de dominio con su traducción a HTTP: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::InvalidMediaType(_) | DomainError::InvalidImage(_) | DomainError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            DomainError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::UnexpectedOutputFormat(_) | DomainError::OperationFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_client_error() {
            warn!("{} -> {}", status, self.0);
        } else {
            error!("{} -> {}", status, self.0);
        }
        (status, Json(ErrorResponse { detail: self.0.to_string() })).into_response()
    }
}
