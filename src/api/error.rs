//! Mapping from library errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::auth::Role;
use super::types::ErrorResponse;
use crate::domain::{FieldError, InvalidPeriod, UnknownUtilityType};
use crate::listing::ListingError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing X-User-Role header")]
    MissingRole,
    #[error("unrecognised role \"{0}\"")]
    UnknownRole(String),
    #[error("role {role} may not perform this action (requires {required})")]
    Forbidden { role: Role, required: Role },
    #[error("validation failed")]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error(transparent)]
    Period(#[from] InvalidPeriod),
    #[error(transparent)]
    UtilityType(#[from] UnknownUtilityType),
    #[error("failed to render CSV: {0}")]
    Export(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingRole | Self::UnknownRole(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Invalid(_)
            | Self::Listing(_)
            | Self::Period(_)
            | Self::UtilityType(_)
            | Self::Store(StoreError::Invalid(_)) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Billing(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn fields(&self) -> Option<Vec<FieldError>> {
        match self {
            Self::Invalid(fields) | Self::Store(StoreError::Invalid(fields)) => Some(fields.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            fields: self.fields(),
        };
        (status, Json(body)).into_response()
    }
}
