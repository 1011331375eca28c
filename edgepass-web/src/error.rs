//! Mapping of application errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use edgepass_core::EdgepassError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every non-2xx API response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[schema(example = false)]
    pub success: bool,
    #[schema(example = "Filename is required")]
    pub message: String,
    /// Correlates with the server log; only set for server errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

/// Handler error carrying an [`EdgepassError`]
#[derive(Debug)]
pub struct ApiError(pub EdgepassError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EdgepassError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            EdgepassError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EdgepassError> for ApiError {
    fn from(error: EdgepassError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        self.0.log();

        let error_id = if self.0.is_client_error() {
            None
        } else {
            self.0.context().map(|c| c.error_id.clone())
        };

        let body = ErrorResponse {
            success: false,
            message: self.0.public_message(),
            error_id,
        };

        (status, Json(body)).into_response()
    }
}
