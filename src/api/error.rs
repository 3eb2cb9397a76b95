use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::Error;

/// Maps the library taxonomy onto HTTP statuses with a JSON body that
/// names the kind and the offending id.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            Error::AgentNotFound(_) | Error::TaskNotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            Error::CapacityExceeded { .. } => (StatusCode::CONFLICT, "capacity_exceeded"),
            Error::NoAvailableAgent { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "no_available_agent")
            }
            Error::Storage { .. } | Error::Integration { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        let body = Json(serde_json::json!({
            "error": kind,
            "message": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}
