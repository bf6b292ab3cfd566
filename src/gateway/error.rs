use crate::error::{GateError, LlmError, SessionError, StoreError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wraps [`GateError`] so handlers can return `Result<_, ApiError>` with `?`.
#[derive(Debug)]
pub struct ApiError(pub GateError);

impl<E> From<E> for ApiError
where
    E: Into<GateError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            GateError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            GateError::Store(StoreError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string())
            }
            GateError::Llm(LlmError::Timeout { .. }) => {
                (StatusCode::GATEWAY_TIMEOUT, self.0.to_string())
            }
            GateError::Llm(LlmError::Request { .. }) => {
                (StatusCode::BAD_GATEWAY, self.0.to_string())
            }
            GateError::Store(StoreError::Backend(_))
            | GateError::Session(SessionError::MalformedRecord { .. })
            | GateError::Config(_)
            | GateError::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(%status, "request failed: {}", self.0);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
