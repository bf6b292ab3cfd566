use super::AppState;
use super::error::ApiError;
use crate::chat::PromptRequest;
use crate::error::GateError;
use crate::sessions::SessionWindow;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// `GET /health` — liveness plus a store round trip.
pub(super) async fn handle_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store_ok = state.store.health_check().await;
    Json(json!({
        "status": if store_ok { "ok" } else { "degraded" },
        "store": {
            "backend": state.store.name(),
            "available": store_ok,
        },
    }))
}

/// `GET /api/v1/systemMessage` — current default system message.
pub(super) async fn handle_get_system_message(State(state): State<Arc<AppState>>) -> Json<Value> {
    let current = state.system_message.load();
    Json(json!({ "system_message": current.as_str() }))
}

#[derive(Debug, Deserialize)]
pub(super) struct SystemMessageBody {
    pub(super) system_message: Option<String>,
}

/// `PUT /api/v1/systemMessage` — replace the default system message.
///
/// Concurrent writers race; the last swap wins and every exchange started
/// afterwards sees the new value. A body without the field leaves the
/// message unchanged and just echoes it back.
pub(super) async fn handle_put_system_message(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SystemMessageBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|e| GateError::Validation(e.body_text()))?;

    if let Some(message) = body.system_message {
        state.system_message.store(Arc::new(message));
    }

    let current = state.system_message.load();
    Ok(Json(json!({ "system_message": current.as_str() })))
}

/// `POST /api/v1/chat/prompt` — run one exchange and persist it.
pub(super) async fn handle_chat_prompt(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.map_err(|e| GateError::Validation(e.body_text()))?;

    let default_system_message = state.system_message.load_full();
    let record = state.chat.prompt(request, &default_system_message).await?;

    Ok(Json(json!({
        "chatSession": record.session_id,
        "response": record.response,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct SessionQueryParams {
    #[serde(rename = "startDate")]
    pub(super) start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub(super) end_date: Option<String>,
}

/// `GET /api/v1/chat/session` — list stored exchanges, optionally narrowed
/// to an inclusive `startDate..endDate` window. A lone bound is ignored.
pub(super) async fn handle_list_sessions(
    State(state): State<Arc<AppState>>,
    axum::extract::Query(params): axum::extract::Query<SessionQueryParams>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let window =
        SessionWindow::from_bounds(params.start_date.as_deref(), params.end_date.as_deref())?;
    let sessions = state.sessions.query(window).await?;
    Ok(Json(sessions))
}
