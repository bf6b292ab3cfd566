mod error;
mod handlers;

pub use error::ApiError;

use crate::chat::ChatService;
use crate::config::Config;
use crate::providers::{Generator, create_generator};
use crate::sessions::SessionQueryService;
use crate::store::{SessionStore, create_store};
use arc_swap::ArcSwap;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Request bodies above this are rejected before they reach a handler.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Whole-request deadline. Sits well above the generation timeout so the
/// chat service's own deadline always fires first and maps to 504.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Shared state behind every handler.
pub struct AppState {
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) chat: ChatService,
    pub(crate) sessions: SessionQueryService,
    /// Default system message. Swapped wholesale on writes so readers
    /// never observe a partial update.
    pub(crate) system_message: ArcSwap<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>, generator: Arc<dyn Generator>, config: &Config) -> Self {
        Self {
            chat: ChatService::new(
                store.clone(),
                generator,
                config.llm.max_concurrent_generations,
                Duration::from_secs(config.llm.request_timeout_secs),
                config.default_temperature,
            ),
            sessions: SessionQueryService::new(store.clone()),
            store,
            system_message: ArcSwap::from_pointee(config.default_system_message.clone()),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::handle_health))
        .route(
            "/api/v1/systemMessage",
            get(handlers::handle_get_system_message).put(handlers::handle_put_system_message),
        )
        .route("/api/v1/chat/prompt", post(handlers::handle_chat_prompt))
        .route("/api/v1/chat/session", get(handlers::handle_list_sessions))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
        .with_state(state)
}

/// Build the full stack from config and serve until ctrl-c.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> anyhow::Result<()> {
    let store = create_store(&config.store).await?;
    let generator: Arc<dyn Generator> = Arc::from(create_generator(&config.llm)?);
    tracing::info!(
        store = store.name(),
        llm = generator.name(),
        model = %config.llm.model,
        "backends ready"
    );

    let state = Arc::new(AppState::new(store, generator, &config));
    let listener = TcpListener::bind((host, port)).await?;
    tracing::info!("listening on http://{host}:{port}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::PromptRequest;
    use crate::error::GateError;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use axum::Json;
    use axum::extract::State;
    use serde_json::json;

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn generate(
            &self,
            prompt: &str,
            system_message: &str,
            _temperature: f64,
        ) -> anyhow::Result<String> {
            Ok(format!("[{system_message}] {prompt}"))
        }
    }

    fn make_state() -> Arc<AppState> {
        let store: Arc<dyn SessionStore> = Arc::new(InMemoryStore::new());
        let config = Config {
            default_system_message: "default persona".into(),
            ..Config::default()
        };
        Arc::new(AppState::new(store, Arc::new(EchoGenerator), &config))
    }

    fn prompt_request(value: serde_json::Value) -> PromptRequest {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn health_reports_store_backend() {
        let state = make_state();
        let Json(body) = handlers::handle_health(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"]["backend"], "memory");
        assert_eq!(body["store"]["available"], true);
    }

    #[tokio::test]
    async fn get_system_message_returns_configured_default() {
        let state = make_state();
        let Json(body) = handlers::handle_get_system_message(State(state)).await;
        assert_eq!(body["system_message"], "default persona");
    }

    #[tokio::test]
    async fn put_system_message_swaps_the_default() {
        let state = make_state();

        let Json(body) = handlers::handle_put_system_message(
            State(state.clone()),
            Ok(Json(handlers::SystemMessageBody {
                system_message: Some("new persona".into()),
            })),
        )
        .await
        .unwrap();
        assert_eq!(body["system_message"], "new persona");

        let Json(body) = handlers::handle_get_system_message(State(state)).await;
        assert_eq!(body["system_message"], "new persona");
    }

    #[tokio::test]
    async fn put_system_message_without_field_is_a_noop() {
        let state = make_state();

        let Json(body) = handlers::handle_put_system_message(
            State(state),
            Ok(Json(handlers::SystemMessageBody {
                system_message: None,
            })),
        )
        .await
        .unwrap();
        assert_eq!(body["system_message"], "default persona");
    }

    #[tokio::test]
    async fn updated_system_message_reaches_subsequent_prompts() {
        let state = make_state();

        handlers::handle_put_system_message(
            State(state.clone()),
            Ok(Json(handlers::SystemMessageBody {
                system_message: Some("pirate".into()),
            })),
        )
        .await
        .unwrap();

        let Json(body) = handlers::handle_chat_prompt(
            State(state),
            Ok(Json(prompt_request(json!({"prompt": "ahoy"})))),
        )
        .await
        .unwrap();
        assert_eq!(body["response"], "[pirate] ahoy");
    }

    #[tokio::test]
    async fn chat_prompt_returns_session_and_response() {
        let state = make_state();

        let Json(body) = handlers::handle_chat_prompt(
            State(state.clone()),
            Ok(Json(prompt_request(json!({"prompt": "hello"})))),
        )
        .await
        .unwrap();

        let session_id = body["chatSession"].as_str().unwrap();
        assert!(!session_id.is_empty());
        assert_eq!(body["response"], "[default persona] hello");

        let all = state.store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, session_id);
    }

    #[tokio::test]
    async fn chat_prompt_without_prompt_is_rejected() {
        let state = make_state();

        let err = handlers::handle_chat_prompt(
            State(state.clone()),
            Ok(Json(prompt_request(json!({})))),
        )
        .await
        .unwrap_err();

        assert!(matches!(err.0, GateError::Validation(_)));
        assert_eq!(err.0.to_string(), "Prompt is mandatory");
        assert!(state.store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chat_prompt_merges_into_an_existing_session() {
        let state = make_state();

        for prompt in ["first", "second"] {
            handlers::handle_chat_prompt(
                State(state.clone()),
                Ok(Json(prompt_request(
                    json!({"prompt": prompt, "chatSession": "shared"}),
                ))),
            )
            .await
            .unwrap();
        }

        let all = state.store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        // Same field set both times, so the second exchange overwrote the
        // first in place.
        assert_eq!(all[0].1["prompt"], "second");
    }

    #[tokio::test]
    async fn list_sessions_returns_one_object_per_session() {
        let state = make_state();

        for session in ["a", "b"] {
            handlers::handle_chat_prompt(
                State(state.clone()),
                Ok(Json(prompt_request(
                    json!({"prompt": "hi", "chatSession": session}),
                ))),
            )
            .await
            .unwrap();
        }

        let Json(sessions) = handlers::handle_list_sessions(
            State(state),
            axum::extract::Query(handlers::SessionQueryParams::default()),
        )
        .await
        .unwrap();

        assert_eq!(sessions.len(), 2);
        let ids: Vec<&str> = sessions
            .iter()
            .flat_map(|s| s.as_object().unwrap().keys())
            .map(String::as_str)
            .collect();
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"b"));
    }

    #[tokio::test]
    async fn list_sessions_filters_by_window() {
        let state = make_state();
        handlers::handle_chat_prompt(
            State(state.clone()),
            Ok(Json(prompt_request(json!({"prompt": "hi"})))),
        )
        .await
        .unwrap();

        // The record was written just now; a window in 1999 excludes it.
        let Json(sessions) = handlers::handle_list_sessions(
            State(state.clone()),
            axum::extract::Query(handlers::SessionQueryParams {
                start_date: Some("1999-01-01T00:00:00".into()),
                end_date: Some("1999-12-31T23:59:59".into()),
            }),
        )
        .await
        .unwrap();
        assert!(sessions.is_empty());

        // A window spanning now includes it.
        let Json(sessions) = handlers::handle_list_sessions(
            State(state),
            axum::extract::Query(handlers::SessionQueryParams {
                start_date: Some("1999-01-01T00:00:00".into()),
                end_date: Some("2999-12-31T23:59:59".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn list_sessions_ignores_a_lone_bound() {
        let state = make_state();
        handlers::handle_chat_prompt(
            State(state.clone()),
            Ok(Json(prompt_request(json!({"prompt": "hi"})))),
        )
        .await
        .unwrap();

        let Json(sessions) = handlers::handle_list_sessions(
            State(state),
            axum::extract::Query(handlers::SessionQueryParams {
                start_date: Some("1999-01-01T00:00:00".into()),
                end_date: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn list_sessions_rejects_unparsable_bounds() {
        let state = make_state();

        let err = handlers::handle_list_sessions(
            State(state),
            axum::extract::Query(handlers::SessionQueryParams {
                start_date: Some("tuesday".into()),
                end_date: Some("2026-01-01T00:00:00".into()),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err.0, GateError::Validation(_)));
    }

    #[test]
    fn router_builds() {
        let _ = router(make_state());
    }
}
