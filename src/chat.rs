use crate::error::{GateError, LlmError, Result};
use crate::providers::{Generator, sanitize_api_error};
use crate::store::{ChatRecord, SessionStore};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Decoded body of `POST /api/v1/chat/prompt`. Everything except the prompt
/// is optional and resolved against process defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptRequest {
    pub prompt: Option<String>,
    pub system_message: Option<String>,
    pub temperature: Option<f64>,
    #[serde(rename = "chatSession")]
    pub chat_session: Option<String>,
}

/// Orchestrates one prompt/response exchange: validate, generate, persist.
///
/// The generation call runs under an admission semaphore and a hard timeout —
/// it is the dominant latency contributor, and an unbounded backend call
/// would otherwise pin a handler task for as long as the backend feels like.
pub struct ChatService {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn Generator>,
    gate: Arc<Semaphore>,
    generation_timeout: Duration,
    default_temperature: f64,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        generator: Arc<dyn Generator>,
        max_concurrent_generations: usize,
        generation_timeout: Duration,
        default_temperature: f64,
    ) -> Self {
        Self {
            store,
            generator,
            gate: Arc::new(Semaphore::new(max_concurrent_generations.max(1))),
            generation_timeout,
            default_temperature,
        }
    }

    /// Run one exchange and persist it. On validation failure nothing is
    /// written and the generator is never called.
    pub async fn prompt(
        &self,
        request: PromptRequest,
        default_system_message: &str,
    ) -> Result<ChatRecord> {
        let prompt = request
            .prompt
            .filter(|p| !p.is_empty())
            .ok_or_else(|| GateError::Validation("Prompt is mandatory".into()))?;

        let system_message = request
            .system_message
            .unwrap_or_else(|| default_system_message.to_string());
        let temperature = request.temperature.unwrap_or(self.default_temperature);
        let session_id = request
            .chat_session
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| GateError::Other(anyhow::anyhow!(e)))?;

        let generation = self
            .generator
            .generate(&prompt, &system_message, temperature);
        let response = match tokio::time::timeout(self.generation_timeout, generation).await {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                let message = sanitize_api_error(&err.to_string());
                tracing::error!(backend = self.generator.name(), "generation failed: {message}");
                return Err(LlmError::Request {
                    backend: self.generator.name().to_string(),
                    message,
                }
                .into());
            }
            Err(_) => {
                let secs = self.generation_timeout.as_secs();
                tracing::error!(backend = self.generator.name(), "generation timed out after {secs}s");
                return Err(LlmError::Timeout {
                    backend: self.generator.name().to_string(),
                    secs,
                }
                .into());
            }
        };

        let record = ChatRecord {
            session_id,
            system_message,
            prompt,
            response,
            temperature,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.store.put(&record.session_id, record.to_fields()).await?;
        tracing::info!(session_id = %record.session_id, "chat exchange persisted");
        Ok(record)
    }
}
