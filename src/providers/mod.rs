mod ollama;
mod openai;

pub use ollama::OllamaGenerator;
pub use openai::OpenAiCompatibleGenerator;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Text-generation backend seam.
///
/// One call per exchange: prompt plus instruction prefix in, completed text
/// out. Timeout and admission control sit above this trait in the chat
/// service; implementations still set their own HTTP-client timeouts so a
/// wedged backend cannot pin a connection forever.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        prompt: &str,
        system_message: &str,
        temperature: f64,
    ) -> anyhow::Result<String>;
}

/// Resolve the API key: explicit config value first, then environment.
fn resolve_api_key(explicit: Option<&str>) -> Option<String> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    for env_var in ["PROMPTGATE_API_KEY", "OPENAI_API_KEY", "API_KEY"] {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Create the generation backend selected by config.
pub fn create_generator(config: &LlmConfig) -> anyhow::Result<Box<dyn Generator>> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    match config.backend.as_str() {
        "ollama" => Ok(Box::new(OllamaGenerator::new(
            config.base_url.as_deref(),
            &config.model,
            timeout,
        ))),
        "openai" | "openai-compatible" => {
            let api_key = resolve_api_key(config.api_key.as_deref());
            Ok(Box::new(OpenAiCompatibleGenerator::new(
                config.base_url.as_deref().unwrap_or("https://api.openai.com"),
                api_key.as_deref(),
                &config.model,
                timeout,
            )))
        }
        other => anyhow::bail!("unknown llm backend '{other}' (expected 'ollama' or 'openai')"),
    }
}

const MAX_API_ERROR_CHARS: usize = 200;

/// Scrub bearer-token-like values and truncate backend error text before it
/// reaches logs or error chains.
pub fn sanitize_api_error(input: &str) -> String {
    const MARKERS: [&str; 5] = [
        "sk-",
        "Bearer ",
        "api_key=",
        "access_token=",
        "\"api_key\":\"",
    ];

    let mut text = input.to_string();
    for marker in MARKERS {
        let mut search_from = 0;
        while let Some(rel) = text[search_from..].find(marker) {
            let start = search_from + rel;
            let token_start = start + marker.len();
            let token_end = text[token_start..]
                .char_indices()
                .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/')))
                .map_or(text.len(), |(i, _)| token_start + i);

            // Bare marker without a token value.
            if token_end == token_start {
                search_from = token_start;
                continue;
            }

            text.replace_range(start..token_end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    if text.chars().count() <= MAX_API_ERROR_CHARS {
        return text;
    }
    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Build a sanitized backend error from a failed HTTP response.
pub(crate) async fn api_error(backend: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read backend error body>".to_string());
    anyhow::anyhow!("{backend} API error ({status}): {}", sanitize_api_error(&body))
}
