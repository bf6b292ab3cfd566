use super::Generator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generation client for OpenAI and API-compatible backends
/// (bearer auth against `/v1/chat/completions`).
pub struct OpenAiCompatibleGenerator {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiCompatibleGenerator {
    pub fn new(base_url: &str, api_key: Option<&str>, model: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToOwned::to_owned),
            model: model.to_string(),
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn build_request(&self, prompt: &str, system_message: &str, temperature: f64) -> ChatRequest {
        let mut messages = Vec::new();

        if !system_message.is_empty() {
            messages.push(Message {
                role: "system",
                content: system_message.to_string(),
            });
        }

        messages.push(Message {
            role: "user",
            content: prompt.to_string(),
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature,
        }
    }
}

#[async_trait]
impl Generator for OpenAiCompatibleGenerator {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_message: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let request = self.build_request(prompt, system_message, temperature);
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(super::api_error("OpenAI", response).await);
        }

        let chat_response: ChatResponse = response.json().await?;
        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("OpenAI returned an empty completion"))
    }
}
