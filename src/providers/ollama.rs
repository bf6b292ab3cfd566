use super::Generator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama generation client against the native `/api/chat` endpoint.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaGenerator {
    pub fn new(base_url: Option<&str>, model: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url
                .unwrap_or("http://localhost:11434")
                .trim_end_matches('/')
                .to_string(),
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
            stream: false,
            options: Options { temperature },
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_message: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let request = self.build_request(prompt, system_message, temperature);
        let url = format!("{}/api/chat", self.base_url);

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let err = super::api_error("Ollama", response).await;
            anyhow::bail!("{err}. Is Ollama running? (ollama serve)");
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response.message.content)
    }
}
