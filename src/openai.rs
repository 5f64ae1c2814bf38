//! Chat-completion client used for the translation proxy.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// API key plus endpoint settings. The base URL is configurable so tests
/// can point the proxy at a local mock server.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug)]
pub enum OpenAiError {
    Request(reqwest::Error),
    Status(reqwest::StatusCode),
    EmptyCompletion,
}

impl std::fmt::Display for OpenAiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenAiError::Request(e) => write!(f, "Translation request failed: {}", e),
            OpenAiError::Status(status) => {
                write!(f, "Translation endpoint returned {}", status)
            }
            OpenAiError::EmptyCompletion => write!(f, "Translation response had no content"),
        }
    }
}

impl std::error::Error for OpenAiError {}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { http, config })
    }

    /// Translate `text` into `target_lang` via a single chat completion.
    pub async fn translate(&self, text: &str, target_lang: &str) -> Result<String, OpenAiError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": format!(
                        "You are a translation engine. Translate the user's message into {}. Reply with the translation only.",
                        target_lang
                    ),
                },
                { "role": "user", "content": text },
            ],
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(OpenAiError::Request)?;
        if !response.status().is_success() {
            return Err(OpenAiError::Status(response.status()));
        }
        let completion: ChatResponse = response.json().await.map_err(OpenAiError::Request)?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|translation| !translation.is_empty())
            .ok_or(OpenAiError::EmptyCompletion)
    }
}
