//! Thin OpenAI-compatible chat client used by the generator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::config::Settings;
use crate::error::{RecommendError, Result};
use crate::generator::ChatModel;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_TRANSPORT_RETRIES: usize = 3;

/// Temperature and timeout the recommendation prompt is tuned for.
const CHAT_TEMPERATURE: f64 = 0.4;
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// POST a chat completion, retrying transient 429/5xx responses with a
    /// short doubling backoff before giving up.
    pub async fn chat_completion(&self, body: &Value, timeout: Duration) -> Result<Value> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RecommendError::Upstream(format!("failed to build HTTP client: {err}")))?;

        let mut attempt = 0;
        let mut backoff = Duration::from_millis(250);

        loop {
            let request_url = build_chat_url(&self.base_url);

            let response = client
                .post(&request_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await
                .map_err(|err| {
                    if err.is_timeout() {
                        RecommendError::Timeout(format!("chat completion timed out: {err}"))
                    } else {
                        RecommendError::Upstream(format!("HTTP request failed: {err}"))
                    }
                })?;

            let status = response.status();
            let headers = response.headers().clone();
            let response_text = response
                .text()
                .await
                .map_err(|err| RecommendError::Upstream(format!("failed to read response: {err}")))?;

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = headers
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(backoff);

                if attempt < MAX_TRANSPORT_RETRIES {
                    tokio::time::sleep(retry_after).await;
                    attempt += 1;
                    backoff *= 2;
                    continue;
                }

                return Err(RecommendError::Upstream(format!(
                    "rate limited, retry after {}s",
                    retry_after.as_secs().max(1)
                )));
            }

            if status.is_server_error() && attempt < MAX_TRANSPORT_RETRIES {
                tokio::time::sleep(backoff).await;
                attempt += 1;
                backoff *= 2;
                continue;
            }

            let response_json: Value = serde_json::from_str(&response_text).map_err(|err| {
                RecommendError::Upstream(format!("failed to parse completion body: {err}"))
            })?;

            if !status.is_success() {
                let api_message = response_json
                    .get("error")
                    .and_then(|error| error.get("message"))
                    .and_then(|value| value.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or(response_text.clone());

                return Err(RecommendError::Upstream(format!(
                    "HTTP {} error: {}",
                    status, api_message
                )));
            }

            if let Some(error) = response_json.get("error") {
                let error_message = error
                    .get("message")
                    .and_then(|value| value.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| error.to_string());
                return Err(RecommendError::Upstream(format!(
                    "API error: {}",
                    error_message
                )));
            }

            return Ok(response_json);
        }
    }
}

fn build_chat_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

#[derive(Clone, Debug)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn into_value(self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
        });

        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        body
    }
}

/// Production [`ChatModel`]: one chat completion per generator attempt.
#[derive(Clone, Debug)]
pub struct OpenAiChat {
    client: OpenAiClient,
    model: String,
}

impl OpenAiChat {
    pub fn new(settings: &Settings) -> Self {
        let mut client = OpenAiClient::new(settings.openai_api_key.clone());
        if let Some(base_url) = &settings.openai_base_url {
            client.set_base_url(base_url);
        }
        Self {
            client,
            model: settings.model.clone(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let messages = vec![
            json!({ "role": "system", "content": system_prompt }),
            json!({ "role": "user", "content": user_prompt }),
        ];
        let body = ChatRequest::new(self.model.clone(), messages)
            .with_temperature(CHAT_TEMPERATURE)
            .into_value();

        let response = self.client.chat_completion(&body, CHAT_TIMEOUT).await?;
        response
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                RecommendError::Upstream("chat completion had no message content".to_string())
            })
    }
}
