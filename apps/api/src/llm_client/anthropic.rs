//! Direct Anthropic Messages API backend, for deployments without Bedrock access.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::llm_client::{LlmError, ModelBackend, ModelRequest};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const ATTEMPTS: u32 = 3;

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Debug, Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

fn reply_text(reply: Reply) -> Option<String> {
    reply
        .content
        .into_iter()
        .find(|b| b.kind == "text")
        .and_then(|b| b.text)
}

/// 429 and 5xx (including 529 "overloaded") are worth another attempt.
fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before the given retry (1-based): base, then twice the previous delay.
fn backoff(base: Duration, retry: u32) -> Duration {
    base * 2u32.pow(retry.saturating_sub(1))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[derive(Clone)]
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    model: String,
    url: String,
    retry_base: Duration,
}

impl AnthropicBackend {
    /// The overall deadline belongs to `AdviceClient`; this only bounds single HTTP attempts.
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(60)).build()?,
            api_key,
            model,
            url: MESSAGES_URL.to_string(),
            retry_base: Duration::from_secs(1),
        })
    }

    #[cfg(test)]
    fn pointed_at(mut self, url: String, retry_base: Duration) -> Self {
        self.url = url;
        self.retry_base = retry_base;
        self
    }

    fn body(&self, request: &ModelRequest<'_>) -> Value {
        json!({
            "model": self.model,
            "max_tokens": request.params.max_output_tokens,
            "temperature": request.params.temperature,
            "system": request.system,
            "messages": [{ "role": "user", "content": request.prompt }],
        })
    }

    /// One HTTP attempt.
    async fn attempt(&self, body: &Value) -> Result<String, Failure> {
        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| Failure::Retry(LlmError::Http(e)))?;

        let status = response.status();
        if status.is_success() {
            let reply: Reply = response
                .json()
                .await
                .map_err(|e| Failure::Fatal(LlmError::Http(e)))?;
            return reply_text(reply).ok_or(Failure::Fatal(LlmError::EmptyContent));
        }

        let message = error_message(&response.text().await.unwrap_or_default());
        warn!("Anthropic API returned {status}: {message}");
        let error = LlmError::Api {
            status: status.as_u16(),
            message,
        };
        Err(if is_transient(status) {
            Failure::Retry(error)
        } else {
            Failure::Fatal(error)
        })
    }
}

enum Failure {
    Retry(LlmError),
    Fatal(LlmError),
}

#[async_trait]
impl ModelBackend for AnthropicBackend {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<String, LlmError> {
        let body = self.body(&request);
        let mut last = LlmError::RateLimited { retries: ATTEMPTS };

        for retry in 0..ATTEMPTS {
            if retry > 0 {
                tokio::time::sleep(backoff(self.retry_base, retry)).await;
            }
            match self.attempt(&body).await {
                Ok(text) => {
                    debug!("Anthropic call succeeded on attempt {}", retry + 1);
                    return Ok(text);
                }
                Err(Failure::Fatal(e)) => return Err(e),
                Err(Failure::Retry(LlmError::Api { status: 429, .. })) => {
                    last = LlmError::RateLimited { retries: ATTEMPTS };
                }
                Err(Failure::Retry(e)) => last = e,
            }
        }
        Err(last)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
