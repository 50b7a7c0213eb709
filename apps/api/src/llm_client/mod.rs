/// LLM Client — the single point of entry for all model calls in BeneLinc.
///
/// ARCHITECTURAL RULE: No other module may call a model provider directly.
/// All advice generation MUST go through `AdviceClient::generate`, which never fails:
/// a backend error is logged and replaced by `FALLBACK_ADVICE`.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub mod anthropic;
pub mod bedrock;
pub mod prompts;

pub use anthropic::AnthropicBackend;
pub use bedrock::BedrockBackend;

use prompts::{FALLBACK_ADVICE, SYSTEM_FRAMING};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Bedrock error: {0}")]
    Bedrock(String),

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),
}

/// Backend-specific generation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    /// Caps response length.
    pub max_output_tokens: u32,
    /// Controls response randomness.
    pub temperature: f64,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            max_output_tokens: 1000,
            temperature: 0.7,
        }
    }
}

/// One model call: a fixed system framing plus the user prompt.
/// How the two are laid out on the wire is up to the backend.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub params: InferenceParams,
}

/// A remote text model. Implementations return the model's text or a typed error;
/// they never substitute fallback text themselves.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<String, LlmError>;

    fn model_id(&self) -> &str;
}

/// Result of one advice request. `Fallback` carries the fixed offline text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "text", rename_all = "snake_case")]
pub enum Advice {
    Generated(String),
    Fallback(String),
}

impl Advice {
    pub fn text(&self) -> &str {
        match self {
            Advice::Generated(text) | Advice::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Advice::Fallback(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Advice::Generated(text) | Advice::Fallback(text) => text,
        }
    }
}

/// The advice facade shared by every caller. Cheap to clone.
#[derive(Clone)]
pub struct AdviceClient {
    backend: Arc<dyn ModelBackend>,
    params: InferenceParams,
    timeout: Duration,
}

impl AdviceClient {
    pub fn new(backend: Arc<dyn ModelBackend>, params: InferenceParams, timeout: Duration) -> Self {
        Self {
            backend,
            params,
            timeout,
        }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    /// Runs `prompt` against the backend under the configured timeout.
    /// Any failure (transport, timeout, malformed or empty output) yields `Advice::Fallback`.
    pub async fn generate(&self, prompt: &str) -> Advice {
        let request = ModelRequest {
            system: SYSTEM_FRAMING,
            prompt,
            params: self.params,
        };

        let outcome = match tokio::time::timeout(self.timeout, self.backend.invoke(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(text) if !text.trim().is_empty() => {
                debug!(
                    "Advice generated by {} ({} chars)",
                    self.backend.model_id(),
                    text.len()
                );
                Advice::Generated(text)
            }
            Ok(_) => {
                warn!(
                    "Model {} returned empty text; serving fallback advice",
                    self.backend.model_id()
                );
                Advice::Fallback(FALLBACK_ADVICE.to_string())
            }
            Err(e) => {
                warn!(
                    "Model {} call failed: {e}; serving fallback advice",
                    self.backend.model_id()
                );
                Advice::Fallback(FALLBACK_ADVICE.to_string())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Replies with a fixed text and records every prompt it sees.
    pub struct EchoBackend {
        pub reply: String,
        pub seen: Mutex<Vec<(String, String)>>,
    }

    impl EchoBackend {
        pub fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|(_, p)| p.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ModelBackend for EchoBackend {
        async fn invoke(&self, request: ModelRequest<'_>) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.system.to_string(), request.prompt.to_string()));
            Ok(self.reply.clone())
        }

        fn model_id(&self) -> &str {
            "echo"
        }
    }

    /// Always fails, as an unreachable or unauthorised backend would.
    pub struct FailingBackend;

    #[async_trait]
    impl ModelBackend for FailingBackend {
        async fn invoke(&self, _request: ModelRequest<'_>) -> Result<String, LlmError> {
            Err(LlmError::Bedrock(
                "AccessDeniedException: model access not granted".to_string(),
            ))
        }

        fn model_id(&self) -> &str {
            "failing"
        }
    }

    /// Replies with each text in turn, repeating the last one.
    pub struct SequenceBackend {
        replies: Vec<String>,
        calls: Mutex<usize>,
    }

    impl SequenceBackend {
        pub fn new(replies: &[&str]) -> Self {
            Self {
                replies: replies.iter().map(|r| r.to_string()).collect(),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelBackend for SequenceBackend {
        async fn invoke(&self, _request: ModelRequest<'_>) -> Result<String, LlmError> {
            let mut calls = self.calls.lock().unwrap();
            let reply = self
                .replies
                .get(*calls)
                .or(self.replies.last())
                .cloned()
                .unwrap_or_default();
            *calls += 1;
            Ok(reply)
        }

        fn model_id(&self) -> &str {
            "sequence"
        }
    }

    /// Never answers within any sensible timeout.
    pub struct HangingBackend;

    #[async_trait]
    impl ModelBackend for HangingBackend {
        async fn invoke(&self, _request: ModelRequest<'_>) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }

        fn model_id(&self) -> &str {
            "hanging"
        }
    }

    pub fn client(backend: Arc<dyn ModelBackend>) -> AdviceClient {
        AdviceClient::new(backend, InferenceParams::default(), Duration::from_secs(30))
    }
}
