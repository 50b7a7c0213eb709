//! Amazon Bedrock backend (`InvokeModel`).
//!
//! Request and response bodies differ per model family; both shapes live here so the
//! rest of the crate only ever sees `ModelBackend::invoke`.
use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::llm_client::{LlmError, ModelBackend, ModelRequest};

const ANTHROPIC_BEDROCK_VERSION: &str = "bedrock-2023-05-31";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// `amazon.nova-*`: no system field, framing goes into the user text.
    Nova,
    /// `anthropic.claude-*` served through Bedrock.
    Anthropic,
}

impl ModelFamily {
    /// Works for plain model ids and for cross-region inference profiles (`us.…`).
    pub fn detect(model_id: &str) -> Option<Self> {
        if model_id.contains("anthropic.") {
            Some(ModelFamily::Anthropic)
        } else if model_id.contains("amazon.nova") {
            Some(ModelFamily::Nova)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct BedrockBackend {
    client: Client,
    model_id: String,
    family: ModelFamily,
}

impl BedrockBackend {
    pub fn new(client: Client, model_id: String) -> Result<Self, LlmError> {
        let family = ModelFamily::detect(&model_id).ok_or_else(|| {
            LlmError::Bedrock(format!("unsupported Bedrock model family: {model_id}"))
        })?;
        Ok(Self {
            client,
            model_id,
            family,
        })
    }
}

#[async_trait]
impl ModelBackend for BedrockBackend {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<String, LlmError> {
        let body = serde_json::to_vec(&request_body(self.family, &request))?;

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| LlmError::Bedrock(DisplayErrorContext(&e).to_string()))?;

        let text = response_text(self.family, output.body().as_ref())?;
        debug!("Bedrock {} returned {} chars", self.model_id, text.len());
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

pub fn request_body(family: ModelFamily, request: &ModelRequest<'_>) -> Value {
    match family {
        ModelFamily::Nova => json!({
            "messages": [{
                "role": "user",
                "content": [{ "text": format!("{} {}", request.system, request.prompt) }]
            }],
            "inferenceConfig": {
                "max_new_tokens": request.params.max_output_tokens,
                "temperature": request.params.temperature
            }
        }),
        ModelFamily::Anthropic => json!({
            "anthropic_version": ANTHROPIC_BEDROCK_VERSION,
            "max_tokens": request.params.max_output_tokens,
            "temperature": request.params.temperature,
            "system": request.system,
            "messages": [{ "role": "user", "content": request.prompt }]
        }),
    }
}

#[derive(Debug, Deserialize)]
struct NovaResponse {
    output: NovaOutput,
}

#[derive(Debug, Deserialize)]
struct NovaOutput {
    message: NovaMessage,
}

#[derive(Debug, Deserialize)]
struct NovaMessage {
    content: Vec<NovaContent>,
}

#[derive(Debug, Deserialize)]
struct NovaContent {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

pub fn response_text(family: ModelFamily, body: &[u8]) -> Result<String, LlmError> {
    let text = match family {
        ModelFamily::Nova => {
            let parsed: NovaResponse = serde_json::from_slice(body)?;
            parsed
                .output
                .message
                .content
                .into_iter()
                .find_map(|c| c.text)
        }
        ModelFamily::Anthropic => {
            let parsed: ClaudeResponse = serde_json::from_slice(body)?;
            parsed
                .content
                .into_iter()
                .find(|b| b.block_type == "text")
                .and_then(|b| b.text)
        }
    };
    text.ok_or(LlmError::EmptyContent)
}
