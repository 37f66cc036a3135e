use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{parse_structured, StructuredCompletion};
use crate::errors::CodeGenError;
use crate::wire::{ChatPrompt, SchemaDescriptor};

/// OpenAI chat completions with a strict `json_schema` response format.
pub struct OpenAIProvider {
    model: String,
    api_key: String,
    api_base: String,
    temperature: f32,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(
        model: String,
        api_key: String,
        api_base: String,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, CodeGenError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CodeGenError::provider("openai client", e))?;
        Ok(Self { model, api_key, api_base, temperature, client })
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

pub(crate) fn request_body(
    model: &str,
    temperature: f32,
    prompt: &ChatPrompt,
    schema: &SchemaDescriptor,
) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": prompt.system },
            { "role": "user", "content": prompt.user }
        ],
        "temperature": temperature,
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": schema.name,
                "strict": true,
                "schema": schema.schema
            }
        }
    })
}

#[async_trait]
impl StructuredCompletion for OpenAIProvider {
    async fn complete(
        &self,
        prompt: &ChatPrompt,
        schema: &SchemaDescriptor,
    ) -> Result<Value, CodeGenError> {
        let url = format!("{}/v1/chat/completions", self.api_base.trim_end_matches('/'));
        let body = request_body(&self.model, self.temperature, prompt, schema);
        debug!(%url, model = %self.model, schema = schema.name, "openai request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CodeGenError::provider("openai request failed", e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CodeGenError::provider("openai read body failed", e))?;
        debug!(%status, bytes = text.len(), "openai response");

        if !status.is_success() {
            return Err(CodeGenError::Provider(format!("OpenAI API error ({status}): {text}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| CodeGenError::Provider(format!("failed to parse OpenAI response: {e}\nRaw: {text}")))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| CodeGenError::Provider("OpenAI returned no choices".into()))?;

        if let Some(refusal) = message.refusal {
            return Err(CodeGenError::Provider(format!("OpenAI refused: {refusal}")));
        }
        parse_structured("openai", message.content.as_deref().unwrap_or_default())
    }
}
