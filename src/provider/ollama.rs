use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{parse_structured, StructuredCompletion};
use crate::errors::CodeGenError;
use crate::wire::{ChatPrompt, SchemaDescriptor};

/// Local Ollama server; the schema goes in the `format` field.
pub struct Ollama {
    model: String,
    url: String,
    temperature: f32,
    client: Client,
}

impl Ollama {
    pub fn new(
        model: String,
        url: String,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, CodeGenError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CodeGenError::provider("ollama client", e))?;
        Ok(Self { model, url, temperature, client })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    stream: bool,
    format: &'a Value,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: String,
}

#[async_trait]
impl StructuredCompletion for Ollama {
    async fn complete(
        &self,
        prompt: &ChatPrompt,
        schema: &SchemaDescriptor,
    ) -> Result<Value, CodeGenError> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Msg { role: "system", content: &prompt.system },
                Msg { role: "user", content: &prompt.user },
            ],
            stream: false,
            format: &schema.schema,
            options: OllamaOptions { temperature: self.temperature },
        };
        debug!(%url, model = %self.model, schema = schema.name, "ollama request");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CodeGenError::provider("ollama request failed", e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CodeGenError::provider("ollama read body failed", e))?;
        if !status.is_success() {
            return Err(CodeGenError::Provider(format!("Ollama error ({status}): {text}")));
        }

        // Some proxies return the bare content instead of the chat envelope.
        let content = match serde_json::from_str::<ChatResponse>(&text) {
            Ok(c) => c.message.content,
            Err(_) => text,
        };
        parse_structured("ollama", &content)
    }
}
