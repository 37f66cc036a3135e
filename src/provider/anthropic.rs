use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{parse_structured, StructuredCompletion};
use crate::errors::CodeGenError;
use crate::wire::{ChatPrompt, SchemaDescriptor};

/// Anthropic messages API. The schema is offered as the only tool and the
/// model is forced to call it; the tool input is the record.
pub struct Anthropic {
    model: String,
    api_key: String,
    api_base: String,
    api_version: String,
    max_tokens: u32,
    temperature: f32,
    client: Client,
}

impl Anthropic {
    pub fn new(
        model: String,
        api_key: String,
        api_base: String,
        api_version: String,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, CodeGenError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CodeGenError::provider("anthropic client", e))?;
        Ok(Self { model, api_key, api_base, api_version, max_tokens, temperature, client })
    }
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Msg<'a>>,
    tools: Vec<Tool<'a>>,
    tool_choice: ToolChoice<'a>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Tool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Serialize)]
struct ToolChoice<'a> {
    r#type: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    r#type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    input: Value,
}

fn pick_record(blocks: Vec<Block>, schema: &str) -> Result<Value, CodeGenError> {
    let mut text = None;
    for b in blocks {
        match b.r#type.as_str() {
            "tool_use" if b.name == schema => return Ok(b.input),
            "text" if !b.text.is_empty() => {
                text.get_or_insert(b.text);
            }
            _ => {}
        }
    }
    match text {
        Some(t) => parse_structured("anthropic", &t),
        None => Err(CodeGenError::Provider("anthropic: empty content".into())),
    }
}

#[async_trait]
impl StructuredCompletion for Anthropic {
    async fn complete(
        &self,
        prompt: &ChatPrompt,
        schema: &SchemaDescriptor,
    ) -> Result<Value, CodeGenError> {
        let url = format!("{}/v1/messages", self.api_base.trim_end_matches('/'));
        let body = MsgRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: &prompt.system,
            messages: vec![Msg { role: "user", content: &prompt.user }],
            tools: vec![Tool {
                name: schema.name,
                description: "Record the generated result.",
                input_schema: &schema.schema,
            }],
            tool_choice: ToolChoice { r#type: "tool", name: schema.name },
        };
        debug!(%url, model = %self.model, schema = schema.name, "anthropic request");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| CodeGenError::provider("anthropic request failed", e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| CodeGenError::provider("anthropic read body failed", e))?;
        debug!(%status, bytes = text.len(), "anthropic response");

        if !status.is_success() {
            return Err(CodeGenError::Provider(format!("Anthropic API error ({status}): {text}")));
        }

        let parsed: MsgResponse = serde_json::from_str(&text)
            .map_err(|e| CodeGenError::provider("anthropic response parse error", e))?;
        pick_record(parsed.content, schema.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(raw: &str) -> Vec<Block> {
        serde_json::from_str::<MsgResponse>(raw).unwrap().content
    }

    #[test]
    fn prefers_matching_tool_use_block() {
        let b = blocks(
            r#"{"content":[
                {"type":"text","text":"calling tool"},
                {"type":"tool_use","name":"Output","input":{"html_code":"<p></p>","css_code":""}}
            ]}"#,
        );
        let v = pick_record(b, "Output").unwrap();
        assert_eq!(v["html_code"], "<p></p>");
    }

    #[test]
    fn falls_back_to_json_in_text() {
        let b = blocks(r#"{"content":[{"type":"text","text":"{\"enhanced_prompt\":\"x\"}"}]}"#);
        let v = pick_record(b, "EnhancePrompt").unwrap();
        assert_eq!(v["enhanced_prompt"], "x");
    }

    #[test]
    fn empty_content_is_provider_error() {
        assert!(matches!(pick_record(Vec::new(), "Output"), Err(CodeGenError::Provider(_))));
    }
}
