use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::errors::CodeGenError;
use crate::log::Transcript;
use crate::wire::{ChatPrompt, SchemaDescriptor, StructuredOutput};

pub mod anthropic;
pub mod ollama;
pub mod openai;

/// The single boundary to an LLM vendor: a rendered prompt plus a schema in,
/// a JSON value claiming to match that schema out.
#[async_trait]
pub trait StructuredCompletion: Send + Sync {
    async fn complete(
        &self,
        prompt: &ChatPrompt,
        schema: &SchemaDescriptor,
    ) -> Result<Value, CodeGenError>;
}

pub type DynProvider = Arc<dyn StructuredCompletion>;

/// API keys, read once at startup.
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}

pub fn make_provider(cfg: &Config, creds: &Credentials) -> Result<DynProvider> {
    match cfg.provider {
        ProviderKind::OpenAI => {
            let key = creds
                .openai_api_key
                .clone()
                .ok_or_else(|| anyhow!("OPENAI_API_KEY env var is not set"))?;
            Ok(Arc::new(openai::OpenAIProvider::new(
                cfg.model.clone(),
                key,
                cfg.openai_url.clone(),
                cfg.temperature,
                cfg.timeout(),
            )?))
        }
        ProviderKind::Anthropic => {
            let key = creds
                .anthropic_api_key
                .clone()
                .ok_or_else(|| anyhow!("ANTHROPIC_API_KEY env var is not set"))?;
            Ok(Arc::new(anthropic::Anthropic::new(
                cfg.model.clone(),
                key,
                cfg.anthropic_url.clone(),
                cfg.anthropic_version.clone(),
                cfg.max_tokens,
                cfg.temperature,
                cfg.timeout(),
            )?))
        }
        ProviderKind::Ollama => Ok(Arc::new(ollama::Ollama::new(
            cfg.model.clone(),
            cfg.ollama_url.clone(),
            cfg.temperature,
            cfg.timeout(),
        )?)),
    }
}

/// Typed front for a [`StructuredCompletion`]: bounds every call by a
/// deadline, decodes into the target record and runs its cleaning pass.
#[derive(Clone)]
pub struct Completer {
    provider: DynProvider,
    deadline: Duration,
    transcripts_root: Option<PathBuf>,
    transcript: Option<Transcript>,
}

impl Completer {
    pub fn new(provider: DynProvider, deadline: Duration) -> Self {
        Self { provider, deadline, transcripts_root: None, transcript: None }
    }

    pub fn with_transcripts(mut self, root: impl Into<PathBuf>) -> Self {
        self.transcripts_root = Some(root.into());
        self
    }

    /// Handle scoped to one pipeline run; transcripts land under the run id.
    pub fn for_run(&self, run: Uuid) -> Self {
        let mut scoped = self.clone();
        scoped.transcript = self.transcripts_root.as_deref().map(|root| Transcript::new(root, run));
        scoped
    }

    pub async fn invoke<T: StructuredOutput>(
        &self,
        stage: &str,
        prompt: &ChatPrompt,
    ) -> Result<T, CodeGenError> {
        let schema = T::descriptor();
        debug!(stage, schema = schema.name, "sending structured completion");

        let value = tokio::time::timeout(self.deadline, self.provider.complete(prompt, &schema))
            .await
            .map_err(|_| {
                CodeGenError::Provider(format!(
                    "{stage}: no response within {}s",
                    self.deadline.as_secs()
                ))
            })??;

        if let Some(t) = &self.transcript {
            if let Err(e) = t.save_stage(stage, prompt, &value) {
                warn!(stage, dir = %t.dir().display(), error = %e, "could not save transcript");
            }
        }

        let mut record: T = serde_json::from_value(value).map_err(|e| {
            CodeGenError::Provider(format!(
                "{stage}: response does not match schema {}: {e}",
                schema.name
            ))
        })?;
        record.clean();
        Ok(record)
    }
}

/// Parses model text into a JSON object. Falls back to the first balanced
/// `{...}` when the model wrapped the object in prose or code fences.
pub(crate) fn parse_structured(provider: &str, content: &str) -> Result<Value, CodeGenError> {
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(content) {
        return Ok(v);
    }
    if let Some(obj) = extract_first_json_object(content) {
        if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(obj) {
            return Ok(v);
        }
    }
    Err(CodeGenError::Provider(format!(
        "{provider}: model did not return a JSON object.\n--- content start ---\n{content}\n--- content end ---"
    )))
}

/// Returns the first top-level balanced `{...}` substring, skipping braces
/// inside JSON strings.
fn extract_first_json_object(s: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in s.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if start.is_some() => in_string = true,
            b'{' => {
                start.get_or_insert(i);
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|st| &s[st..=i]);
                }
            }
            _ => {}
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::wire::{EnhancedPrompt, FrontendArtifact};
    use serde_json::json;

    fn prompt() -> ChatPrompt {
        ChatPrompt { system: "sys".into(), user: "user".into() }
    }

    #[test]
    fn extracts_object_from_fenced_text() {
        let text = "Sure!\n```json\n{\"a\": {\"b\": \"}\"}}\n```";
        assert_eq!(extract_first_json_object(text), Some("{\"a\": {\"b\": \"}\"}}"));
        assert_eq!(extract_first_json_object("no json here"), None);
    }

    #[test]
    fn parse_structured_rejects_non_objects() {
        assert!(parse_structured("test", "[1, 2]").is_err());
        let v = parse_structured("test", "prefix {\"enhanced_prompt\": \"x\"} suffix").unwrap();
        assert_eq!(v["enhanced_prompt"], "x");
    }

    #[tokio::test]
    async fn invoke_decodes_and_cleans() {
        let llm = completer(ScriptedProvider::default().reply(
            "Output",
            json!({"html_code": "<p>a</p>\\n", "css_code": "p {}\\t"}),
        ));
        let out: FrontendArtifact = llm.invoke("frontend", &prompt()).await.unwrap();
        assert_eq!(out.html_code, "<p>a</p>");
        assert_eq!(out.css_code, "p {}");
    }

    #[tokio::test]
    async fn invoke_maps_schema_mismatch_to_provider_error() {
        let llm = completer(ScriptedProvider::default().reply("EnhancePrompt", json!({"nope": 1})));
        let err = llm.invoke::<EnhancedPrompt>("enhance", &prompt()).await.unwrap_err();
        assert!(matches!(err, CodeGenError::Provider(ref m) if m.contains("EnhancePrompt")));
    }

    #[tokio::test]
    async fn invoke_is_bounded_by_deadline() {
        let llm = Completer::new(Arc::new(HangingProvider), Duration::from_millis(20));
        let err = llm.invoke::<EnhancedPrompt>("enhance", &prompt()).await.unwrap_err();
        assert!(matches!(err, CodeGenError::Provider(ref m) if m.contains("no response")));
    }

    #[tokio::test]
    async fn run_scoped_completer_saves_transcripts() {
        let root = tempfile::tempdir().unwrap();
        let run = Uuid::new_v4();
        let llm = completer(
            ScriptedProvider::default().reply("EnhancePrompt", json!({"enhanced_prompt": "more"})),
        )
        .with_transcripts(root.path())
        .for_run(run);

        let _: EnhancedPrompt = llm.invoke("enhance", &prompt()).await.unwrap();
        let dir = root.path().join(run.to_string());
        assert!(dir.join("enhance.request.json").exists());
        assert!(dir.join("enhance.response.json").exists());
    }

    #[test]
    fn make_provider_requires_openai_key() {
        let cfg = Config::default();
        assert!(make_provider(&cfg, &Credentials::default()).is_err());
        let creds = Credentials { openai_api_key: Some("sk-test".into()), ..Default::default() };
        assert!(make_provider(&cfg, &creds).is_ok());
    }
}
