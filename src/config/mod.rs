use anyhow::{bail, Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::cli::{Args, ProviderKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub artifacts_dir: String,
    pub scratch_dir: Option<String>,
    pub transcripts_dir: Option<String>,
    pub openai_url: String,
    pub anthropic_url: String,
    pub anthropic_version: String,
    pub ollama_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".into(),
            provider: ProviderKind::OpenAI,
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            timeout_secs: 120,
            max_tokens: 4096,
            artifacts_dir: "project".into(),
            scratch_dir: None,
            transcripts_dir: None,
            openai_url: "https://api.openai.com".into(),
            anthropic_url: "https://api.anthropic.com".into(),
            anthropic_version: "2023-06-01".into(),
            ollama_url: "http://localhost:11434".into(),
        }
    }
}

impl Config {
    /// Defaults, then the optional config file, then CLI flags.
    pub fn load(args: &Args) -> Result<Self> {
        let mut cfg = match &args.config {
            Some(path) => Self::from_file(Path::new(path))?,
            None => Self::default(),
        };
        cfg.apply_args(args);
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext {
            "toml" => toml::from_str(&text)
                .with_context(|| format!("invalid TOML config {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&text)
                .with_context(|| format!("invalid YAML config {}", path.display())),
            other => bail!("unsupported config extension {other:?} (expected .toml, .yaml or .yml)"),
        }
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(p) = args.provider {
            self.provider = p;
        }
        if let Some(m) = &args.model {
            self.model = m.clone();
        }
        if let Some(t) = args.timeout_secs {
            self.timeout_secs = t;
        }
        if let Some(d) = &args.artifacts_dir {
            self.artifacts_dir = d.clone();
        }
        if let Some(d) = &args.transcripts_dir {
            self.transcripts_dir = Some(d.clone());
        }
        if let Some(bind) = &args.bind {
            self.bind = bind.clone();
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
