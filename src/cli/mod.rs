use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(alias = "open-ai", alias = "openai")]
    OpenAI,
    #[value(alias = "anthropic")]
    Anthropic,
    #[value(alias = "ollama")]
    Ollama,
}

#[derive(Parser, Debug)]
#[command(name = "vibe_pagegen", version, about = "Generate web pages and API scaffolds from a prompt, packaged as ZIP archives")]
pub struct Args {
    /// TOML or YAML file merged over the built-in defaults
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, global = true, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Address the HTTP API listens on
    #[arg(long, global = true, env = "VIBE_BIND")]
    pub bind: Option<String>,

    /// Directory the generated archives are stored in
    #[arg(long, global = true)]
    pub artifacts_dir: Option<String>,

    /// Save every completion request/response under this directory
    #[arg(long, global = true)]
    pub transcripts_dir: Option<String>,

    /// Keep archives in memory instead of on disk
    #[arg(long, global = true, default_value_t = false)]
    pub memory_store: bool,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Run one generation locally and print the archive location
    Generate {
        #[arg(long)]
        prompt: String,

        /// Use the prompt as-is instead of enhancing it first
        #[arg(long, default_value_t = false)]
        already_enhanced: bool,
    },
}
