use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Installs the global subscriber. `RUST_LOG` wins over `debug`.
pub fn init(debug: bool, json: bool) -> anyhow::Result<()> {
    let default = if debug { "vibe_pagegen=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(false)).try_init()?;
    }
    Ok(())
}

pub struct SavedPaths {
    pub dir: PathBuf,
    pub request: PathBuf,
    pub response: PathBuf,
}

/// Per-run directory of completion request/response pairs.
#[derive(Debug, Clone)]
pub struct Transcript {
    dir: PathBuf,
}

impl Transcript {
    pub fn new(root: &Path, run: Uuid) -> Self {
        Self { dir: root.join(run.to_string()) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_stage<Req: Serialize, Resp: Serialize>(
        &self,
        stage: &str,
        req: &Req,
        resp: &Resp,
    ) -> anyhow::Result<SavedPaths> {
        fs::create_dir_all(&self.dir)?;

        let request = self.dir.join(format!("{stage}.request.json"));
        fs::write(&request, to_string_pretty(req)?)?;

        let response = self.dir.join(format!("{stage}.response.json"));
        fs::write(&response, to_string_pretty(resp)?)?;

        Ok(SavedPaths { dir: self.dir.clone(), request, response })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_stage_writes_pretty_pair() {
        let root = tempfile::tempdir().unwrap();
        let run = Uuid::new_v4();
        let t = Transcript::new(root.path(), run);

        let saved = t
            .save_stage("frontend", &json!({"user": "hi"}), &json!({"html_code": "<p></p>"}))
            .unwrap();

        assert_eq!(saved.dir, root.path().join(run.to_string()));
        let body = fs::read_to_string(&saved.response).unwrap();
        assert!(body.contains("\"html_code\""));
        assert!(saved.request.ends_with("frontend.request.json"));
    }
}
