use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use vibe_pagegen::cli::{self, Command};
use vibe_pagegen::config::Config;
use vibe_pagegen::package::Packager;
use vibe_pagegen::pipeline::CodePipeline;
use vibe_pagegen::provider::{self, Completer, Credentials};
use vibe_pagegen::store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore};
use vibe_pagegen::wire::GenerationRequest;
use vibe_pagegen::{log, server, ux};

fn build_pipeline(args: &cli::Args, cfg: &Config) -> anyhow::Result<CodePipeline> {
    let creds = Credentials::from_env();
    let prov = provider::make_provider(cfg, &creds)?;

    let mut llm = Completer::new(prov, cfg.timeout());
    if let Some(dir) = &cfg.transcripts_dir {
        llm = llm.with_transcripts(dir);
    }

    let store: Arc<dyn ArtifactStore> = if args.memory_store {
        Arc::new(MemoryArtifactStore::new())
    } else {
        Arc::new(FsArtifactStore::new(&cfg.artifacts_dir))
    };
    let mut packager = Packager::new(store);
    if let Some(dir) = &cfg.scratch_dir {
        packager = packager.with_scratch_root(dir);
    }

    Ok(CodePipeline::new(llm, packager))
}

async fn serve(cfg: &Config, pipeline: CodePipeline) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind))?;
    let addr = listener.local_addr()?.to_string();
    ux::print_banner(cfg, &addr);
    info!(%addr, "server started");

    let app = server::router(server::AppState::new(pipeline));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}

async fn generate_once(pipeline: CodePipeline, prompt: String, already_enhanced: bool) -> anyhow::Result<()> {
    let spinner = ux::StageSpinner::start();
    let req = GenerationRequest { prompt, enhance: !already_enhanced };
    match pipeline.run_with(req, |stage| spinner.on_stage(stage)).await {
        Ok(res) => {
            ux::print_result(&res);
            Ok(())
        }
        Err(e) => {
            ux::print_failure(&e);
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::Args::parse();
    log::init(args.debug, args.log_json)?;

    let cfg = Config::load(&args)?;
    let pipeline = build_pipeline(&args, &cfg)?;

    match args.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&cfg, pipeline).await,
        Command::Generate { prompt, already_enhanced } => {
            generate_once(pipeline, prompt, already_enhanced).await
        }
    }
}
