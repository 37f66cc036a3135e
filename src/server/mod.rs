use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::errors::CodeGenError;
use crate::pipeline::CodePipeline;
use crate::store::{ArchiveId, ArtifactStore};
use crate::wire::{CodeRequest, CodeResponse};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CodePipeline>,
    pub store: Arc<dyn ArtifactStore>,
}

impl AppState {
    /// Serves downloads from the same store the pipeline packages into.
    pub fn new(pipeline: CodePipeline) -> Self {
        let store = pipeline.packager().store().clone();
        Self { pipeline: Arc::new(pipeline), store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/app/code", post(generate_code))
        .route("/app/file/{filename}", get(download))
        .with_state(state)
}

async fn generate_code(
    State(state): State<AppState>,
    body: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<CodeResponse>, CodeGenError> {
    let Json(body) = body.map_err(|e| CodeGenError::Validation(e.body_text()))?;
    let req = body.into_generation();
    info!(enhance = req.enhance, prompt_chars = req.prompt.len(), "code generation requested");

    let result = state.pipeline.run(req).await?;
    Ok(Json(CodeResponse {
        status: 200,
        message: "Success".into(),
        file: result.archive_id.to_string(),
    }))
}

async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, CodeGenError> {
    let id = ArchiveId::parse(&filename)?;
    let store = state.store.clone();
    let lookup = id.clone();
    let archive = tokio::task::spawn_blocking(move || store.get(&lookup))
        .await
        .map_err(|e| CodeGenError::storage("download task", e))??
        .ok_or_else(|| CodeGenError::NotFound(id.to_string()))?;

    let disposition = format!("attachment; filename=\"{}\"", id.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response())
}
