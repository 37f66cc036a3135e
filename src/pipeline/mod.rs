use std::fmt;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::enhance::enhance_prompt;
use crate::errors::CodeGenError;
use crate::extract::extract_fields;
use crate::frontend;
use crate::package::{PackagedResult, Packager};
use crate::provider::Completer;
use crate::scaffold::generate_scaffold;
use crate::wire::GenerationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Enhancing,
    Generating,
    ExtractingFields,
    ScaffoldingBackend,
    Packaging,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Received => "received",
            Stage::Enhancing => "enhancing prompt",
            Stage::Generating => "generating frontend",
            Stage::ExtractingFields => "extracting fields",
            Stage::ScaffoldingBackend => "scaffolding backend",
            Stage::Packaging => "packaging",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// enhance → generate → extract → scaffold → package, strictly in order.
#[derive(Clone)]
pub struct CodePipeline {
    llm: Completer,
    packager: Packager,
}

impl CodePipeline {
    pub fn new(llm: Completer, packager: Packager) -> Self {
        Self { llm, packager }
    }

    pub fn packager(&self) -> &Packager {
        &self.packager
    }

    pub async fn run(&self, req: GenerationRequest) -> Result<PackagedResult, CodeGenError> {
        self.run_with(req, |_| {}).await
    }

    /// Like [`run`](Self::run), reporting every stage entered. A failure
    /// reports [`Stage::Failed`] and returns the originating error as is.
    pub async fn run_with(
        &self,
        req: GenerationRequest,
        mut on_stage: impl FnMut(Stage) + Send,
    ) -> Result<PackagedResult, CodeGenError> {
        let run = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", %run);
        let mut stage = Stage::Received;
        on_stage(stage);

        let outcome = self
            .steps(run, req, &mut |next| {
                stage = next;
                info!(stage = %next, "stage");
                on_stage(next);
            })
            .instrument(span.clone())
            .await;

        let _enter = span.enter();
        match outcome {
            Ok(result) => {
                on_stage(Stage::Done);
                info!(archive = %result.archive_id, "pipeline done");
                Ok(result)
            }
            Err(e) => {
                error!(stage = %stage, kind = e.kind(), error = %e, "pipeline failed");
                on_stage(Stage::Failed);
                Err(e)
            }
        }
    }

    async fn steps(
        &self,
        run: Uuid,
        req: GenerationRequest,
        advance: &mut (dyn FnMut(Stage) + Send),
    ) -> Result<PackagedResult, CodeGenError> {
        if req.prompt.trim().is_empty() {
            return Err(CodeGenError::Validation("prompt must not be empty".into()));
        }
        let llm = self.llm.for_run(run);

        let prompt = if req.enhance {
            advance(Stage::Enhancing);
            enhance_prompt(&llm, &req.prompt).await?
        } else {
            req.prompt
        };

        advance(Stage::Generating);
        let page = frontend::generate(&llm, &prompt).await?;

        advance(Stage::ExtractingFields);
        let fields = extract_fields(&page.html_code);
        info!(fields = fields.len(), "form fields extracted");

        advance(Stage::ScaffoldingBackend);
        let backend = generate_scaffold(&llm, &fields).await?;

        advance(Stage::Packaging);
        let packager = self.packager.clone();
        tokio::task::spawn_blocking(move || packager.package(&page, &backend))
            .await
            .map_err(|e| CodeGenError::storage("packaging task", e))?
    }
}
