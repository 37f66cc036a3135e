use tracing::info;

use crate::errors::CodeGenError;
use crate::prompt;
use crate::provider::Completer;
use crate::wire::{BackendArtifact, FormField};

pub const ENTRYPOINT_PATH: &str = "app/main.py";
pub const MANIFEST_PATH: &str = "requirements.txt";

/// Asks for a CRUD API over `fields`. The returned sources are opaque text;
/// nothing checks that they run.
pub async fn generate_scaffold(
    llm: &Completer,
    fields: &[FormField],
) -> Result<BackendArtifact, CodeGenError> {
    let out: BackendArtifact = llm.invoke("backend", &prompt::backend(fields)).await?;
    info!(
        fields = fields.len(),
        main_bytes = out.main_file.len(),
        manifest_lines = out.requirements_file.lines().count(),
        "backend scaffold generated"
    );
    Ok(out)
}

/// Files of the scaffold, keyed by path relative to the `backend/` folder.
pub fn backend_files(backend: &BackendArtifact) -> Vec<(String, String)> {
    vec![
        (ENTRYPOINT_PATH.to_string(), backend.main_file.clone()),
        (MANIFEST_PATH.to_string(), backend.requirements_file.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedProvider;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn scaffold_is_cleaned_and_seeded_with_fields() {
        let provider = Arc::new(ScriptedProvider::default().reply(
            "BackendOutput",
            json!({
                "main_file": "from fastapi import FastAPI\\napp = FastAPI()",
                "requirements_file": "fastapi\nuvicorn"
            }),
        ));
        let llm = Completer::new(provider.clone(), Duration::from_secs(5));
        let fields = vec![FormField::new("email", "email")];

        let out = generate_scaffold(&llm, &fields).await.unwrap();
        assert_eq!(out.main_file, "from fastapi import FastAPIapp = FastAPI()");
        assert_eq!(out.requirements_file, "fastapi\nuvicorn");

        let seen = provider.seen.lock();
        assert_eq!(seen[0].1.system, "You are an API designer.");
        assert!(seen[0].1.user.contains(r#""name":"email""#));
    }

    #[tokio::test]
    async fn empty_field_list_still_requests_scaffold() {
        let llm = crate::provider::testing::completer(ScriptedProvider::default().reply(
            "BackendOutput",
            json!({"main_file": "app = FastAPI()", "requirements_file": "fastapi"}),
        ));
        assert!(generate_scaffold(&llm, &[]).await.is_ok());
    }

    #[test]
    fn files_map_to_nested_keys() {
        let files = backend_files(&BackendArtifact {
            main_file: "main".into(),
            requirements_file: "reqs".into(),
        });
        assert_eq!(files[0], ("app/main.py".to_string(), "main".to_string()));
        assert_eq!(files[1].0, "requirements.txt");
    }
}
