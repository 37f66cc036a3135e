use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ========================================
/// Completion contract: prompts and schemas
/// ========================================

/// A rendered two-turn prompt: one system instruction, one user turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// JSON schema handed to a provider alongside the prompt.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescriptor {
    pub name: &'static str,
    pub schema: Value,
}

/// A record the model is asked to return. The provider does not see the Rust
/// type, only its [`SchemaDescriptor`].
pub trait StructuredOutput: DeserializeOwned + Serialize + JsonSchema + Send {
    const NAME: &'static str;

    fn descriptor() -> SchemaDescriptor {
        let root = schemars::schema_for!(Self);
        let mut schema = serde_json::to_value(root).unwrap_or(Value::Null);
        if let Some(obj) = schema.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
            // Strict providers reject schemas that allow extra keys.
            obj.insert("additionalProperties".into(), Value::Bool(false));
        }
        SchemaDescriptor { name: Self::NAME, schema }
    }

    /// Sanitation run on every decoded record.
    fn clean(&mut self) {}
}

/// Removes literal two-character `\n` and `\t` sequences the model emits
/// inside string fields. Repeats until none remain, since a removal can join
/// a stray backslash to a following `n` or `t`.
pub fn strip_escapes(text: &str) -> String {
    let mut out = text.to_owned();
    while out.contains("\\n") || out.contains("\\t") {
        out = out.replace("\\n", "").replace("\\t", "");
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EnhancedPrompt {
    /// Give me the enhanced prompt for the given input
    pub enhanced_prompt: String,
}

impl StructuredOutput for EnhancedPrompt {
    const NAME: &'static str = "EnhancePrompt";
}

/// Generated page. `css_code` is always written as `index.css`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FrontendArtifact {
    /// Give me the html code for the title
    pub html_code: String,
    /// Give me the css code for the title
    pub css_code: String,
}

impl StructuredOutput for FrontendArtifact {
    const NAME: &'static str = "Output";

    fn clean(&mut self) {
        self.html_code = strip_escapes(&self.html_code);
        self.css_code = strip_escapes(&self.css_code);
    }
}

/// Generated API scaffold: one source file and its dependency manifest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BackendArtifact {
    /// Give me the main.py code for the title
    pub main_file: String,
    /// Give me the requirements.txt file for the application
    pub requirements_file: String,
}

impl StructuredOutput for BackendArtifact {
    const NAME: &'static str = "BackendOutput";

    fn clean(&mut self) {
        self.main_file = strip_escapes(&self.main_file);
        self.requirements_file = strip_escapes(&self.requirements_file);
    }
}

/// A named form control found in generated markup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { name: name.into(), kind: kind.into() }
    }
}

/// One pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub enhance: bool,
}

/// ========================================
/// HTTP bodies
/// ========================================

fn default_true() -> bool {
    true
}

/// Body of `POST /app/code`. `is_enhanced` tells whether the caller already
/// enhanced the prompt; `false` routes it through the enhancer first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRequest {
    pub prompt: String,
    #[serde(default = "default_true")]
    pub is_enhanced: bool,
}

impl CodeRequest {
    pub fn into_generation(self) -> GenerationRequest {
        GenerationRequest { prompt: self.prompt, enhance: !self.is_enhanced }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeResponse {
    pub status: u16,
    pub message: String,
    pub file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_escapes_removes_literal_sequences() {
        let cleaned = strip_escapes(r"<div>\n\t<p>hi</p>\n</div>");
        assert_eq!(cleaned, "<div><p>hi</p></div>");
        assert!(!cleaned.contains(r"\n"));
    }

    #[test]
    fn strip_escapes_handles_rejoined_sequences() {
        // `\\nn` leaves `\n` after a single pass
        let cleaned = strip_escapes(r"a\\nnb");
        assert!(!cleaned.contains(r"\n"));
        assert!(!cleaned.contains(r"\t"));
    }

    #[test]
    fn strip_escapes_keeps_real_newlines() {
        assert_eq!(strip_escapes("a\nb\tc"), "a\nb\tc");
    }

    #[test]
    fn frontend_clean_touches_both_fields() {
        let mut out = FrontendArtifact {
            html_code: r"<html>\n</html>".into(),
            css_code: r"body {\t}".into(),
        };
        out.clean();
        assert_eq!(out.html_code, "<html></html>");
        assert_eq!(out.css_code, "body {}");
    }

    #[test]
    fn descriptor_is_strict_object_schema() {
        let d = BackendArtifact::descriptor();
        assert_eq!(d.name, "BackendOutput");
        assert_eq!(d.schema["type"], "object");
        assert_eq!(d.schema["additionalProperties"], false);
        let required = d.schema["required"].as_array().cloned().unwrap_or_default();
        assert!(required.contains(&Value::from("main_file")));
        assert!(required.contains(&Value::from("requirements_file")));
        assert!(d.schema.get("$schema").is_none());
    }

    #[test]
    fn code_request_defaults_to_already_enhanced() {
        let req: CodeRequest = serde_json::from_str(r#"{"prompt":"login form"}"#).unwrap();
        assert!(req.is_enhanced);
        assert!(!req.into_generation().enhance);

        let req: CodeRequest =
            serde_json::from_str(r#"{"prompt":"login form","is_enhanced":false}"#).unwrap();
        assert!(req.into_generation().enhance);
    }

    #[test]
    fn form_field_serializes_type_key() {
        let v = serde_json::to_value(FormField::new("email", "email")).unwrap();
        assert_eq!(v, serde_json::json!({"name": "email", "type": "email"}));
    }
}
