use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Every failure a pipeline run or a download can surface to the caller.
#[derive(Error, Debug)]
pub enum CodeGenError {
    /// The completion provider failed, rejected the call, timed out, or
    /// returned output that does not match the requested schema.
    #[error("provider error: {0}")]
    Provider(String),
    /// Writing, compressing or reading an artifact failed.
    #[error("storage error: {0}")]
    Storage(String),
    /// The request body or path was malformed.
    #[error("validation error: {0}")]
    Validation(String),
    #[error("artifact not found: {0}")]
    NotFound(String),
}

impl CodeGenError {
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("{context}: {err}"))
    }

    pub fn provider(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Provider(format!("{context}: {err}"))
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Provider(_) => "provider_error",
            Self::Storage(_) => "storage_error",
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for CodeGenError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "status": status.as_u16(),
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(CodeGenError::Provider("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            CodeGenError::Storage("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            CodeGenError::Validation("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(CodeGenError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn response_carries_kind() {
        let resp = CodeGenError::provider("openai", "quota exceeded").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(CodeGenError::Storage(String::new()).kind(), "storage_error");
    }
}
