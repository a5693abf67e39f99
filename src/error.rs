use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::services::llm::LlmError;
use crate::services::store::StoreError;

/// Top-level error taxonomy for one request. Every variant maps to a plain
/// text response; per-slide transplant failures never reach this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error: Invalid JSON payload.")]
    InvalidPayload,

    #[error("Error: Missing '{0}' in JSON payload.")]
    MissingField(&'static str),

    #[error("Error: Unknown action '{0}'.")]
    UnknownAction(String),

    #[error("Error: Invalid Google Drive Folder URL format.")]
    InvalidFolderUrl,

    #[error("Error: Invalid 'slides_to_update' URL format.")]
    InvalidPresentationUrl,

    #[error("Error: No presentations or valid shortcuts to presentations found in folder '{0}'.")]
    NoPresentationsFound(String),

    #[error("Error: Could not find any slides with titles in the provided presentations.")]
    NoTitledSlidesFound,

    /// The selection model returned something that could not be decoded as
    /// the expected JSON object. Raw text is echoed for diagnosis.
    #[error("Error: The language model returned a non-JSON response: '{raw}'.")]
    OracleParse { raw: String },

    #[error("Error: Could not access presentation to update. {0}")]
    TargetNotAccessible(String),

    /// Document-store failure, including the final batch commit. Carries the
    /// upstream status code when one was observed.
    #[error("An API error occurred: {detail}")]
    Upstream { status: Option<u16>, detail: String },

    #[error("Language model call failed: {0}")]
    Llm(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidPayload
            | AppError::MissingField(_)
            | AppError::UnknownAction(_)
            | AppError::InvalidFolderUrl
            | AppError::InvalidPresentationUrl
            | AppError::NoPresentationsFound(_)
            | AppError::NoTitledSlidesFound => StatusCode::BAD_REQUEST,
            AppError::OracleParse { .. } | AppError::Llm(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::TargetNotAccessible(_) => StatusCode::FORBIDDEN,
            AppError::Upstream { status, .. } => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, "{}", self);
        } else {
            tracing::warn!(%status, "{}", self);
        }
        (status, self.to_string()).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Api { status, detail } => AppError::Upstream {
                status: Some(status),
                detail,
            },
            other => AppError::Upstream {
                status: None,
                detail: other.to_string(),
            },
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::Llm(err.to_string())
    }
}
