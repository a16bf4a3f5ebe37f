use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StoreError;
use chat_llm::ChatError;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Bad logical model name; the turn fails before any persistence.
    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    /// Network/timeout/HTTP failure from the LLM call. The turn is
    /// aborted and partial assistant content is not persisted.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Store unavailable. Distinct from provider failures so clients
    /// can retry without duplicate user-message insertion.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Always suppressed by the turn pipeline; surfaced only in logs.
    #[error("Title generation failed: {0}")]
    TitleGeneration(String),

    #[error("Conversation '{0}' not found")]
    ConversationNotFound(String),

    #[error("Message '{0}' not found")]
    MessageNotFound(String),

    /// Client disconnected mid-turn; nothing persisted, nothing emitted.
    #[error("Turn cancelled by client disconnect")]
    Cancelled,
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::UnknownModel(name) => AppError::UnknownModel(name),
            other => AppError::Provider(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

#[derive(Serialize)]
struct JsonError {
    message: String,
    r#type: String,
}

#[derive(Serialize)]
struct JsonErrorWrapper {
    error: JsonError,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::UnknownModel(_) => StatusCode::BAD_REQUEST,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::TitleGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
            AppError::MessageNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_response = JsonErrorWrapper {
            error: JsonError {
                message: self.to_string(),
                r#type: "api_error".to_string(),
            },
        };
        HttpResponse::build(status_code).json(error_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_maps_from_chat_error() {
        let err: AppError = ChatError::UnknownModel("GPT-9000".to_string()).into();
        assert!(matches!(err, AppError::UnknownModel(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_errors_map_to_bad_gateway() {
        let err: AppError = ChatError::Api("HTTP 500".to_string()).into();
        assert!(matches!(err, AppError::Provider(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn store_errors_map_to_persistence() {
        let err: AppError = StoreError::Io(std::io::Error::other("disk gone")).into();
        assert!(matches!(err, AppError::Persistence(_)));
    }
}
