use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use whatif_generation::{GenerationError, GenerationKind};
use whatif_persist::PersistError;
use whatif_tree::TreeError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request format: {0}")]
    BadRequest(String),

    #[error("Maximum branching depth ({0}) reached")]
    DepthLimit(usize),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to generate {kind}: {message}")]
    Generation { kind: &'static str, message: String },

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Translate a gateway failure for the given operation
    pub fn generation(kind: GenerationKind, err: GenerationError) -> Self {
        match err {
            GenerationError::Configuration(msg) => Self::Config(msg),
            GenerationError::Validation(msg) => Self::BadRequest(format!("Validation error: {}", msg)),
            GenerationError::Parse(msg) => Self::BadRequest(format!("Failed to parse JSON response: {}", msg)),
            GenerationError::DepthLimit(max) => Self::DepthLimit(max),
            GenerationError::Provider(e) => Self::Generation {
                kind: kind.as_str(),
                message: e.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::DepthLimit(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Config(_) | ApiError::Generation { .. } | ApiError::Persist(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<TreeError> for ApiError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::NodeNotFound(_) | TreeError::TimelineNotFound(_) | TreeError::NoActiveTimeline => {
                ApiError::NotFound(err.to_string())
            }
            TreeError::DepthLimitExceeded { max, .. } => ApiError::DepthLimit(max),
            TreeError::CannotDeleteRoot(_) | TreeError::EmptyMilestones => ApiError::BadRequest(err.to_string()),
            TreeError::StaleVersion { .. } => ApiError::Conflict(err.to_string()),
            TreeError::Corrupt(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(_) | ApiError::DepthLimit(_) | ApiError::NotFound(_) | ApiError::Conflict(_) => {
                tracing::warn!("Request rejected: {}", self);
                self.to_string()
            }
            ApiError::Config(msg) => {
                tracing::error!("Config error: {}", msg);
                "Server configuration error. Please contact support.".to_string()
            }
            ApiError::Generation { kind, message } => {
                tracing::error!(kind = %kind, "Generation error: {}", message);
                format!("Failed to generate {}. Please try again.", kind)
            }
            ApiError::Persist(e) => {
                tracing::error!("Persistence error: {}", e);
                "Storage error".to_string()
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
