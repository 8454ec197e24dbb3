use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};
use tokio::task::JoinError;

use super::types::ErrorResponse;
use crate::classifier::ClassifierError;

/// Everything a handler can fail with, mapped onto HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request rejected at the boundary, before the model was consulted
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Model(#[from] ClassifierError),
    #[error("inference task failed: {0}")]
    Task(#[from] JoinError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Model(e) => match e {
                ClassifierError::InvalidInput(_) | ClassifierError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                ClassifierError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
                ClassifierError::ModelLoad(_)
                | ClassifierError::Build(_)
                | ClassifierError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Model(ClassifierError::InvalidInput(_)) => "invalid_input",
            Self::Model(ClassifierError::Validation(_)) => "validation_error",
            Self::Model(ClassifierError::ModelNotLoaded) => "model_not_loaded",
            Self::Model(ClassifierError::ModelLoad(_)) => "model_load_error",
            Self::Model(_) | Self::Task(_) => "internal_error",
        }
    }

    /// Message safe to return to callers. Internal failures stay in the logs.
    fn detail(&self) -> String {
        match self {
            Self::Model(ClassifierError::Internal(_) | ClassifierError::Build(_)) | Self::Task(_) => {
                "Unexpected error while processing the prediction".to_string()
            }
            Self::Model(ClassifierError::ModelLoad(_)) => {
                "The model could not be loaded; the previous model, if any, is still serving".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self);
        } else {
            warn!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorResponse {
            error: self.kind().to_string(),
            detail: self.detail(),
            status_code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
