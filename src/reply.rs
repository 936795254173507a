use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use personal_site::validation::{FieldErrors, Submission};
use serde::Serialize;
use serde_json::json;

/// Failure of a request. Internal causes are logged when the error is built
/// and never sent to the client.
#[derive(Debug)]
pub enum ApiError {
    Internal,
    NotFound(&'static str),
    Rejected(FieldErrors),
    Unauthorized,
}

impl From<personal_site::Error> for ApiError {
    fn from(e: personal_site::Error) -> Self {
        tracing::error!("request failed: {}", e);
        Self::Internal
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        tracing::error!("blocking task failed: {}", e);
        Self::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "fail",
                    "message": "Internal server error"
                })),
            )
                .into_response(),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "status": "fail",
                    "message": format!("{} not found", what)
                })),
            )
                .into_response(),
            Self::Rejected(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "status": "fail",
                    "errors": errors
                })),
            )
                .into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "status": "fail",
                    "message": "Unauthorized"
                })),
            )
                .into_response(),
        }
    }
}

pub fn found<T>(value: Option<T>, what: &'static str) -> Result<Json<T>, ApiError> {
    value.map(Json).ok_or(ApiError::NotFound(what))
}

pub fn saved<T: Serialize>(
    submission: Submission<T>,
    status: StatusCode,
) -> Result<Response, ApiError> {
    match submission {
        Submission::Saved(value) => Ok((status, Json(value)).into_response()),
        Submission::Rejected(errors) => {
            tracing::info!("submission rejected with {} field errors", errors.len());
            Err(ApiError::Rejected(errors))
        }
    }
}

pub fn deleted(found: bool, what: &'static str) -> Result<StatusCode, ApiError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(what))
    }
}
