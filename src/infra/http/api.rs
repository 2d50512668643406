use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;

use crate::application::{comments::CommentIngestService, error::ErrorReport};
use crate::domain::comments::CommentSubmission;

use super::RouterState;

#[derive(Clone)]
pub struct ApiState {
    pub comments: CommentIngestService,
}

pub fn build_api_router() -> Router<RouterState> {
    Router::new().route("/api/createComment", post(create_comment))
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const CONTENT_STORE: &str = "content_store";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: codes::BAD_REQUEST,
            message: "Request body must be a JSON comment submission",
            detail: detail.into(),
        }
    }

    pub fn content_store(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            code: codes::CONTENT_STORE,
            message: "Comment could not be stored",
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::new("infra::http::api", format!("{}: {}", self.code, self.detail))
            .attach(&mut response);
        response
    }
}

#[derive(Debug, Serialize)]
struct CreatedComment {
    message: &'static str,
    id: String,
}

/// The body is parsed as JSON whatever its declared content type, so plain
/// `fetch` calls without headers are accepted.
async fn create_comment(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<CreatedComment>, ApiError> {
    let submission: CommentSubmission =
        serde_json::from_slice(&body).map_err(|err| ApiError::bad_request(err.to_string()))?;

    let id = state
        .comments
        .ingest(submission)
        .await
        .map_err(|err| ApiError::content_store(err.to_string()))?;

    Ok(Json(CreatedComment {
        message: "Comment submitted",
        id,
    }))
}
