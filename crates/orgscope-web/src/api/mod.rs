mod organizations;
mod reports;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .merge(reports::router())
        .merge(organizations::router())
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to the orgscope API for reports and organization data"
    }))
}

/// Error response rendered as `{"detail": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn not_found(detail: impl ToString) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.to_string(),
        }
    }

    pub fn internal(detail: impl ToString) -> Self {
        let detail = detail.to_string();
        tracing::error!("Request failed: {}", detail);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
