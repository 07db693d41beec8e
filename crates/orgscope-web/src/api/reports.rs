use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use orgscope_core::{report_file_name, Report, ReportError, SourceDocument};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-report/", post(generate_report))
        .route("/search/", post(search))
}

const fn default_max_results() -> usize {
    3
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub topic: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SourceDocument>,
}

async fn generate_report(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<Report>, ApiError> {
    let generator = state.reports.as_ref().ok_or_else(|| {
        ApiError::internal("Report generation requires GOOGLE_API_KEY, GOOGLE_CSE_ID and GROQ_API_KEY")
    })?;

    let report = match generator.generate(&req.topic, req.max_results).await {
        Ok(report) => report,
        Err(e @ ReportError::NoSources(_)) => return Err(ApiError::not_found(e)),
        Err(e) => return Err(ApiError::internal(e)),
    };

    if let Some(dir) = &state.config.report_dir {
        let path = dir.join(report_file_name(&req.topic));
        if let Err(e) = report.save(&path) {
            tracing::warn!("Could not save report to {}: {}", path.display(), e);
        }
    }

    Ok(Json(report))
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let sources = state
        .sources
        .as_ref()
        .ok_or_else(|| ApiError::internal("Web search requires GOOGLE_API_KEY and GOOGLE_CSE_ID"))?;

    let results = sources
        .try_collect(&query.query, query.max_results)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(SearchResponse { results }))
}
