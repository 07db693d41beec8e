use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use orgscope_core::{Error, OrganizationProfile};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process-organization/", post(process_organization))
        .route("/process-party/", post(process_party))
        .route("/organizations/{name}", get(get_organization))
}

#[derive(Debug, Deserialize)]
pub struct OrganizationRequest {
    pub organization_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PartyRequest {
    pub party_name: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn process_organization(
    State(state): State<AppState>,
    Json(req): Json<OrganizationRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    run(&state, &req.organization_name, "organization").await
}

async fn process_party(
    State(state): State<AppState>,
    Json(req): Json<PartyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    run(&state, &req.party_name, "party").await
}

async fn run(state: &AppState, name: &str, kind: &str) -> Result<Json<MessageResponse>, ApiError> {
    let _guard = state.process_lock.lock().await;

    state
        .processor
        .process(name)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(MessageResponse {
        message: format!("Data for {kind} '{name}' processed successfully."),
    }))
}

async fn get_organization(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<OrganizationProfile>, ApiError> {
    match state.storage().get_profile(&name).await {
        Ok(profile) => Ok(Json(profile)),
        Err(e @ Error::OrganizationNotFound(_)) => Err(ApiError::not_found(e)),
        Err(e) => Err(ApiError::internal(e)),
    }
}
