//! Opaque proxies for the agent's session endpoints

use super::{AppState, ServerError};
use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

pub async fn list_sessions(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    state
        .agent
        .list_sessions()
        .await
        .map(Json)
        .map_err(|e| ServerError::upstream("Failed to fetch sessions", &e))
}

pub async fn create_session(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    state
        .agent
        .create_session()
        .await
        .map(Json)
        .map_err(|e| ServerError::upstream("Failed to create session", &e))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    state
        .agent
        .get_session(&id)
        .await
        .map(Json)
        .map_err(|e| ServerError::upstream("Failed to fetch session", &e))
}
