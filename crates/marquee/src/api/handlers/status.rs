//! Service status handler.

use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::json;

use crate::api::state::AppState;

/// Status payload.
#[derive(Debug, Serialize)]
pub struct AppStatus {
    pub status: String,
    pub environment: String,
    pub version: String,
}

/// Report that the service is up.
pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = AppStatus {
        status: "Available".to_string(),
        environment: state.environment.clone(),
        version: state.version.clone(),
    };
    Json(json!({ "status": status }))
}
