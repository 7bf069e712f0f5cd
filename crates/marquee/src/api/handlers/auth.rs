//! Signin handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::json;

use crate::api::state::AppState;
use crate::auth::{self, AuthError, Credentials};

/// Exchange an email and password for an access token.
///
/// Responds with `{"response": "<token>"}`.
pub async fn signin(
    State(state): State<AppState>,
    credentials: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let Json(credentials) =
        credentials.map_err(|rejection| AuthError::UnreadableCredentials(rejection.body_text()))?;

    let token = auth::signin(&state.auth, state.accounts.as_ref(), credentials).await?;
    Ok(Json(json!({ "response": token })))
}
