//! GraphQL endpoint over the catalog.

use axum::{Json, body::Bytes, extract::State};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// Run a catalog query.
///
/// The body is either a GraphQL JSON request (`{"query": ...}`) or the bare
/// query text. Queries that fail to parse or validate answer with the
/// error envelope.
pub async fn graphql(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<async_graphql::Response>> {
    let request = graphql_request(&body)?;
    debug!(query = %request.query, "GraphQL request");

    let response = state.graphql.execute(request).await;
    if response.is_err() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(ApiError::bad_request(format!(
            "graphql query failed: {}",
            messages.join("; ")
        )));
    }

    Ok(Json(response))
}

fn graphql_request(body: &[u8]) -> ApiResult<async_graphql::Request> {
    if let Ok(request) = serde_json::from_slice::<async_graphql::Request>(body) {
        return Ok(request);
    }

    let query = std::str::from_utf8(body)
        .map_err(|_| ApiError::bad_request("graphql query is not valid UTF-8"))?
        .trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("missing graphql query"));
    }
    Ok(async_graphql::Request::new(query))
}
