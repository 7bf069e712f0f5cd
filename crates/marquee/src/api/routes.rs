//! API route definitions.

use axum::http::{Method, header};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::auth_middleware;

use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    // Protected routes (require a bearer token)
    let protected_routes = Router::new()
        .route("/v1/admin/editmovie", post(handlers::edit_movie))
        .route("/v1/admin/deletemovie/{id}", get(handlers::delete_movie))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(state.clone());

    // Public routes
    let public_routes = Router::new()
        .route("/status", get(handlers::status))
        .route("/signin", post(handlers::signin))
        .route("/v1/signin", post(handlers::signin))
        .route("/v1/movie/{id}", get(handlers::get_movie))
        .route("/v1/movies", get(handlers::all_movies))
        .route("/v1/movies/{genre_id}", get(handlers::movies_by_genre))
        .route("/v1/genres", get(handlers::all_genres))
        .route("/v1/graphql", post(handlers::graphql))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(build_cors_layer())
        .layer(trace_layer)
}

/// Any origin may call the API; credentials travel in the Authorization
/// header, never in cookies.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
