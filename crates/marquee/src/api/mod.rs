//! HTTP API module.
//!
//! Public catalog, GraphQL and signin endpoints plus the token-protected
//! admin routes.

mod error;
pub mod graphql;
pub mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorBody, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
