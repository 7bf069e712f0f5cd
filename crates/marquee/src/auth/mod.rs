//! Authentication module.
//!
//! Provides stateless HS256 access tokens:
//! - credential verification and token issuance (signin)
//! - bearer token validation middleware for protected routes

mod claims;
mod config;
mod error;
mod middleware;
mod signin;

pub use claims::Claims;
pub use config::{AuthConfig, ConfigValidationError, PLACEHOLDER_JWT_SECRET};
pub use error::AuthError;
pub use middleware::{
    AuthState, CurrentUser, TOKEN_TTL_HOURS, auth_middleware, bearer_token_from_header,
};
pub use signin::{Credentials, prepare_dummy_hash, signin};
