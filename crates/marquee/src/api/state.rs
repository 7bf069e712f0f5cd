//! Application state shared across handlers.

use std::sync::Arc;

use super::graphql::{CatalogSchema, build_schema};
use crate::account::AccountStore;
use crate::auth::AuthState;
use crate::catalog::CatalogRepository;

/// Shared application state.
///
/// Everything in here is immutable or internally synchronized, so cloning
/// the state per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Token issuing and validation.
    pub auth: AuthState,
    /// Account lookup used by signin.
    pub accounts: Arc<dyn AccountStore>,
    /// Movies and genres.
    pub catalog: CatalogRepository,
    /// Read-only GraphQL schema over `catalog`.
    pub graphql: CatalogSchema,
    /// Deployment environment reported by `/status`.
    pub environment: String,
    /// Application version reported by `/status`.
    pub version: String,
}

impl AppState {
    pub fn new(
        auth: AuthState,
        accounts: Arc<dyn AccountStore>,
        catalog: CatalogRepository,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            accounts,
            graphql: build_schema(catalog.clone()),
            catalog,
            environment: environment.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("auth", &self.auth)
            .field("environment", &self.environment)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
