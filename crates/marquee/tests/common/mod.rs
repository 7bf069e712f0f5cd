//! Test utilities and common setup.
#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use axum::Router;
use marquee::account::{AccountRepository, AccountStore, JsonFileAccountStore};
use marquee::api::{self, AppState};
use marquee::auth::{AuthConfig, AuthState};
use marquee::catalog::{CatalogRepository, MovieInput};
use marquee::db::Database;

pub const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";
pub const ADMIN_EMAIL: &str = "admin@site.com";
pub const ADMIN_PASSWORD: &str = "secret";

/// Everything a test needs to drive the router and inspect its effects.
pub struct TestApp {
    pub router: Router,
    pub auth: AuthState,
    pub catalog: CatalogRepository,
    pub admin_id: i64,
    /// Keeps the accounts file alive for file-backed apps.
    _accounts_file: Option<tempfile::NamedTempFile>,
}

/// Cheap hash for tests; production hashes use the default cost.
pub fn hash(password: &str) -> String {
    bcrypt::hash(password, 4).expect("Failed to hash password")
}

pub fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.jwt_secret = Some(TEST_SECRET.to_string());
    config.issuer = "marquee.test".to_string();
    config.audiences = "marquee.test, other.test".to_string();
    config
}

/// App backed by an in-memory database holding one admin account.
pub async fn test_app() -> TestApp {
    let database = Database::in_memory().await.expect("Failed to create database");
    let accounts = AccountRepository::new(database.pool().clone());
    let admin = accounts
        .create(ADMIN_EMAIL, &hash(ADMIN_PASSWORD))
        .await
        .expect("Failed to create admin account");

    build(database, Arc::new(accounts), admin.id, None)
}

/// App whose accounts come from a JSON file in the legacy key format.
pub async fn test_app_with_accounts_file() -> TestApp {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create accounts file");
    let body = serde_json::json!([
        { "ID": 7, "Email": ADMIN_EMAIL, "Password": hash(ADMIN_PASSWORD) },
        { "ID": 8, "Email": "editor@site.com", "Password": "not-a-bcrypt-hash" }
    ]);
    file.write_all(body.to_string().as_bytes())
        .expect("Failed to write accounts file");

    let database = Database::in_memory().await.expect("Failed to create database");
    let store = JsonFileAccountStore::new(file.path());
    build(database, Arc::new(store), 7, Some(file))
}

fn build(
    database: Database,
    accounts: Arc<dyn AccountStore>,
    admin_id: i64,
    accounts_file: Option<tempfile::NamedTempFile>,
) -> TestApp {
    let auth = AuthState::new(test_auth_config()).expect("Invalid test auth config");
    let catalog = CatalogRepository::new(database.pool().clone());
    let state = AppState::new(auth.clone(), accounts, catalog.clone(), "test");

    TestApp {
        router: api::create_router(state),
        auth,
        catalog,
        admin_id,
        _accounts_file: accounts_file,
    }
}

pub fn movie(title: &str, release_date: &str) -> MovieInput {
    MovieInput {
        title: title.to_string(),
        description: format!("{title} description"),
        year: release_date[..4].parse().expect("release date starts with a year"),
        release_date: release_date.to_string(),
        runtime: 120,
        rating: 4,
        mpaa_rating: "PG-13".to_string(),
    }
}
