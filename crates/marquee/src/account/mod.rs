//! Account records and the read-only lookup used by signin.

mod file_store;
mod repository;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub use file_store::JsonFileAccountStore;
pub use repository::AccountRepository;

/// Account that may sign in.
///
/// The JSON aliases accept the capitalised keys of legacy user files
/// (`{"ID": 1, "Email": "...", "Password": "$2a$..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    #[serde(alias = "ID")]
    pub id: i64,
    #[serde(alias = "Email")]
    pub email: String,
    /// bcrypt hash.
    #[serde(alias = "Password", alias = "password", skip_serializing)]
    pub password_hash: String,
}

/// Read-only account lookup.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find the account whose email equals `username` exactly.
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Account>>;
}
