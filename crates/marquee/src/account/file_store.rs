//! Account store backed by a JSON file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Account, AccountStore};

/// Reads a JSON array of accounts on every lookup, so edits to the file are
/// picked up without a restart.
#[derive(Debug, Clone)]
pub struct JsonFileAccountStore {
    path: PathBuf,
}

impl JsonFileAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Vec<Account>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading accounts file {}", self.path.display()))?;

        serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing accounts file {}", self.path.display()))
    }
}

#[async_trait]
impl AccountStore for JsonFileAccountStore {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let accounts = self.load().await?;
        debug!(count = accounts.len(), "loaded accounts file");
        Ok(accounts.into_iter().find(|account| account.email == username))
    }
}
