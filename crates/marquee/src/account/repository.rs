//! Account repository for database operations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::{Account, AccountStore};

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Create a new account repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get an account by email. Comparison is case-sensitive.
    #[instrument(skip_all)]
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        Ok(account)
    }

    /// Create an account from an already hashed password.
    #[instrument(skip(self, password_hash))]
    pub async fn create(&self, email: &str, password_hash: &str) -> Result<Account> {
        if self.get_by_email(email).await?.is_some() {
            anyhow::bail!("Email '{}' is already registered.", email);
        }

        debug!("Creating account");

        let id = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES (?, ?)
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .context("Failed to insert account")?
        .last_insert_rowid();

        Ok(Account {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        })
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.get_by_email(username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn repo() -> AccountRepository {
        let db = Database::in_memory().await.unwrap();
        AccountRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repo().await;
        let created = repo.create("admin@site.com", "$2b$04$hash").await.unwrap();

        let found = repo.find_by_username("admin@site.com").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.password_hash, "$2b$04$hash");
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let repo = repo().await;
        repo.create("admin@site.com", "$2b$04$hash").await.unwrap();

        assert!(repo.find_by_username("Admin@Site.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = repo().await;
        repo.create("admin@site.com", "$2b$04$hash").await.unwrap();

        let err = repo.create("admin@site.com", "$2b$04$other").await.unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }
}
