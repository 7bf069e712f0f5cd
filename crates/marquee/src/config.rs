//! Layered application configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML config
//! file, then `MARQUEE__SECTION__KEY` environment variables. Command line
//! flags are applied on top by the binary.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthConfig, PLACEHOLDER_JWT_SECRET};

pub const APP_NAME: &str = "marquee";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub accounts: AccountsConfig,
    pub database: DatabaseConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deployment environment. `production` turns on strict secret checks.
    pub env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            env: "development".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// Where signin looks up accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountSource {
    /// JSON array of accounts on disk.
    File,
    /// `users` table of the application database.
    #[default]
    Database,
}

/// Account store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    pub source: AccountSource,
    /// Accounts file, used when `source = "file"`.
    pub file: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            source: AccountSource::Database,
            file: "users.json".to_string(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `marquee.db` in the data directory.
    pub path: Option<String>,
}

impl AppConfig {
    /// Load configuration from `config_file` (if present) and the environment.
    pub fn load(config_file: &Path) -> Result<Self> {
        Self::load_with_prefix(config_file, &env_prefix())
    }

    pub fn load_with_prefix(config_file: &Path, prefix: &str) -> Result<Self> {
        let defaults = ServerConfig::default();
        let auth = AuthConfig::default();

        let built = Config::builder()
            .set_default("server.host", defaults.host)?
            .set_default("server.port", i64::from(defaults.port))?
            .set_default("server.env", defaults.env)?
            .set_default("auth.issuer", auth.issuer)?
            .set_default("auth.audiences", auth.audiences)?
            .set_default("auth.lookup_timeout_secs", auth.lookup_timeout_secs as i64)?
            .add_source(
                File::from(config_file)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(prefix).separator("__"))
            .build()
            .with_context(|| format!("loading configuration from {}", config_file.display()))?;

        built
            .try_deserialize()
            .context("deserializing configuration")
    }

    /// Resolved database file.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => expand_str_path(path),
            None => Ok(default_data_dir()?.join(format!("{APP_NAME}.db"))),
        }
    }

    /// Resolved accounts file.
    pub fn accounts_file(&self) -> Result<PathBuf> {
        expand_str_path(&self.accounts.file)
    }

    /// Configuration written by `config init`.
    pub fn template() -> Self {
        let mut config = Self::default();
        config.auth.jwt_secret = Some(PLACEHOLDER_JWT_SECRET.to_string());
        config
    }
}

/// Write the default configuration to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let toml = toml::to_string_pretty(&AppConfig::template())
        .context("serializing default config to TOML")?;
    let body = format!(
        "# Configuration for {APP_NAME}\n# File: {}\n\n{toml}",
        path.display()
    );
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

/// Resolve the config file from an optional override. A directory override
/// means `config.toml` inside it.
pub fn config_file_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    let config_file = match override_path {
        Some(path) => {
            let expanded = expand_path(path)?;
            if expanded.is_dir() {
                expanded.join("config.toml")
            } else {
                expanded
            }
        }
        None => default_config_dir()?.join("config.toml"),
    };

    if config_file.parent().is_none() {
        return Err(anyhow!("invalid config file path: {config_file:?}"));
    }
    Ok(config_file)
}

fn expand_path(path: PathBuf) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        expand_str_path(text)
    } else {
        Ok(path)
    }
}

pub fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(APP_NAME));
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn default_data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(dir) = dirs::data_dir() {
        return Ok(dir.join(APP_NAME));
    }

    dirs::home_dir()
        .map(|home| home.join(".local").join("share").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine data directory"))
}

fn env_prefix() -> String {
    APP_NAME.to_ascii_uppercase()
}
