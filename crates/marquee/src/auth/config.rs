//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Placeholder secret shipped in generated config files.
pub const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for HS256 token signing. Accepts `env:VAR_NAME`.
    pub jwt_secret: Option<String>,

    /// Issuer written into and required from every token.
    pub issuer: String,

    /// Comma-separated audience list. All entries are written into issued
    /// tokens; only the first is accepted when validating.
    pub audiences: String,

    /// Upper bound for the account lookup during signin.
    pub lookup_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // No default JWT secret - must be explicitly configured
            jwt_secret: None,
            issuer: "marquee".to_string(),
            audiences: "marquee-web".to_string(),
            lookup_timeout_secs: 3,
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    /// Returns the resolved secret or None if not configured.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.jwt_secret {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }

    /// Configured audiences, trimmed, empty entries dropped.
    pub fn audience_list(&self) -> Vec<String> {
        self.audiences
            .split(',')
            .map(str::trim)
            .filter(|aud| !aud.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Validate the configuration.
    ///
    /// A secret, an issuer and at least one audience are always required.
    /// In production the secret must also be long and not the placeholder.
    pub fn validate(&self, production: bool) -> Result<(), ConfigValidationError> {
        let secret = self
            .resolve_jwt_secret()?
            .filter(|s| !s.is_empty())
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        if production {
            if secret == PLACEHOLDER_JWT_SECRET {
                return Err(ConfigValidationError::InsecureJwtSecret);
            }
            if secret.len() < 32 {
                return Err(ConfigValidationError::JwtSecretTooShort);
            }
        }

        if self.issuer.trim().is_empty() {
            return Err(ConfigValidationError::MissingIssuer);
        }

        if self.audience_list().is_empty() {
            return Err(ConfigValidationError::MissingAudience);
        }

        Ok(())
    }

    /// Generate a secure random JWT secret using cryptographically secure RNG.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    /// JWT secret is missing or empty.
    #[error("JWT secret is required. Set JWT_SECRET or auth.jwt_secret in config.")]
    MissingJwtSecret,
    /// JWT secret is the placeholder value.
    #[error("JWT secret cannot be the placeholder value in production.")]
    InsecureJwtSecret,
    /// JWT secret is too short (minimum 32 characters).
    #[error("JWT secret must be at least 32 characters long in production.")]
    JwtSecretTooShort,
    /// Issuer is empty.
    #[error("JWT issuer is required. Set JWT_ISS or auth.issuer in config.")]
    MissingIssuer,
    /// Audience list has no usable entry.
    #[error("At least one JWT audience is required. Set JWT_AUD or auth.audiences in config.")]
    MissingAudience,
    /// Environment variable not found (for `env:VAR_NAME` syntax).
    #[error("Environment variable '{0}' not found (referenced via env:{0} in config).")]
    EnvVarNotFound(String),
    /// Environment variable is empty (for `env:VAR_NAME` syntax).
    #[error("Environment variable '{0}' is empty (referenced via env:{0} in config).")]
    EnvVarEmpty(String),
}
