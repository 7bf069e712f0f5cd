//! Credential verification and token issuance.

use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use serde::Deserialize;
use tokio::task::JoinError;

use super::{AuthError, AuthState};
use crate::account::AccountStore;

/// Hash compared against when no account matches, so a miss still pays for
/// a full bcrypt verification. Only dereference it on the blocking pool.
static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    bcrypt::hash("marquee-no-such-account", bcrypt::DEFAULT_COST).unwrap_or_default()
});

/// Compute the unknown-account hash ahead of the first signin.
///
/// Blocks for one bcrypt hash; call it from a blocking context.
pub fn prepare_dummy_hash() {
    Lazy::force(&DUMMY_HASH);
}

/// Check `password` against `stored`, or against the dummy hash when there
/// is no account. Runs bcrypt on the blocking pool.
async fn verify_password(password: String, stored: Option<String>) -> bool {
    let verified = tokio::task::spawn_blocking(move || {
        let hash = stored.as_deref().unwrap_or(DUMMY_HASH.as_str());
        bcrypt::verify(&password, hash).unwrap_or_else(|e| {
            warn!("stored password hash could not be checked: {}", e);
            false
        })
    })
    .await;
    verification_outcome(verified)
}

/// A verification task that panicked or was cancelled denies the signin.
fn verification_outcome(result: Result<bool, JoinError>) -> bool {
    result.unwrap_or_else(|e| {
        error!("password verification task failed: {}", e);
        false
    })
}

/// Signin request body.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Account username; the wire name is `email`.
    #[serde(rename = "email")]
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Verify a credential pair and issue a signed access token.
///
/// Unknown users and wrong passwords fail identically with
/// [`AuthError::InvalidCredentials`]. The account lookup is bounded by the
/// configured lookup timeout.
pub async fn signin(
    auth: &AuthState,
    accounts: &dyn AccountStore,
    credentials: Credentials,
) -> Result<String, AuthError> {
    let Credentials { username, password } = credentials;

    let account = tokio::time::timeout(auth.lookup_timeout(), accounts.find_by_username(&username))
        .await
        .map_err(|_| {
            AuthError::StoreError(format!(
                "account lookup timed out after {:?}",
                auth.lookup_timeout()
            ))
        })?
        .map_err(|e| AuthError::StoreError(format!("{e:#}")))?;

    let (account_id, stored) = match account {
        Some(account) => (Some(account.id), Some(account.password_hash)),
        None => {
            debug!("signin for unknown account");
            (None, None)
        }
    };

    let verified = verify_password(password, stored).await;

    match account_id {
        Some(id) if verified => {
            let token = auth.issue_token(id)?;
            info!("issued access token for account {}", id);
            Ok(token)
        }
        _ => Err(AuthError::InvalidCredentials),
    }
}
