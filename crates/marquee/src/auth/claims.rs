//! JWT claims carried by access tokens.

use serde::{Deserialize, Deserializer, Serialize};

/// JWT claims structure.
///
/// Timestamps are Unix seconds. The subject is the account id rendered as a
/// string, never the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID).
    pub sub: String,

    /// Issuer.
    pub iss: String,

    /// Audiences.
    #[serde(deserialize_with = "one_or_many")]
    pub aud: Vec<String>,

    /// Issued at.
    pub iat: i64,

    /// Not before.
    pub nbf: i64,

    /// Expiration time.
    pub exp: i64,
}

impl Claims {
    /// Whether the token is inside its validity window at `now`.
    ///
    /// The window is half-open: `nbf` is inclusive, `exp` is exclusive.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.nbf <= now && now < self.exp
    }

    /// Whether `audience` is one of the token's audiences.
    pub fn accepts_audience(&self, audience: &str) -> bool {
        self.aud.iter().any(|aud| aud == audience)
    }
}

/// RFC 7519 allows `aud` to be a single string or an array of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(aud) => vec![aud],
        OneOrMany::Many(aud) => aud,
    })
}
