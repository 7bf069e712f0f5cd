//! Token issuance, validation and the request gate.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{AUTHORIZATION, VARY},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::{debug, warn};

use super::{AuthConfig, AuthError, Claims, ConfigValidationError};

/// Lifetime of every issued token, in hours.
pub const TOKEN_TTL_HOURS: i64 = 24;

fn token_ttl() -> chrono::Duration {
    chrono::Duration::hours(TOKEN_TTL_HOURS)
}

/// Extract a Bearer token from an Authorization header value.
///
/// Only the exact shape `Bearer <token>` is accepted: case-sensitive scheme,
/// a single space, and a non-empty token without whitespace.
pub fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

/// Authentication state shared across handlers.
///
/// Built once at startup from a validated [`AuthConfig`] and never mutated.
#[derive(Clone)]
pub struct AuthState {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audiences: Vec<String>,
    lookup_timeout: Duration,
}

impl AuthState {
    /// Create auth state from config.
    /// Resolves `env:VAR_NAME` syntax in jwt_secret at construction time.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigValidationError> {
        config.validate(false)?;

        let secret = config
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        Ok(Self {
            inner: Arc::new(AuthInner {
                encoding_key: EncodingKey::from_secret(secret.as_bytes()),
                decoding_key: DecodingKey::from_secret(secret.as_bytes()),
                issuer: config.issuer.clone(),
                audiences: config.audience_list(),
                lookup_timeout: Duration::from_secs(config.lookup_timeout_secs),
            }),
        })
    }

    /// Issuer written into tokens.
    pub fn issuer(&self) -> &str {
        &self.inner.issuer
    }

    /// The audience a token must carry to be accepted.
    ///
    /// Only the first configured entry is checked; see DESIGN.md.
    pub fn accepted_audience(&self) -> &str {
        self.inner
            .audiences
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Upper bound for the account lookup during signin.
    pub fn lookup_timeout(&self) -> Duration {
        self.inner.lookup_timeout
    }

    /// Build the claims for an account at `now`.
    pub fn claims_for(&self, account_id: i64, now: DateTime<Utc>) -> Claims {
        let iat = now.timestamp();
        Claims {
            sub: account_id.to_string(),
            iss: self.inner.issuer.clone(),
            aud: self.inner.audiences.clone(),
            iat,
            nbf: iat,
            exp: (now + token_ttl()).timestamp(),
        }
    }

    /// Sign a claims set with HS256.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.inner.encoding_key,
        )
        .map_err(|e| AuthError::SigningError(e.to_string()))
    }

    /// Issue a token for an account, valid from now for [`TOKEN_TTL_HOURS`].
    pub fn issue_token(&self, account_id: i64) -> Result<String, AuthError> {
        self.issue_token_at(account_id, Utc::now())
    }

    /// Issue a token for an account as of `now`.
    pub fn issue_token_at(&self, account_id: i64, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.sign(&self.claims_for(account_id, now))
    }

    /// Validate a token and return the account id it was issued for.
    pub fn validate_token(&self, token: &str) -> Result<i64, AuthError> {
        self.validate_token_at(token, Utc::now())
    }

    /// Validate a token as of `now`.
    ///
    /// Checks run in a fixed order and stop at the first failure. No claim
    /// is looked at before the signature has been verified.
    pub fn validate_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, AuthError> {
        let claims = self.verify_signature(token)?;
        let now = now.timestamp();

        if !claims.is_active_at(now) {
            return Err(if now < claims.nbf {
                AuthError::NotYetValid
            } else {
                AuthError::Expired
            });
        }

        if !claims.accepts_audience(self.accepted_audience()) {
            return Err(AuthError::AudienceMismatch);
        }

        if claims.iss != self.inner.issuer {
            return Err(AuthError::IssuerMismatch);
        }

        claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidSubject)
    }

    /// Verify the HS256 signature and decode the claims.
    fn verify_signature(&self, token: &str) -> Result<Claims, AuthError> {
        // Temporal and binding checks are done by the caller against an
        // explicit clock, so the library only verifies the signature.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<serde_json::Value>(token, &self.inner.decoding_key, &validation)
            .map_err(|e| {
                warn!("JWT signature check failed: {:?}", e.kind());
                AuthError::BadSignature
            })?;

        serde_json::from_value(token_data.claims).map_err(|e| AuthError::InvalidClaims(e.to_string()))
    }

    /// Run the full request gate against a raw Authorization header.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<i64, AuthError> {
        let header = authorization.ok_or(AuthError::MalformedHeader)?;
        let token = bearer_token_from_header(header)?;
        self.validate_token(token)
    }

    fn authenticate_headers(&self, headers: &HeaderMap) -> Result<i64, AuthError> {
        let authorization = match headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedHeader)?),
            None => None,
        };
        self.authenticate(authorization)
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("issuer", &self.inner.issuer)
            .field("audiences", &self.inner.audiences)
            .field("lookup_timeout", &self.inner.lookup_timeout)
            .finish_non_exhaustive()
    }
}

/// Authenticated account extracted from request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    /// Account id taken from the token subject.
    pub id: i64,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or(AuthError::MissingAuthContext)
    }
}

/// Authentication middleware.
///
/// Validates the bearer token and injects [`CurrentUser`] into request
/// extensions. Rejected requests never reach the handler.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut response = match auth.authenticate_headers(req.headers()) {
        Ok(id) => {
            debug!("authenticated account {}", id);
            req.extensions_mut().insert(CurrentUser { id });
            next.run(req).await
        }
        Err(err) => err.into_response(),
    };

    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Authorization"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "test-secret-for-unit-tests-minimum-32-chars-long";

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: Some(secret.to_string()),
            issuer: "marquee.test".to_string(),
            audiences: "web,mobile".to_string(),
            lookup_timeout_secs: 3,
        }
    }

    fn state() -> AuthState {
        AuthState::new(config(SECRET)).unwrap()
    }

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_bearer_token_from_header_valid() {
        assert_eq!(
            bearer_token_from_header("Bearer abc.def.ghi").unwrap(),
            "abc.def.ghi"
        );
    }

    #[test]
    fn test_bearer_token_from_header_invalid() {
        let cases = [
            "",
            "Bearer",
            "Bearer ",
            "bearer abc.def.ghi",
            "Token abc.def.ghi",
            "Bearer  abc.def.ghi",
            "Bearer abc.def.ghi extra",
            " Bearer abc.def.ghi",
            "abc.def.ghi",
        ];

        for case in cases {
            assert!(
                matches!(
                    bearer_token_from_header(case),
                    Err(AuthError::MalformedHeader)
                ),
                "{case:?} should fail"
            );
        }
    }

    #[test]
    fn test_new_rejects_missing_secret() {
        let mut cfg = config(SECRET);
        cfg.jwt_secret = None;
        assert_eq!(
            AuthState::new(cfg).unwrap_err(),
            ConfigValidationError::MissingJwtSecret
        );
    }

    #[test]
    fn test_claims_for_account() {
        let now = issued_at();
        let claims = state().claims_for(42, now);

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss, "marquee.test");
        assert_eq!(claims.aud, vec!["web".to_string(), "mobile".to_string()]);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.nbf, now.timestamp());
        assert_eq!(claims.exp, now.timestamp() + 24 * 60 * 60);
    }

    #[test]
    fn test_issue_and_validate_roundtrip() {
        let auth = state();
        let now = issued_at();
        let token = auth.issue_token_at(1, now).unwrap();

        assert_eq!(auth.validate_token_at(&token, now).unwrap(), 1);
        assert_eq!(
            auth.validate_token_at(&token, now + chrono::Duration::hours(23))
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_issue_token_uses_current_time() {
        let auth = state();
        let token = auth.issue_token(9).unwrap();
        assert_eq!(auth.validate_token(&token).unwrap(), 9);
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let auth = state();
        let now = issued_at();
        let token = auth.issue_token_at(1, now).unwrap();

        let last_valid = now + token_ttl() - chrono::Duration::seconds(1);
        assert!(auth.validate_token_at(&token, last_valid).is_ok());
        assert!(matches!(
            auth.validate_token_at(&token, now + token_ttl()),
            Err(AuthError::Expired)
        ));
        assert!(matches!(
            auth.validate_token_at(&token, now + chrono::Duration::days(30)),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn test_not_yet_valid() {
        let auth = state();
        let now = issued_at();
        let token = auth.issue_token_at(1, now).unwrap();

        assert!(matches!(
            auth.validate_token_at(&token, now - chrono::Duration::seconds(1)),
            Err(AuthError::NotYetValid)
        ));
    }

    #[test]
    fn test_different_secret_is_bad_signature() {
        let now = issued_at();
        let token = AuthState::new(config("another-secret-that-is-also-long-enough"))
            .unwrap()
            .issue_token_at(1, now)
            .unwrap();

        assert!(matches!(
            state().validate_token_at(&token, now),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_is_bad_signature() {
        let auth = state();
        let now = issued_at();
        let token = auth.issue_token_at(1, now).unwrap();

        // Re-sign nothing: swap in the payload of a token for another account.
        let other = auth.issue_token_at(2, now).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(matches!(
            auth.validate_token_at(&forged, now),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn test_garbage_token_is_bad_signature() {
        let auth = state();
        for token in ["", "not-a-jwt", "a.b.c", "eyJhbGciOiJub25lIn0.e30."] {
            assert!(
                matches!(
                    auth.validate_token_at(token, issued_at()),
                    Err(AuthError::BadSignature)
                ),
                "{token:?} should fail signature check"
            );
        }
    }

    #[test]
    fn test_wrong_algorithm_is_bad_signature() {
        let now = issued_at();
        let claims = state().claims_for(1, now);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            state().validate_token_at(&token, now),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn test_audience_mismatch() {
        let auth = state();
        let now = issued_at();
        let mut claims = auth.claims_for(1, now);
        claims.aud = vec!["admin".to_string()];
        let token = auth.sign(&claims).unwrap();

        assert!(matches!(
            auth.validate_token_at(&token, now),
            Err(AuthError::AudienceMismatch)
        ));
    }

    #[test]
    fn test_only_first_configured_audience_is_accepted() {
        let auth = state();
        let now = issued_at();
        let mut claims = auth.claims_for(1, now);
        claims.aud = vec!["mobile".to_string()];
        let token = auth.sign(&claims).unwrap();

        assert_eq!(auth.accepted_audience(), "web");
        assert!(matches!(
            auth.validate_token_at(&token, now),
            Err(AuthError::AudienceMismatch)
        ));
    }

    #[test]
    fn test_issuer_mismatch() {
        let auth = state();
        let now = issued_at();
        let mut claims = auth.claims_for(1, now);
        claims.iss = "someone-else".to_string();
        let token = auth.sign(&claims).unwrap();

        assert!(matches!(
            auth.validate_token_at(&token, now),
            Err(AuthError::IssuerMismatch)
        ));
    }

    #[test]
    fn test_non_numeric_subject() {
        let auth = state();
        let now = issued_at();
        let mut claims = auth.claims_for(1, now);
        claims.sub = "admin@site.com".to_string();
        let token = auth.sign(&claims).unwrap();

        assert!(matches!(
            auth.validate_token_at(&token, now),
            Err(AuthError::InvalidSubject)
        ));
    }

    #[test]
    fn test_signed_payload_without_claims_is_invalid_claims() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "sub": "1" }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            state().validate_token_at(&token, issued_at()),
            Err(AuthError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_authenticate_header_shapes() {
        let auth = state();
        let token = auth.issue_token(5).unwrap();

        assert_eq!(
            auth.authenticate(Some(&format!("Bearer {token}"))).unwrap(),
            5
        );
        assert!(matches!(
            auth.authenticate(None),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            auth.authenticate(Some(&token)),
            Err(AuthError::MalformedHeader)
        ));
    }

    async fn whoami(user: CurrentUser) -> String {
        user.id.to_string()
    }

    #[tokio::test]
    async fn test_current_user_outside_gate_is_internal_error() {
        use axum::{Router, body::Body, routing::get};
        use tower::ServiceExt;

        let auth = state();
        let token = auth.issue_token(5).unwrap();
        let app = Router::new().route("/whoami", get(whoami));

        let response = app
            .oneshot(
                axum::http::Request::get("/whoami")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["statusCode"], 500);
        assert_eq!(body["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn test_current_user_behind_gate_is_token_subject() {
        use axum::{Router, body::Body, middleware, routing::get};
        use tower::ServiceExt;

        let auth = state();
        let token = auth.issue_token(5).unwrap();
        let app = Router::new()
            .route("/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(auth, auth_middleware));

        let response = app
            .oneshot(
                axum::http::Request::get("/whoami")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"5");
    }
}
