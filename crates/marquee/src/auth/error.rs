//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::ErrorResponse;

/// Authentication errors.
///
/// The `Display` text is for server-side logs. Clients only ever see
/// [`AuthError::public_message`], which collapses every token check into a
/// single message.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signin body could not be decoded.
    #[error("unreadable credentials: {0}")]
    UnreadableCredentials(String),

    /// Unknown user or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account store failed or timed out.
    #[error("account store error: {0}")]
    StoreError(String),

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    SigningError(String),

    /// Authorization header missing or not `Bearer <token>`.
    #[error("malformed authorization header")]
    MalformedHeader,

    /// Signature, algorithm or encoding check failed.
    #[error("bad token signature")]
    BadSignature,

    /// Signature verified but the payload is not a claims set.
    #[error("invalid token claims: {0}")]
    InvalidClaims(String),

    /// Token is past its expiry.
    #[error("token expired")]
    Expired,

    /// Token is not valid yet.
    #[error("token not yet valid")]
    NotYetValid,

    /// Token was not issued for the accepted audience.
    #[error("token audience mismatch")]
    AudienceMismatch,

    /// Token was issued by someone else.
    #[error("token issuer mismatch")]
    IssuerMismatch,

    /// Subject is not an account id.
    #[error("token subject is not an account id")]
    InvalidSubject,

    /// A handler asked for the current user on a route the gate does not cover.
    #[error("no authenticated account on request; route is not behind the auth gate")]
    MissingAuthContext,
}

impl AuthError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UnreadableCredentials(_)
            | AuthError::InvalidCredentials
            | AuthError::StoreError(_)
            | AuthError::MalformedHeader => StatusCode::BAD_REQUEST,
            AuthError::SigningError(_) | AuthError::MissingAuthContext => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthError::BadSignature
            | AuthError::InvalidClaims(_)
            | AuthError::Expired
            | AuthError::NotYetValid
            | AuthError::AudienceMismatch
            | AuthError::IssuerMismatch
            | AuthError::InvalidSubject => StatusCode::FORBIDDEN,
        }
    }

    /// Message returned to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::UnreadableCredentials(_) => "unauthorized: cannot read user credentials",
            AuthError::InvalidCredentials => "unauthorized: password is incorrect",
            AuthError::StoreError(_) => "unauthorized: unable to verify user credentials",
            AuthError::SigningError(_) | AuthError::MissingAuthContext => "internal server error",
            AuthError::MalformedHeader => "invalid auth header",
            _ => "unauthorized",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::StoreError(_)
            | AuthError::SigningError(_)
            | AuthError::MissingAuthContext => {
                log::error!("authentication failed: {}", self);
            }
            _ => log::debug!("authentication rejected: {}", self),
        }

        ErrorResponse::new(self.status_code(), self.public_message()).into_response()
    }
}
