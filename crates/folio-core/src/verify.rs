//! The identity-provider abstraction.
//!
//! The backend never validates tokens itself; it hands the bearer token to
//! an external provider and trusts the returned claims. Only this contract
//! is depended on.

use crate::{BoxFuture, Identity};
use thiserror::Error;

/// Errors from the identity provider.
///
/// The auth stage maps every variant to a 401; the distinction exists for
/// logging.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token was malformed, expired, or revoked.
    #[error("token rejected: {0}")]
    Rejected(String),
    /// The provider could not be reached.
    #[error("identity provider unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

/// Verifies bearer tokens against the external identity provider.
pub trait TokenVerifier: Send + Sync + 'static {
    /// Verifies `token` and returns the caller's identity claims.
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Identity, VerifyError>>;
}
