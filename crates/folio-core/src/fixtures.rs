//! Test fixtures shared across the workspace.
//!
//! These are deliberately simple stand-ins for the external collaborators:
//! a token verifier with a fixed token table and a verifier that is always
//! down. Production wiring supplies real implementations of the same traits.

use crate::{BoxFuture, Identity, TokenVerifier, VerifyError};
use std::collections::HashMap;

/// A token verifier backed by a fixed token table.
#[derive(Debug, Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticVerifier {
    /// Creates an empty verifier that rejects everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for an identity.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

impl TokenVerifier for StaticVerifier {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Identity, VerifyError>> {
        Box::pin(async move {
            self.tokens
                .get(token)
                .cloned()
                .ok_or_else(|| VerifyError::Rejected("unknown token".into()))
        })
    }
}

/// A verifier that simulates an unreachable identity provider.
#[derive(Debug, Default)]
pub struct DownVerifier;

impl TokenVerifier for DownVerifier {
    fn verify<'a>(&'a self, _token: &'a str) -> BoxFuture<'a, Result<Identity, VerifyError>> {
        Box::pin(async {
            Err(VerifyError::Unavailable(anyhow::anyhow!(
                "provider connection refused"
            )))
        })
    }
}
