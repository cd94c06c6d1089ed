//! Bearer-token authentication stage.
//!
//! Extracts the token from `Authorization: Bearer <token>`, verifies it
//! against the identity provider, and attaches the resulting [`Identity`]
//! to the context. A missing or malformed header and a rejected or
//! unverifiable token all surface as the same `UNAUTHORIZED` (401); the
//! distinction lives only in the logs.
//!
//! After verification the stage also loads the caller's room profile from
//! the key-value store. That lookup is best-effort context enrichment: a
//! store failure is logged and the request proceeds without the profile.

use crate::context::PipelineContext;
use crate::middleware::{Middleware, Next, StageResult};
use folio_core::{store, BoxFuture, FolioError, KeyValueStore, Request, TokenVerifier, VerifyError};
use std::sync::Arc;

/// The caller's room profile, attached as a context extension when the
/// store lookup succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomProfile(pub serde_json::Value);

/// Bearer-token authentication stage.
pub struct AuthMiddleware {
    verifier: Arc<dyn TokenVerifier>,
    store: Arc<dyn KeyValueStore>,
}

impl AuthMiddleware {
    /// Creates the stage over a verifier and a profile store.
    #[must_use]
    pub fn new(verifier: Arc<dyn TokenVerifier>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { verifier, store }
    }

    /// Pulls the bearer token out of the `Authorization` header.
    fn bearer_token(request: &Request) -> Option<&str> {
        let header = request.headers().get(http::header::AUTHORIZATION)?;
        let value = header.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

impl Middleware for AuthMiddleware {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let Some(token) = Self::bearer_token(&request) else {
                return Err(FolioError::authentication(
                    "Missing or malformed Authorization header",
                ));
            };

            let identity = match self.verifier.verify(token).await {
                Ok(identity) => identity,
                Err(VerifyError::Rejected(reason)) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        reason,
                        "token rejected"
                    );
                    return Err(FolioError::authentication("Invalid or expired token"));
                }
                Err(VerifyError::Unavailable(cause)) => {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        cause = %cause,
                        "identity provider unavailable"
                    );
                    return Err(FolioError::authentication("Unable to verify token"));
                }
            };

            tracing::debug!(
                request_id = %ctx.request_id(),
                user = %identity.log_id(),
                role = %identity.role,
                "authenticated"
            );

            // Best-effort enrichment; the identity alone is enough to
            // continue.
            let profile_key = store::resource_key("room", &identity.user_id);
            match self.store.get(&profile_key).await {
                Ok(Some(profile)) => ctx.set_extension(RoomProfile(profile)),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        error = %error,
                        "room profile lookup failed, continuing without it"
                    );
                }
            }

            ctx.attach_identity(identity);
            next.run(ctx, request).await
        })
    }
}
