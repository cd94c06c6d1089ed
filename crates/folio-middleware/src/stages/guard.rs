//! Route-specific guard stages: role checks and ownership verification.
//!
//! Guards run after authentication, so they can assume an identity is
//! present; a missing one means the pipeline was assembled wrong and
//! surfaces as `UNAUTHORIZED` rather than a panic.
//!
//! [`RoleGuard`] enforces the caller's role claim. [`OwnershipGuard`]
//! loads the addressed resource from the store and verifies the caller
//! owns it; on success the loaded record is parked on the context so the
//! handler does not fetch it a second time.

use crate::context::PipelineContext;
use crate::middleware::{Middleware, Next, StageResult};
use folio_core::{store, BoxFuture, FieldError, FolioError, Identity, KeyValueStore, Request, Role};
use std::sync::Arc;

/// Role-based authorization guard.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    check: fn(Role) -> bool,
    denial: &'static str,
}

impl RoleGuard {
    /// Requires an editorial role (editor or managing editor).
    #[must_use]
    pub fn editor() -> Self {
        Self {
            check: Role::is_editorial,
            denial: "Editor role required",
        }
    }

    /// Requires the managing editor role specifically.
    #[must_use]
    pub fn managing_editor() -> Self {
        Self {
            check: |role| role == Role::ManagingEditor,
            denial: "Managing editor role required",
        }
    }
}

impl Middleware for RoleGuard {
    fn name(&self) -> &'static str {
        "role_guard"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let identity = ctx.require_identity()?;
            if !(self.check)(identity.role) {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    user = %identity.log_id(),
                    role = %identity.role,
                    "role check failed"
                );
                return Err(FolioError::forbidden(self.denial));
            }
            next.run(ctx, request).await
        })
    }
}

/// The kinds of owned resource an [`OwnershipGuard`] can protect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A writer's room; keyed by the owner's user id.
    Room,
    /// A draft in a writer's room.
    Draft,
    /// A published piece displayed in a room.
    Exhibit,
    /// An editorial submission.
    Submission,
}

impl ResourceKind {
    /// The store key prefix for this kind.
    #[must_use]
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Draft => "draft",
            Self::Exhibit => "exhibit",
            Self::Submission => "submission",
        }
    }
}

/// Ownership verification guard.
pub struct OwnershipGuard {
    kind: ResourceKind,
    store: Arc<dyn KeyValueStore>,
}

impl OwnershipGuard {
    /// Creates a guard for the given resource kind.
    #[must_use]
    pub fn new(kind: ResourceKind, store: Arc<dyn KeyValueStore>) -> Self {
        Self { kind, store }
    }

    /// Extracts the resource id: the last non-empty path segment.
    fn resource_id(request: &Request) -> Option<&str> {
        request
            .uri()
            .path()
            .rsplit('/')
            .find(|segment| !segment.is_empty())
    }

    fn owns(&self, identity: &Identity, id: &str, resource: &serde_json::Value) -> bool {
        match self.kind {
            // A room's id is its owner's user id.
            ResourceKind::Room => id == identity.user_id,
            _ => resource
                .get("userId")
                .and_then(serde_json::Value::as_str)
                .is_some_and(|owner| owner == identity.user_id),
        }
    }
}

impl Middleware for OwnershipGuard {
    fn name(&self) -> &'static str {
        "ownership_guard"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let identity = ctx.require_identity()?.clone();

            let Some(id) = Self::resource_id(&request) else {
                return Err(FolioError::validation(vec![FieldError::new(
                    "id",
                    "Resource id missing from path",
                )]));
            };

            let key = store::resource_key(self.kind.key_prefix(), id);
            let resource = self
                .store
                .get(&key)
                .await
                .map_err(|e| FolioError::internal_with_source("resource lookup failed", e))?
                .ok_or_else(|| FolioError::not_found_resource(self.kind.key_prefix(), id))?;

            if !self.owns(&identity, id, &resource) {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    user = %identity.log_id(),
                    resource = %key,
                    "ownership check failed"
                );
                return Err(FolioError::forbidden(
                    "You do not have access to this resource",
                ));
            }

            ctx.set_resolved_resource(resource);
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use folio_core::{MemoryStore, UnavailableStore};
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;
    use serde_json::json;

    fn request_for(path: &str) -> Request {
        HttpRequest::builder()
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_handler(
    ) -> impl FnOnce(&mut PipelineContext, Request) -> BoxFuture<'static, StageResult> {
        |_ctx, _req| {
            Box::pin(async {
                Ok(HttpResponse::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::from("ok")))
                    .unwrap())
            })
        }
    }

    fn ctx_with(identity: Identity) -> PipelineContext {
        let mut ctx = PipelineContext::new();
        ctx.attach_identity(identity);
        ctx
    }

    #[tokio::test]
    async fn test_editor_guard_admits_both_editorial_roles() {
        for identity in [
            Identity::editor("e1", "e@folio.press"),
            Identity::new("m1", "m@folio.press", Role::ManagingEditor),
        ] {
            let mut ctx = ctx_with(identity);
            let result = RoleGuard::editor()
                .process(&mut ctx, request_for("/api/queue"), Next::handler(ok_handler()))
                .await;
            assert_eq!(result.unwrap().status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_editor_guard_rejects_writer() {
        let mut ctx = ctx_with(Identity::writer("w1", "w@folio.press"));
        let result = RoleGuard::editor()
            .process(&mut ctx, request_for("/api/queue"), Next::handler(ok_handler()))
            .await;
        match result {
            Err(FolioError::Authorization { message }) => {
                assert_eq!(message, "Editor role required");
            }
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_managing_editor_guard_rejects_plain_editor() {
        let mut ctx = ctx_with(Identity::editor("e1", "e@folio.press"));
        let result = RoleGuard::managing_editor()
            .process(&mut ctx, request_for("/api/issues"), Next::handler(ok_handler()))
            .await;
        match result {
            Err(FolioError::Authorization { message }) => {
                assert_eq!(message, "Managing editor role required");
            }
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guard_without_identity_is_unauthorized() {
        let mut ctx = PipelineContext::new();
        let result = RoleGuard::editor()
            .process(&mut ctx, request_for("/api/queue"), Next::handler(ok_handler()))
            .await;
        assert!(matches!(result, Err(FolioError::Authentication { .. })));
    }

    #[tokio::test]
    async fn test_owner_passes_and_resource_is_parked() {
        let store = Arc::new(MemoryStore::new());
        store
            .seed("draft:d1", json!({"userId": "w1", "title": "Night Mail"}))
            .await;
        let guard = OwnershipGuard::new(ResourceKind::Draft, store);

        let mut ctx = ctx_with(Identity::writer("w1", "w@folio.press"));
        let result = guard
            .process(
                &mut ctx,
                request_for("/api/drafts/d1"),
                Next::handler(ok_handler()),
            )
            .await;

        assert_eq!(result.unwrap().status(), StatusCode::OK);
        assert_eq!(ctx.resolved_resource().unwrap()["title"], "Night Mail");
    }

    #[tokio::test]
    async fn test_non_owner_is_forbidden() {
        let store = Arc::new(MemoryStore::new());
        store.seed("draft:d1", json!({"userId": "w1"})).await;
        let guard = OwnershipGuard::new(ResourceKind::Draft, store);

        let mut ctx = ctx_with(Identity::writer("w2", "other@folio.press"));
        let result = guard
            .process(
                &mut ctx,
                request_for("/api/drafts/d1"),
                Next::handler(ok_handler()),
            )
            .await;
        assert!(matches!(result, Err(FolioError::Authorization { .. })));
        assert!(ctx.resolved_resource().is_none());
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found() {
        let guard = OwnershipGuard::new(ResourceKind::Draft, Arc::new(MemoryStore::new()));
        let mut ctx = ctx_with(Identity::writer("w1", "w@folio.press"));

        let result = guard
            .process(
                &mut ctx,
                request_for("/api/drafts/missing"),
                Next::handler(ok_handler()),
            )
            .await;
        match result {
            Err(FolioError::NotFound { resource_id, .. }) => {
                assert_eq!(resource_id.as_deref(), Some("missing"));
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_room_ownership_keys_off_user_id() {
        let store = Arc::new(MemoryStore::new());
        store.seed("room:w1", json!({"name": "The Attic"})).await;
        let guard = OwnershipGuard::new(ResourceKind::Room, store);

        let mut ctx = ctx_with(Identity::writer("w1", "w@folio.press"));
        let ok = guard
            .process(
                &mut ctx,
                request_for("/api/rooms/w1"),
                Next::handler(ok_handler()),
            )
            .await;
        assert!(ok.is_ok());

        let mut ctx = ctx_with(Identity::writer("w2", "other@folio.press"));
        let denied = guard
            .process(
                &mut ctx,
                request_for("/api/rooms/w1"),
                Next::handler(ok_handler()),
            )
            .await;
        assert!(matches!(denied, Err(FolioError::Authorization { .. })));
    }

    #[tokio::test]
    async fn test_store_outage_is_internal() {
        let guard = OwnershipGuard::new(ResourceKind::Draft, Arc::new(UnavailableStore));
        let mut ctx = ctx_with(Identity::writer("w1", "w@folio.press"));

        let result = guard
            .process(
                &mut ctx,
                request_for("/api/drafts/d1"),
                Next::handler(ok_handler()),
            )
            .await;
        assert!(matches!(result, Err(FolioError::Internal { .. })));
    }

    #[test]
    fn test_resource_id_extraction() {
        assert_eq!(
            OwnershipGuard::resource_id(&request_for("/api/drafts/d1")),
            Some("d1")
        );
        assert_eq!(
            OwnershipGuard::resource_id(&request_for("/api/drafts/d1/")),
            Some("d1")
        );
        assert_eq!(OwnershipGuard::resource_id(&request_for("/")), None);
    }
}
