//! The per-request pipeline context.

use folio_core::{FolioError, Identity, RequestId};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

/// Ephemeral state carried through one pipeline invocation.
///
/// Created per inbound request, enriched by the stages as they run, and
/// discarded once the response is sent. The identity slot is write-once:
/// whatever the auth stage attaches stays immutable for the life of the
/// request.
///
/// # Example
///
/// ```
/// use folio_middleware::context::PipelineContext;
/// use folio_core::Identity;
///
/// let mut ctx = PipelineContext::new();
/// assert!(ctx.identity().is_none());
///
/// ctx.attach_identity(Identity::writer("u1", "w@folio.press"));
/// assert_eq!(ctx.identity().unwrap().user_id, "u1");
/// ```
#[derive(Debug)]
pub struct PipelineContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// The authenticated caller, set once by the auth stage.
    identity: Option<Identity>,

    /// The resource loaded by an ownership guard, if one ran.
    resolved_resource: Option<serde_json::Value>,

    /// When the request entered the pipeline.
    started_at: Instant,

    /// Type-keyed extension data for cross-stage plumbing.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PipelineContext {
    /// Creates a context with a fresh request id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            identity: None,
            resolved_resource: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request id.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the authenticated caller, if the auth stage has run.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Returns the caller or a 401 error for stages that need one.
    pub fn require_identity(&self) -> Result<&Identity, FolioError> {
        self.identity
            .as_ref()
            .ok_or_else(|| FolioError::authentication("Authentication required"))
    }

    /// Attaches the caller identity.
    ///
    /// Only the auth stage calls this; the first attachment wins and later
    /// calls are ignored, keeping the identity immutable per request.
    pub fn attach_identity(&mut self, identity: Identity) {
        if self.identity.is_none() {
            self.identity = Some(identity);
        } else {
            tracing::debug!(
                request_id = %self.request_id,
                "ignoring repeated identity attachment"
            );
        }
    }

    /// Returns the resource resolved by an ownership guard.
    #[must_use]
    pub fn resolved_resource(&self) -> Option<&serde_json::Value> {
        self.resolved_resource.as_ref()
    }

    /// Stores the resource an ownership guard loaded.
    pub fn set_resolved_resource(&mut self, resource: serde_json::Value) {
        self.resolved_resource = Some(resource);
    }

    /// Returns when the request entered the pipeline.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request entered the pipeline.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}
