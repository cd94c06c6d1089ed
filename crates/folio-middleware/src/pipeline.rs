//! The fixed-order request pipeline.
//!
//! Every inbound API call flows through the same stages in the same order:
//!
//! 1. **Error handler** - converts faults to the failure envelope, tags
//!    `X-Request-Id` (outermost)
//! 2. **Timeout** - races the rest of the pipeline against a deadline
//! 3. **Rate limit** - sliding-window admission per route class and caller
//! 4. **Auth** - bearer-token verification, identity attachment
//! 5. **Guards** - route-specific role and ownership checks
//!
//! then the route handler. [`Pipeline::standard`] seeds a builder with
//! stages 1-4 in that order; routes append their guards. The order is not
//! reorderable once built.

use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::middleware::{Middleware, Next, StageResult};
use crate::stages::{
    AuthMiddleware, ErrorHandlerMiddleware, RateLimitMiddleware, TimeoutMiddleware,
};
use folio_core::{envelope, BoxFuture, KeyValueStore, Request, Response, TokenVerifier};
use std::sync::Arc;

/// A type-erased middleware stage.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The fixed-order stages, used for documentation and ordering checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: error handling and envelope conversion (outermost).
    ErrorHandler = 1,
    /// Stage 2: deadline enforcement.
    Timeout = 2,
    /// Stage 3: sliding-window rate limiting.
    RateLimit = 3,
    /// Stage 4: bearer-token authentication.
    Auth = 4,
    /// Stage 5: route-specific role/ownership guards.
    Guard = 5,
}

impl Stage {
    /// Returns the stage name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ErrorHandler => "error_handler",
            Self::Timeout => "timeout",
            Self::RateLimit => "rate_limit",
            Self::Auth => "auth",
            Self::Guard => "guard",
        }
    }

    /// Returns all stages in pipeline order.
    #[must_use]
    pub const fn all() -> [Stage; 5] {
        [
            Self::ErrorHandler,
            Self::Timeout,
            Self::RateLimit,
            Self::Auth,
            Self::Guard,
        ]
    }
}

/// An immutable chain of middleware stages.
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates an empty pipeline builder.
    ///
    /// Most callers want [`Pipeline::standard`] instead.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Creates a builder seeded with the four mandatory stages in order.
    ///
    /// Routes append their guards before building:
    ///
    /// ```ignore
    /// let pipeline = Pipeline::standard(&config, verifier, store.clone())
    ///     .guard(RoleGuard::editor())
    ///     .build();
    /// ```
    #[must_use]
    pub fn standard(
        config: &PipelineConfig,
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn KeyValueStore>,
    ) -> PipelineBuilder {
        PipelineBuilder::new()
            .add_stage(ErrorHandlerMiddleware::new(config.expose_error_details))
            .add_stage(TimeoutMiddleware::new(config.timeout()))
            .add_stage(RateLimitMiddleware::new(
                config.rate_limit.clone(),
                store.clone(),
            ))
            .add_stage(AuthMiddleware::new(verifier, store))
    }

    /// Processes a request through every stage and the handler.
    ///
    /// The returned response is always envelope-formatted: if a fault ever
    /// escapes the chain (a pipeline built without the error-handler stage),
    /// it is converted here with details redacted, so nothing unformatted
    /// reaches the transport.
    pub async fn process<H>(
        &self,
        mut ctx: PipelineContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut PipelineContext, Request) -> BoxFuture<'static, StageResult>
            + Send
            + 'static,
    {
        let chain = self.build_chain(handler);
        match chain.run(&mut ctx, request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    code = error.code(),
                    "fault escaped pipeline without error handler"
                );
                envelope::failure(&error, false)
            }
        }
    }

    /// Builds the middleware chain from back to front.
    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut PipelineContext, Request) -> BoxFuture<'static, StageResult> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a middleware stage.
    #[must_use]
    pub fn add_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends a route-specific guard. Alias of [`add_stage`](Self::add_stage)
    /// that reads better at call sites.
    #[must_use]
    pub fn guard<M: Middleware>(self, guard: M) -> Self {
        self.add_stage(guard)
    }

    /// Builds the pipeline. The stage order is frozen from here on.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}
