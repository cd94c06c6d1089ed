//! Core middleware trait and chain types.
//!
//! Middleware stages receive the mutable [`PipelineContext`], the incoming
//! request, and a [`Next`] callback that invokes the rest of the chain. A
//! stage short-circuits by returning `Err(FolioError)` instead of calling
//! `next`; the outermost error-handler stage converts every error into the
//! failure envelope, so nothing below it reaches the transport unformatted.
//!
//! # Invariants
//!
//! - A stage calls `next.run()` at most once (`Next` is consume-once)
//! - Stages never swallow downstream errors they cannot represent
//! - Within one request, stages execute strictly in pipeline order

use crate::context::PipelineContext;
use folio_core::{BoxFuture, FolioError, Request, Response};
use std::future::Future;

/// The result every stage and handler produces.
pub type StageResult = Result<Response, FolioError>;

/// A middleware stage in the request pipeline.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this stage, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, calling `next` to continue the chain.
    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult>;
}

/// Callback invoking the remainder of the chain.
///
/// Consumed by `run`, so a stage can only continue the pipeline once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Box<dyn FnOnce(&mut PipelineContext, Request) -> BoxFuture<'static, StageResult> + Send + 'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates the terminal `Next` that invokes the route handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut PipelineContext, Request) -> BoxFuture<'static, StageResult> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or the handler.
    pub async fn run(self, ctx: &mut PipelineContext, request: Request) -> StageResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

/// A middleware defined from a closure, mostly useful in tests.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a function-based middleware with the given stage name.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(&mut PipelineContext, Request, Next<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StageResult> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move { (self.func)(ctx, request, next).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;

    struct MarkerMiddleware {
        name: &'static str,
    }

    impl Middleware for MarkerMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut PipelineContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, StageResult> {
            Box::pin(async move {
                ctx.set_extension(format!("visited:{}", self.name));
                next.run(ctx, request).await
            })
        }
    }

    fn test_request() -> Request {
        HttpRequest::builder()
            .uri("/test")
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

    #[tokio::test]
    async fn test_terminal_next_runs_handler() {
        let mut ctx = PipelineContext::new();
        let next = Next::handler(ok_handler());
        let response = next.run(&mut ctx, test_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let outer = MarkerMiddleware { name: "outer" };
        let inner = MarkerMiddleware { name: "inner" };

        let mut ctx = PipelineContext::new();
        let chain = Next::new(&outer, Next::new(&inner, Next::handler(ok_handler())));

        let response = chain.run(&mut ctx, test_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        // Last writer wins: the inner stage ran after the outer one.
        assert_eq!(ctx.get_extension::<String>().unwrap(), "visited:inner");
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let reject = FnMiddleware::new("reject", |_ctx: &mut PipelineContext, _req, _next: Next<'_>| async {
            Err(FolioError::forbidden("nope"))
        });

        let mut ctx = PipelineContext::new();
        let chain = Next::new(&reject, Next::handler(ok_handler()));
        let result = chain.run(&mut ctx, test_request()).await;
        assert!(matches!(result, Err(FolioError::Authorization { .. })));
    }
}
