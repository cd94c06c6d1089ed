//! Error handling stage (outermost).
//!
//! Wraps the entire pipeline. Every fault raised below (validation
//! failures, auth denials, rate limiting, timeouts, store errors) is
//! converted here into the uniform failure envelope, and every outgoing
//! response (success or failure) is tagged with the `X-Request-Id` header.
//!
//! This is the only place allowed to log raw error internals: unexpected
//! internal errors are logged at `error` with their full cause chain and
//! the request id for correlation, while the client sees a redacted
//! message unless `expose_details` is on (non-production deployments).

use crate::context::PipelineContext;
use crate::middleware::{Middleware, Next, StageResult};
use folio_core::{envelope, BoxFuture, FolioError, Request, Response};
use http::HeaderValue;

/// The response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Outermost stage: fault normalization and request-id tagging.
#[derive(Debug, Clone, Default)]
pub struct ErrorHandlerMiddleware {
    /// Whether failure envelopes include the `details` block.
    expose_details: bool,
}

impl ErrorHandlerMiddleware {
    /// Creates the stage. `expose_details` must be false in production.
    #[must_use]
    pub const fn new(expose_details: bool) -> Self {
        Self { expose_details }
    }

    /// Logs a fault at a severity matching its class.
    ///
    /// Auth failures and not-founds are expected traffic; backpressure
    /// signals are operational; only internals get the full treatment.
    fn log_fault(ctx: &PipelineContext, error: &FolioError) {
        let request_id = ctx.request_id();
        match error {
            FolioError::Internal { message, source } => {
                tracing::error!(
                    request_id = %request_id,
                    error = %message,
                    cause = source.as_ref().map(|s| format!("{s:#}")).unwrap_or_default(),
                    "internal error"
                );
            }
            FolioError::RateLimited { .. } | FolioError::Timeout { .. } => {
                tracing::warn!(request_id = %request_id, code = error.code(), "backpressure");
            }
            _ => {
                tracing::debug!(
                    request_id = %request_id,
                    code = error.code(),
                    error = %error,
                    "request rejected"
                );
            }
        }
    }

    fn tag(ctx: &PipelineContext, mut response: Response) -> Response {
        let value = HeaderValue::from_str(&ctx.request_id().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("invalid"));
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
        response
    }
}

impl Middleware for ErrorHandlerMiddleware {
    fn name(&self) -> &'static str {
        "error_handler"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let response = match next.run(ctx, request).await {
                Ok(response) => response,
                Err(error) => {
                    Self::log_fault(ctx, &error);
                    envelope::failure(&error, self.expose_details)
                }
            };
            Ok(Self::tag(ctx, response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::{BodyExt, Full};

    fn test_request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_response() -> Response {
        HttpResponse::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_gets_request_id_header() {
        let middleware = ErrorHandlerMiddleware::new(false);
        let mut ctx = PipelineContext::new();
        let expected = ctx.request_id().to_string();

        let next = Next::handler(|_ctx, _req| Box::pin(async { Ok(ok_response()) }));
        let response = middleware
            .process(&mut ctx, test_request(), next)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            expected.as_str()
        );
    }

    #[tokio::test]
    async fn test_fault_becomes_failure_envelope() {
        let middleware = ErrorHandlerMiddleware::new(false);
        let mut ctx = PipelineContext::new();

        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Err(FolioError::forbidden("Editor role required")) })
        });
        let response = middleware
            .process(&mut ctx, test_request(), next)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_internal_details_redacted_by_default() {
        let middleware = ErrorHandlerMiddleware::new(false);
        let mut ctx = PipelineContext::new();

        let next = Next::handler(|_ctx, _req| {
            Box::pin(async {
                Err(FolioError::internal_with_source(
                    "store write failed",
                    anyhow::anyhow!("connection reset"),
                ))
            })
        });
        let response = middleware
            .process(&mut ctx, test_request(), next)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body.get("details").is_none());
        assert!(!body["error"].as_str().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_internal_details_exposed_when_configured() {
        let middleware = ErrorHandlerMiddleware::new(true);
        let mut ctx = PipelineContext::new();

        let next = Next::handler(|_ctx, _req| {
            Box::pin(async {
                Err(FolioError::internal_with_source(
                    "store write failed",
                    anyhow::anyhow!("connection reset"),
                ))
            })
        });
        let response = middleware
            .process(&mut ctx, test_request(), next)
            .await
            .unwrap();

        let body = body_json(response).await;
        assert!(body["details"]["cause"]
            .as_str()
            .unwrap()
            .contains("connection reset"));
    }
}
