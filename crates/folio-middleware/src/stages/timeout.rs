//! Timeout stage.
//!
//! Races the downstream chain (remaining stages plus the handler) against
//! a deadline. If the deadline fires first the request fails with
//! `TIMEOUT` (408) and the in-flight work is abandoned by dropping its
//! future. This is best-effort abandonment, not cancellation: a store call that
//! already left the process is not recalled. Any other fault from
//! downstream passes through untouched for the error handler.

use crate::context::PipelineContext;
use crate::middleware::{Middleware, Next, StageResult};
use folio_core::{BoxFuture, FolioError, Request};
use std::time::Duration;

/// Default request deadline.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Deadline-enforcing stage.
#[derive(Debug, Clone)]
pub struct TimeoutMiddleware {
    deadline: Duration,
}

impl TimeoutMiddleware {
    /// Creates the stage with the given deadline.
    #[must_use]
    pub const fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Returns the configured deadline.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl Default for TimeoutMiddleware {
    fn default() -> Self {
        Self::new(DEFAULT_DEADLINE)
    }
}

impl Middleware for TimeoutMiddleware {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let deadline_ms = u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX);
            match tokio::time::timeout(self.deadline, next.run(ctx, request)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(FolioError::timeout(deadline_ms)),
            }
        })
    }
}
