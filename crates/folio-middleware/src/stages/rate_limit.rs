//! Sliding-window rate limiting stage.
//!
//! Each route class carries a `{requests, window, key_prefix}` budget. The
//! window for one caller is an ordered array of epoch-ms admission
//! timestamps persisted in the key-value store under
//! `<key_prefix>:<identifier>`. On every request the array is read, pruned
//! to `[now - window, now]`, and checked: at or over budget rejects with
//! `RATE_LIMIT_EXCEEDED` (429) and a `Retry-After` computed from when the
//! oldest surviving timestamp leaves the window; under budget appends `now`
//! and persists with compare-and-swap, retrying on conflict so concurrent
//! requests from one caller cannot lose each other's admissions.
//!
//! A pruned array never exceeds `requests` entries, which also bounds the
//! stored value's size; expiring idle keys entirely is delegated to the
//! store implementation.
//!
//! ## Caller identification
//!
//! `x-real-ip`, else the first entry of `x-forwarded-for`, else the
//! literal `"unknown"`, meaning all unidentifiable clients share one
//! bucket, a deliberately conservative fallback.
//!
//! ## Store failure policy
//!
//! Configurable: [`FailMode::Open`] (default) admits the request and logs,
//! trading strictness for availability; [`FailMode::Closed`] rejects.

use crate::context::PipelineContext;
use crate::middleware::{Middleware, Next, StageResult};
use folio_core::{BoxFuture, FolioError, KeyValueStore, Request, StoreError};
use http::HeaderValue;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Response header: the window budget.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Response header: admissions left in the current window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Bounded CAS retries before giving up on persisting an admission.
const CAS_ATTEMPTS: u32 = 3;

/// Behaviour when the key-value store is unreachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// Admit the request; availability over strictness.
    #[default]
    Open,
    /// Reject the request; strictness over availability.
    Closed,
}

/// Per-route-class rate limit settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Admissions allowed per window.
    pub requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Store key prefix identifying the route class.
    pub key_prefix: String,
    /// Behaviour on store failure.
    pub fail_mode: FailMode,
}

impl RateLimitConfig {
    /// Returns the window as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 100,
            window_ms: 60_000,
            key_prefix: "rl".to_string(),
            fail_mode: FailMode::Open,
        }
    }
}

/// The admission decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Admitted { remaining: u32 },
    Limited { retry_after_seconds: u64 },
}

/// Sliding-window rate limiting stage.
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    store: Arc<dyn KeyValueStore>,
}

impl RateLimitMiddleware {
    /// Creates the stage over the given store.
    #[must_use]
    pub fn new(config: RateLimitConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self { config, store }
    }

    /// Resolves the caller identifier from forwarding headers.
    fn identifier(request: &Request) -> String {
        if let Some(ip) = request
            .headers()
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
        {
            return ip.trim().to_string();
        }
        if let Some(forwarded) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
        {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
        "unknown".to_string()
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    fn parse_window(value: &Value) -> Vec<u64> {
        value
            .as_array()
            .map(|entries| entries.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default()
    }

    /// Checks the window for `key` and records an admission.
    ///
    /// Read-prune-append with compare-and-swap: a conflicting concurrent
    /// update triggers a re-read rather than a lost update.
    async fn check(&self, key: &str) -> Result<Decision, StoreError> {
        let limit = self.config.requests;
        let window_ms = self.config.window_ms;

        for _ in 0..CAS_ATTEMPTS {
            let stored = self.store.get(key).await?;
            let now = Self::now_ms();
            let floor = now.saturating_sub(window_ms);

            let mut timestamps: Vec<u64> = stored
                .as_ref()
                .map(Self::parse_window)
                .unwrap_or_default();
            timestamps.retain(|&ts| ts >= floor && ts <= now);

            if timestamps.len() >= limit as usize {
                // Advisory wait: when the oldest surviving admission
                // leaves the window, rounded up, never zero.
                let oldest = timestamps.first().copied().unwrap_or(now);
                let wait_ms = (oldest + window_ms).saturating_sub(now);
                let retry_after_seconds = wait_ms.div_ceil(1000).max(1);
                return Ok(Decision::Limited {
                    retry_after_seconds,
                });
            }

            timestamps.push(now);
            let remaining = limit - u32::try_from(timestamps.len()).unwrap_or(limit);
            let swapped = self
                .store
                .compare_and_swap(key, stored.as_ref(), json!(timestamps))
                .await?;
            if swapped {
                return Ok(Decision::Admitted { remaining });
            }
        }

        // Persistent CAS contention. Admit unrecorded rather than stall
        // the caller; the next uncontended request repairs the window.
        tracing::warn!(key, "rate limit window contended, admitting unrecorded");
        Ok(Decision::Admitted { remaining: 0 })
    }
}

impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut PipelineContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let identifier = Self::identifier(&request);
            let key = format!("{}:{}", self.config.key_prefix, identifier);

            let decision = match self.check(&key).await {
                Ok(decision) => decision,
                Err(store_error) => match self.config.fail_mode {
                    FailMode::Open => {
                        tracing::warn!(
                            request_id = %ctx.request_id(),
                            error = %store_error,
                            "rate limit store unavailable, failing open"
                        );
                        Decision::Admitted {
                            remaining: self.config.requests,
                        }
                    }
                    FailMode::Closed => {
                        return Err(FolioError::internal_with_source(
                            "rate limit store unavailable",
                            store_error,
                        ));
                    }
                },
            };

            match decision {
                Decision::Admitted { remaining } => {
                    let mut response = next.run(ctx, request).await?;
                    let headers = response.headers_mut();
                    headers.insert(LIMIT_HEADER, HeaderValue::from(self.config.requests));
                    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
                    Ok(response)
                }
                Decision::Limited {
                    retry_after_seconds,
                } => Err(FolioError::rate_limited(retry_after_seconds)),
            }
        })
    }
}
