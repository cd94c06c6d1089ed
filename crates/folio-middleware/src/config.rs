//! Pipeline configuration.
//!
//! Deserializable from JSON (or any serde source) so deployments can tune
//! the pipeline without code changes; every field has a production-safe
//! default.

use crate::stages::rate_limit::RateLimitConfig;
use serde::Deserialize;
use std::time::Duration;

/// Configuration for [`Pipeline::standard`](crate::pipeline::Pipeline::standard).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Request deadline in milliseconds. Default 30 000.
    pub timeout_ms: u64,
    /// Rate limiter settings for this route class.
    pub rate_limit: RateLimitConfig,
    /// Whether failure envelopes include `details`. Keep false in
    /// production; details may carry internals.
    pub expose_error_details: bool,
}

impl PipelineConfig {
    /// Returns the request deadline as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            rate_limit: RateLimitConfig::default(),
            expose_error_details: false,
        }
    }
}
