//! # Folio Middleware
//!
//! The request pipeline for the Folio publishing backend.
//!
//! Every API route runs its request through the same fixed-order stage
//! chain before its handler executes:
//!
//! 1. error handler - converts faults to the uniform failure envelope and
//!    tags every response with `X-Request-Id`
//! 2. timeout - enforces the request deadline
//! 3. rate limit - sliding-window admission per caller
//! 4. auth - bearer-token authentication, attaches [`Identity`] to the
//!    context
//! 5. guards - route-specific role and ownership checks
//!
//! Stages implement [`Middleware`] and short-circuit by returning an
//! `Err(FolioError)`, which unwinds to the error handler. The chain is
//! assembled with [`Pipeline::standard`] plus per-route guards:
//!
//! ```
//! use folio_core::{Identity, MemoryStore, StaticVerifier};
//! use folio_middleware::{Pipeline, PipelineConfig, RoleGuard};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let verifier = Arc::new(
//!     StaticVerifier::new().with_token("tok", Identity::editor("e1", "e@folio.press")),
//! );
//!
//! let pipeline = Pipeline::standard(&PipelineConfig::default(), verifier, store)
//!     .guard(RoleGuard::editor())
//!     .build();
//! ```
//!
//! [`Identity`]: folio_core::Identity

#![doc(html_root_url = "https://docs.rs/folio-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use middleware::{FnMiddleware, Middleware, Next, StageResult};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use stages::{
    AuthMiddleware, ErrorHandlerMiddleware, FailMode, OwnershipGuard, RateLimitConfig,
    RateLimitMiddleware, ResourceKind, RoleGuard, RoomProfile, TimeoutMiddleware,
};
