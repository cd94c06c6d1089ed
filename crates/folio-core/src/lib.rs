//! # Folio Core
//!
//! Core types and contracts for the Folio publishing backend.
//!
//! This crate provides the foundational pieces used by every API route:
//!
//! - [`RequestId`] - UUID v7 request identifier for log correlation
//! - [`Identity`] / [`Role`] - the authenticated caller and their role claim
//! - [`FolioError`] - the error taxonomy every code path funnels through
//! - [`envelope`] - the uniform success/failure response envelope
//! - [`KeyValueStore`] - the persistence abstraction (opaque get/set/CAS)
//! - [`TokenVerifier`] - the identity-provider abstraction
//! - [`validate`] - pure request validation helpers

#![doc(html_root_url = "https://docs.rs/folio-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod envelope;
mod error;
pub mod fixtures;
mod identity;
pub mod store;
pub mod validate;
mod verify;

pub use context::RequestId;
pub use error::{FolioError, FolioResult};
pub use fixtures::{DownVerifier, StaticVerifier};
pub use identity::{Identity, Role};
pub use store::{KeyValueStore, MemoryStore, StoreError, UnavailableStore};
pub use validate::{FieldError, Pagination};
pub use verify::{TokenVerifier, VerifyError};

/// A boxed future, the crate's convention for async trait methods.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// The HTTP request type used throughout the pipeline.
pub type Request = http::Request<http_body_util::Full<bytes::Bytes>>;

/// The HTTP response type used throughout the pipeline.
pub type Response = http::Response<http_body_util::Full<bytes::Bytes>>;
