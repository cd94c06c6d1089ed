//! # Folio Submissions
//!
//! The editorial submission workflow for the Folio publishing backend.
//!
//! A [`Submission`] moves through a fixed state machine:
//!
//! ```text
//! pending → queued → in_issue → published
//! ```
//!
//! with `revisions_requested` (re-enterable via the writer's resubmit) and
//! `rejected` (terminal) reachable from every active state. Every status
//! change appends one entry to the submission's append-only history.
//!
//! Persistence goes through the [`folio_core::KeyValueStore`] abstraction;
//! all mutations use compare-and-swap with retries so concurrent editorial
//! actions never silently overwrite each other.
//!
//! Authorization is the pipeline's job: editorial routes sit behind the
//! editor role gate, so [`SubmissionService`] does not re-check roles. The
//! exception is resubmission, which is owner-only and checked against the
//! loaded record.

#![doc(html_root_url = "https://docs.rs/folio-submissions/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod model;
pub mod repository;
pub mod service;

pub use model::{HistoryEntry, Submission, SubmissionStatus, MAX_RATING};
pub use repository::SubmissionRepository;
pub use service::{Page, SubmissionService};
