//! Submission persistence over the key-value store.
//!
//! Layout: each submission lives at `submission:<id>`; the flat id index
//! at `submissions:index` supports listing. Every mutation is a
//! read-modify-write under compare-and-swap with bounded retries, so two
//! editors acting on one submission at once cannot silently lose an
//! update; when retries run out the loser sees `CONFLICT`.

use crate::model::Submission;
use folio_core::{store, FolioError, KeyValueStore, StoreError};
use serde_json::Value;
use std::sync::Arc;

/// The key holding the flat id index.
const INDEX_KEY: &str = "submissions:index";

/// CAS attempts before a mutation gives up with `CONFLICT`.
const CAS_ATTEMPTS: u32 = 5;

/// Repository for [`Submission`] records.
pub struct SubmissionRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SubmissionRepository {
    /// Creates a repository over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(id: &str) -> String {
        store::resource_key("submission", id)
    }

    fn store_fault(error: StoreError) -> FolioError {
        FolioError::internal_with_source("submission store access failed", error)
    }

    fn decode(id: &str, value: Value) -> Result<Submission, FolioError> {
        serde_json::from_value(value).map_err(|e| {
            FolioError::internal_with_source(format!("corrupt submission record '{id}'"), e)
        })
    }

    /// Persists a new submission and registers it in the index.
    ///
    /// The id is freshly generated, so a CAS failure on the record key
    /// means an id collision and is treated as a conflict.
    pub async fn create(&self, submission: &Submission) -> Result<(), FolioError> {
        let key = Self::key(&submission.id);
        let value = serde_json::to_value(submission)
            .map_err(|e| FolioError::internal_with_source("submission encode failed", e))?;

        let inserted = self
            .store
            .compare_and_swap(&key, None, value)
            .await
            .map_err(Self::store_fault)?;
        if !inserted {
            return Err(FolioError::conflict(format!(
                "submission '{}' already exists",
                submission.id
            )));
        }

        self.index_add(&submission.id).await
    }

    /// Loads a submission, if it exists.
    pub async fn get(&self, id: &str) -> Result<Option<Submission>, FolioError> {
        let value = self
            .store
            .get(&Self::key(id))
            .await
            .map_err(Self::store_fault)?;
        value.map(|v| Self::decode(id, v)).transpose()
    }

    /// Loads a submission or fails with `NOT_FOUND`.
    pub async fn get_required(&self, id: &str) -> Result<Submission, FolioError> {
        self.get(id)
            .await?
            .ok_or_else(|| FolioError::not_found_resource("submission", id))
    }

    /// Applies `mutate` to the stored submission under optimistic
    /// concurrency.
    ///
    /// The record is re-read on every attempt, so `mutate` always sees the
    /// latest state; an error from `mutate` aborts immediately without
    /// retrying. Returns the updated submission.
    pub async fn update<F>(&self, id: &str, mutate: F) -> Result<Submission, FolioError>
    where
        F: Fn(&mut Submission) -> Result<(), FolioError> + Send,
    {
        let key = Self::key(id);

        for _ in 0..CAS_ATTEMPTS {
            let stored = self
                .store
                .get(&key)
                .await
                .map_err(Self::store_fault)?
                .ok_or_else(|| FolioError::not_found_resource("submission", id))?;

            let mut submission = Self::decode(id, stored.clone())?;
            mutate(&mut submission)?;

            let updated = serde_json::to_value(&submission)
                .map_err(|e| FolioError::internal_with_source("submission encode failed", e))?;
            let swapped = self
                .store
                .compare_and_swap(&key, Some(&stored), updated)
                .await
                .map_err(Self::store_fault)?;
            if swapped {
                return Ok(submission);
            }
            tracing::debug!(id, "submission update conflicted, retrying");
        }

        Err(FolioError::conflict(format!(
            "submission '{id}' was modified concurrently; retry the request"
        )))
    }

    /// Returns every stored submission, in index (insertion) order.
    ///
    /// Filtering and pagination are the service's concern.
    pub async fn list(&self) -> Result<Vec<Submission>, FolioError> {
        let mut submissions = Vec::new();
        for id in self.index().await? {
            // The index may briefly lead the records under concurrent
            // creation; skip ids whose record is not visible yet.
            if let Some(submission) = self.get(&id).await? {
                submissions.push(submission);
            }
        }
        Ok(submissions)
    }

    async fn index(&self) -> Result<Vec<String>, FolioError> {
        let value = self
            .store
            .get(INDEX_KEY)
            .await
            .map_err(Self::store_fault)?;
        Ok(value
            .and_then(|v| {
                v.as_array().map(|ids| {
                    ids.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
            })
            .unwrap_or_default())
    }

    async fn index_add(&self, id: &str) -> Result<(), FolioError> {
        for _ in 0..CAS_ATTEMPTS {
            let stored = self
                .store
                .get(INDEX_KEY)
                .await
                .map_err(Self::store_fault)?;
            let mut ids: Vec<String> = stored
                .as_ref()
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            if ids.iter().any(|existing| existing == id) {
                return Ok(());
            }
            ids.push(id.to_string());

            let swapped = self
                .store
                .compare_and_swap(INDEX_KEY, stored.as_ref(), serde_json::json!(ids))
                .await
                .map_err(Self::store_fault)?;
            if swapped {
                return Ok(());
            }
        }
        Err(FolioError::conflict(
            "submission index contended; retry the request",
        ))
    }
}
