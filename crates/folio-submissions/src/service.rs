//! Submission operations, as invoked by route handlers.
//!
//! The service assumes the pipeline has already done its work: callers are
//! authenticated and role gates have run at the route boundary. The one
//! check repeated here is resubmit's ownership test, because it depends on
//! the loaded record, not the route.

use crate::model::{Submission, SubmissionStatus};
use crate::repository::SubmissionRepository;
use folio_core::{validate, FolioError, Identity, KeyValueStore, Pagination};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// One page of a submission listing, shaped for the response `meta` block.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// The submissions on this page.
    pub items: Vec<Submission>,
    /// Requested page size.
    pub limit: u32,
    /// Requested offset.
    pub offset: u32,
    /// Matching submissions across all pages.
    pub total: usize,
}

impl Page {
    fn slice(mut items: Vec<Submission>, pagination: &Pagination) -> Self {
        let total = items.len();
        let start = (pagination.offset as usize).min(total);
        let end = (start + pagination.limit as usize).min(total);
        items = items.drain(start..end).collect();
        Self {
            items,
            limit: pagination.limit,
            offset: pagination.offset,
            total,
        }
    }
}

/// The submission workflow service.
pub struct SubmissionService {
    repository: SubmissionRepository,
}

impl SubmissionService {
    /// Creates the service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            repository: SubmissionRepository::new(store),
        }
    }

    /// Submits new work. Any authenticated caller may do this; the result
    /// is a `pending` submission owned by them.
    pub async fn submit(
        &self,
        identity: &Identity,
        body: &Value,
    ) -> Result<Submission, FolioError> {
        let errors = validate::validate_submission(body);
        if !errors.is_empty() {
            return Err(FolioError::validation(errors));
        }

        // validate_submission guarantees these are present non-empty strings.
        let field = |name: &str| {
            body.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let submission = Submission::new(
            &identity.user_id,
            field("title"),
            field("content"),
            field("genre"),
        );

        self.repository.create(&submission).await?;
        tracing::info!(
            submission = %submission.id,
            user = %identity.log_id(),
            "submission received"
        );
        Ok(submission)
    }

    /// Loads a submission by id, 404 when absent.
    pub async fn get(&self, id: &str) -> Result<Submission, FolioError> {
        self.repository.get_required(id).await
    }

    /// Lists one writer's submissions, newest input accepted as raw query
    /// strings; invalid pagination falls back to the defaults.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<Page, FolioError> {
        let pagination = validate::validate_pagination(limit, offset);
        let items: Vec<Submission> = self
            .repository
            .list()
            .await?
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect();
        Ok(Page::slice(items, &pagination))
    }

    /// Lists the editorial queue: every submission still awaiting a
    /// decision (not `published` or `rejected`), oldest first.
    pub async fn list_queue(
        &self,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<Page, FolioError> {
        let pagination = validate::validate_pagination(limit, offset);
        let mut items: Vec<Submission> = self
            .repository
            .list()
            .await?
            .into_iter()
            .filter(|s| !s.status.is_terminal())
            .collect();
        items.sort_by_key(|s| s.submitted_at);
        Ok(Page::slice(items, &pagination))
    }

    /// Applies an editorial status transition, recording the reviewer.
    pub async fn update_status(
        &self,
        id: &str,
        next: SubmissionStatus,
        actor: &Identity,
    ) -> Result<Submission, FolioError> {
        let updated = self
            .repository
            .update(id, |s| s.transition(next, &actor.user_id))
            .await?;
        tracing::info!(
            submission = %id,
            status = %next,
            reviewer = %actor.log_id(),
            "submission status changed"
        );
        Ok(updated)
    }

    /// Sets the editorial rating (0 to 5).
    pub async fn set_rating(
        &self,
        id: &str,
        rating: u8,
        actor: &Identity,
    ) -> Result<Submission, FolioError> {
        self.repository
            .update(id, |s| s.set_rating(rating, &actor.user_id))
            .await
    }

    /// Replaces the internal editorial notes.
    pub async fn set_notes(
        &self,
        id: &str,
        notes: &str,
        actor: &Identity,
    ) -> Result<Submission, FolioError> {
        self.repository
            .update(id, |s| s.set_notes(notes, &actor.user_id))
            .await
    }

    /// The owner resubmits after revisions were requested.
    ///
    /// Ownership is checked against the loaded record: only the submitting
    /// writer may re-enter the queue.
    pub async fn resubmit(&self, id: &str, actor: &Identity) -> Result<Submission, FolioError> {
        self.repository
            .update(id, |s| {
                if s.user_id != actor.user_id {
                    return Err(FolioError::forbidden(
                        "Only the submitting writer may resubmit",
                    ));
                }
                s.resubmit(&actor.user_id)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::MemoryStore;
    use serde_json::json;

    fn service() -> SubmissionService {
        SubmissionService::new(Arc::new(MemoryStore::new()))
    }

    fn writer() -> Identity {
        Identity::writer("w1", "writer@folio.press")
    }

    fn editor() -> Identity {
        Identity::editor("e1", "editor@folio.press")
    }

    fn body(title: &str) -> Value {
        json!({"title": title, "content": "the work", "genre": "poetry"})
    }

    #[tokio::test]
    async fn test_submit_creates_pending_submission() {
        let service = service();
        let submission = service.submit(&writer(), &body("Night Mail")).await.unwrap();

        assert_eq!(submission.status, SubmissionStatus::Pending);
        assert_eq!(submission.user_id, "w1");
        assert_eq!(submission.history.len(), 1);

        let loaded = service.get(&submission.id).await.unwrap();
        assert_eq!(loaded.title, "Night Mail");
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_body() {
        let service = service();
        let result = service
            .submit(&writer(), &json!({"title": "", "content": "x"}))
            .await;
        match result {
            Err(FolioError::Validation { field_errors }) => {
                assert!(field_errors.iter().any(|e| e.field == "title"));
                assert!(field_errors.iter().any(|e| e.field == "genre"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_for_user_filters_and_paginates() {
        let service = service();
        for i in 0..3 {
            service.submit(&writer(), &body(&format!("Work {i}"))).await.unwrap();
        }
        service
            .submit(
                &Identity::writer("w2", "other@folio.press"),
                &body("Someone else's"),
            )
            .await
            .unwrap();

        let page = service.list_for_user("w1", Some("2"), None).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|s| s.user_id == "w1"));

        let rest = service
            .list_for_user("w1", Some("2"), Some("2"))
            .await
            .unwrap();
        assert_eq!(rest.items.len(), 1);
    }

    #[tokio::test]
    async fn test_list_for_user_tolerates_bad_pagination() {
        let service = service();
        service.submit(&writer(), &body("Work")).await.unwrap();

        let page = service
            .list_for_user("w1", Some("200"), Some("-1"))
            .await
            .unwrap();
        assert_eq!((page.limit, page.offset), (20, 0));
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_queue_excludes_closed_submissions() {
        let service = service();
        let open = service.submit(&writer(), &body("Open")).await.unwrap();
        let closed = service.submit(&writer(), &body("Closed")).await.unwrap();
        service
            .update_status(&closed.id, SubmissionStatus::Rejected, &editor())
            .await
            .unwrap();

        let queue = service.list_queue(None, None).await.unwrap();
        let ids: Vec<&str> = queue.items.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![open.id.as_str()]);
    }

    #[tokio::test]
    async fn test_update_status_records_reviewer() {
        let service = service();
        let submission = service.submit(&writer(), &body("Night Mail")).await.unwrap();

        let updated = service
            .update_status(&submission.id, SubmissionStatus::Queued, &editor())
            .await
            .unwrap();
        assert_eq!(updated.status, SubmissionStatus::Queued);
        assert_eq!(updated.reviewed_by.as_deref(), Some("e1"));
        assert!(updated.reviewed_at.is_some());
        assert_eq!(updated.history[1].actor_id, "e1");
    }

    #[tokio::test]
    async fn test_invalid_transition_surfaces_conflict() {
        let service = service();
        let submission = service.submit(&writer(), &body("Night Mail")).await.unwrap();

        let result = service
            .update_status(&submission.id, SubmissionStatus::Published, &editor())
            .await;
        assert!(matches!(result, Err(FolioError::Conflict { .. })));

        // No partial mutation.
        let loaded = service.get(&submission.id).await.unwrap();
        assert_eq!(loaded.status, SubmissionStatus::Pending);
        assert_eq!(loaded.history.len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_on_missing_submission_is_not_found() {
        let service = service();
        let result = service
            .update_status("missing", SubmissionStatus::Queued, &editor())
            .await;
        assert!(matches!(result, Err(FolioError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_resubmit_is_owner_only() {
        let service = service();
        let submission = service.submit(&writer(), &body("Night Mail")).await.unwrap();
        service
            .update_status(&submission.id, SubmissionStatus::RevisionsRequested, &editor())
            .await
            .unwrap();

        let intruder = Identity::writer("w2", "other@folio.press");
        assert!(matches!(
            service.resubmit(&submission.id, &intruder).await,
            Err(FolioError::Authorization { .. })
        ));

        let resubmitted = service.resubmit(&submission.id, &writer()).await.unwrap();
        assert_eq!(resubmitted.status, SubmissionStatus::Pending);
        assert_eq!(resubmitted.history.last().unwrap().actor_id, "w1");
    }

    #[tokio::test]
    async fn test_rating_and_notes_side_channels() {
        let service = service();
        let submission = service.submit(&writer(), &body("Night Mail")).await.unwrap();

        let rated = service.set_rating(&submission.id, 4, &editor()).await.unwrap();
        assert_eq!(rated.rating, Some(4));

        let noted = service
            .set_notes(&submission.id, "strong imagery", &editor())
            .await
            .unwrap();
        assert_eq!(noted.internal_notes.as_deref(), Some("strong imagery"));

        service
            .update_status(&submission.id, SubmissionStatus::Rejected, &editor())
            .await
            .unwrap();
        assert!(matches!(
            service.set_notes(&submission.id, "too late", &editor()).await,
            Err(FolioError::Conflict { .. })
        ));
    }
}
