//! The submission entity and its state machine.
//!
//! The lifecycle:
//!
//! ```text
//! pending → queued → in_issue → published   (terminal)
//!    \         \         \
//!     +---------+---------+--→ revisions_requested → queued | rejected
//!      \         \         \         (owner may resubmit → pending)
//!       +---------+---------+--→ rejected   (terminal)
//! ```
//!
//! Every status change appends exactly one [`HistoryEntry`] in the same
//! mutation; `history` never shrinks. An invalid transition is a
//! [`FolioError::Conflict`] and leaves the entity untouched.

use chrono::{DateTime, Utc};
use folio_core::{FieldError, FolioError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest accepted editorial rating.
pub const MAX_RATING: u8 = 5;

/// The submission lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Newly submitted, awaiting editorial review.
    Pending,
    /// Accepted into the editorial queue.
    Queued,
    /// Placed into an upcoming issue.
    InIssue,
    /// Published. Terminal.
    Published,
    /// Returned to the writer for revisions; the writer may resubmit.
    RevisionsRequested,
    /// Declined. Terminal.
    Rejected,
}

impl SubmissionStatus {
    /// The wire/history name of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::InIssue => "in_issue",
            Self::Published => "published",
            Self::RevisionsRequested => "revisions_requested",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the submission is closed for further editorial action.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Rejected)
    }

    /// Whether an editor may move a submission from `self` to `next`.
    ///
    /// The owner's resubmit path (`revisions_requested → pending`) is not
    /// an editorial transition and is handled separately.
    #[must_use]
    pub const fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Queued)
                | (Self::Queued, Self::InIssue)
                | (Self::InIssue, Self::Published)
                | (
                    Self::Pending | Self::Queued | Self::InIssue,
                    Self::RevisionsRequested | Self::Rejected
                )
                | (Self::RevisionsRequested, Self::Queued | Self::Rejected)
        )
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only audit record on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// What happened, e.g. `"Submitted"` or `"Status changed to queued"`.
    pub action: String,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Who did it.
    pub actor_id: String,
}

impl HistoryEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(action: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            timestamp: Utc::now(),
            actor_id: actor_id.into(),
        }
    }
}

/// An editorial submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// UUID, canonical form; doubles as the store key suffix.
    pub id: String,
    /// The submitting writer. Immutable after creation.
    pub user_id: String,
    /// Work title.
    pub title: String,
    /// The work itself.
    pub content: String,
    /// Genre/category label.
    pub genre: String,
    /// Current lifecycle state.
    pub status: SubmissionStatus,
    /// When the work was submitted. Immutable.
    pub submitted_at: DateTime<Utc>,
    /// The editor who last changed the status.
    #[serde(default)]
    pub reviewed_by: Option<String>,
    /// When the status last changed.
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Editorial rating, 0 to 5.
    #[serde(default)]
    pub rating: Option<u8>,
    /// Editor-side notes; writers never mutate this.
    #[serde(default)]
    pub internal_notes: Option<String>,
    /// Append-only audit trail.
    pub history: Vec<HistoryEntry>,
}

impl Submission {
    /// Creates a new `pending` submission with a single `"Submitted"`
    /// history entry.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        genre: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.clone(),
            title: title.into(),
            content: content.into(),
            genre: genre.into(),
            status: SubmissionStatus::Pending,
            submitted_at: Utc::now(),
            reviewed_by: None,
            reviewed_at: None,
            rating: None,
            internal_notes: None,
            history: vec![HistoryEntry::new("Submitted", user_id)],
        }
    }

    /// Applies an editorial status transition.
    ///
    /// Status, review fields, and the history entry change together or not
    /// at all; an invalid transition is a `Conflict` and mutates nothing.
    pub fn transition(
        &mut self,
        next: SubmissionStatus,
        actor_id: &str,
    ) -> Result<(), FolioError> {
        if !self.status.allows(next) {
            return Err(FolioError::conflict(format!(
                "cannot move submission from '{}' to '{}'",
                self.status, next
            )));
        }
        self.status = next;
        self.reviewed_by = Some(actor_id.to_string());
        self.reviewed_at = Some(Utc::now());
        self.history.push(HistoryEntry::new(
            format!("Status changed to {next}"),
            actor_id,
        ));
        Ok(())
    }

    /// The owner resubmits revised work: `revisions_requested → pending`.
    pub fn resubmit(&mut self, actor_id: &str) -> Result<(), FolioError> {
        if self.status != SubmissionStatus::RevisionsRequested {
            return Err(FolioError::conflict(format!(
                "cannot resubmit a submission in state '{}'",
                self.status
            )));
        }
        self.status = SubmissionStatus::Pending;
        self.history.push(HistoryEntry::new(
            "Status changed to pending",
            actor_id,
        ));
        Ok(())
    }

    /// Sets the editorial rating. Closed submissions reject the edit.
    pub fn set_rating(&mut self, rating: u8, actor_id: &str) -> Result<(), FolioError> {
        if self.status.is_terminal() {
            return Err(FolioError::conflict(
                "submission is closed; rating can no longer change",
            ));
        }
        if rating > MAX_RATING {
            return Err(FolioError::validation(vec![FieldError::new(
                "rating",
                format!("rating must be between 0 and {MAX_RATING}"),
            )]));
        }
        self.rating = Some(rating);
        self.history
            .push(HistoryEntry::new(format!("Rated {rating}"), actor_id));
        Ok(())
    }

    /// Replaces the internal notes. Closed submissions reject the edit.
    pub fn set_notes(&mut self, notes: impl Into<String>, actor_id: &str) -> Result<(), FolioError> {
        if self.status.is_terminal() {
            return Err(FolioError::conflict(
                "submission is closed; notes can no longer change",
            ));
        }
        self.internal_notes = Some(notes.into());
        self.history
            .push(HistoryEntry::new("Notes updated", actor_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Submission {
        Submission::new("w1", "Fragments of Home", "the poem text", "poetry")
    }

    #[test]
    fn test_new_submission_is_pending_with_one_entry() {
        let s = sample();
        assert_eq!(s.status, SubmissionStatus::Pending);
        assert_eq!(s.history.len(), 1);
        assert_eq!(s.history[0].action, "Submitted");
        assert_eq!(s.history[0].actor_id, "w1");
        assert!(s.reviewed_by.is_none());
    }

    #[test]
    fn test_happy_path_yields_four_history_entries() {
        let mut s = sample();
        s.transition(SubmissionStatus::Queued, "e1").unwrap();
        s.transition(SubmissionStatus::InIssue, "e1").unwrap();
        s.transition(SubmissionStatus::Published, "e1").unwrap();

        assert_eq!(s.status, SubmissionStatus::Published);
        assert_eq!(s.history.len(), 4);
        let actions: Vec<&str> = s.history.iter().map(|h| h.action.as_str()).collect();
        assert_eq!(
            actions,
            vec![
                "Submitted",
                "Status changed to queued",
                "Status changed to in_issue",
                "Status changed to published",
            ]
        );
        assert_eq!(s.reviewed_by.as_deref(), Some("e1"));
    }

    #[test]
    fn test_invalid_transition_is_conflict_and_mutates_nothing() {
        let mut s = sample();
        let before = s.clone();

        let result = s.transition(SubmissionStatus::Published, "e1");
        assert!(matches!(result, Err(FolioError::Conflict { .. })));
        assert_eq!(s, before);
    }

    #[test]
    fn test_terminal_states_allow_nothing() {
        for terminal in [SubmissionStatus::Published, SubmissionStatus::Rejected] {
            for next in [
                SubmissionStatus::Pending,
                SubmissionStatus::Queued,
                SubmissionStatus::InIssue,
                SubmissionStatus::Published,
                SubmissionStatus::RevisionsRequested,
                SubmissionStatus::Rejected,
            ] {
                assert!(!terminal.allows(next), "{terminal} -> {next} must be invalid");
            }
        }
    }

    #[test]
    fn test_revisions_can_be_requested_from_any_active_state() {
        let mut s = sample();
        s.transition(SubmissionStatus::RevisionsRequested, "e1").unwrap();
        assert_eq!(s.status, SubmissionStatus::RevisionsRequested);

        // And an editor can re-queue or reject from there.
        assert!(SubmissionStatus::RevisionsRequested.allows(SubmissionStatus::Queued));
        assert!(SubmissionStatus::RevisionsRequested.allows(SubmissionStatus::Rejected));
        assert!(!SubmissionStatus::RevisionsRequested.allows(SubmissionStatus::Published));
    }

    #[test]
    fn test_resubmit_reenters_pending() {
        let mut s = sample();
        s.transition(SubmissionStatus::RevisionsRequested, "e1").unwrap();
        s.resubmit("w1").unwrap();

        assert_eq!(s.status, SubmissionStatus::Pending);
        assert_eq!(s.history.last().unwrap().actor_id, "w1");
    }

    #[test]
    fn test_resubmit_only_from_revisions_requested() {
        let mut s = sample();
        assert!(matches!(s.resubmit("w1"), Err(FolioError::Conflict { .. })));
    }

    #[test]
    fn test_rating_bounds_and_closure() {
        let mut s = sample();
        assert!(matches!(
            s.set_rating(6, "e1"),
            Err(FolioError::Validation { .. })
        ));
        s.set_rating(5, "e1").unwrap();
        assert_eq!(s.rating, Some(5));

        s.transition(SubmissionStatus::Rejected, "e1").unwrap();
        assert!(matches!(
            s.set_rating(3, "e1"),
            Err(FolioError::Conflict { .. })
        ));
        assert!(matches!(
            s.set_notes("too late", "e1"),
            Err(FolioError::Conflict { .. })
        ));
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let s = sample();
        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(value["userId"], "w1");
        assert_eq!(value["status"], "pending");
        assert!(value["submittedAt"].is_string());
        assert_eq!(value["history"][0]["actorId"], "w1");
    }

    #[test]
    fn test_roundtrip_with_missing_optional_fields() {
        // Records written before ratings existed deserialize cleanly.
        let raw = serde_json::json!({
            "id": "0192d3a0-7b1c-7def-8123-456789abcdef",
            "userId": "w1",
            "title": "t",
            "content": "c",
            "genre": "g",
            "status": "queued",
            "submittedAt": "2026-01-05T12:00:00Z",
            "history": []
        });
        let s: Submission = serde_json::from_value(raw).unwrap();
        assert_eq!(s.status, SubmissionStatus::Queued);
        assert!(s.rating.is_none());
    }
}
