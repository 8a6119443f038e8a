//! Single-event applier.
//!
//! [`apply`] folds one [`Event`] onto an optional existing [`IssueSnapshot`].
//! Two kinds of failure exist and they are kept strictly apart:
//!
//! - **Structural errors** ([`ApplyError`]): unknown action tag, undecodable
//!   payload, a non-create event for an issue that does not exist yet, or a
//!   second create. These stop replay.
//! - **Policy no-ops** ([`SkipReason`]): stale or redundant requests such as
//!   a `from_status` mismatch, a status name this build does not know,
//!   reopening an issue that is not closed, or any event against a deleted
//!   issue. The snapshot comes back exactly as it
//!   went in, and the skip is logged at `debug`.
//!
//! # Comment side-channel
//!
//! Any event whose payload carries a non-empty `comment` appends it to the
//! snapshot's comment list after the action ran, even when the action itself
//! was a policy no-op. The only exception is an issue that was already
//! deleted before the event: deleted snapshots never change.

use std::fmt;

use tracing::{debug, trace};

use crate::event::{Action, Event, Payload, PayloadError, UnknownAction};
use crate::model::issue::{Comment, IssueSnapshot, normalize_labels};
use crate::model::status::Status;

/// Errors that stop event application.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The action tag is not one of the eight known actions.
    #[error(transparent)]
    UnknownAction(#[from] UnknownAction),

    /// The payload could not be decoded for the event's action.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// A non-create event arrived for an issue that has no snapshot.
    #[error("{action} for issue {issue_id} before its create event")]
    MissingIssue { issue_id: String, action: Action },

    /// A create event arrived for an issue that already has a snapshot.
    #[error("issue {issue_id} already created")]
    DuplicateCreate { issue_id: String },
}

/// Knobs shared by [`apply_with`] and the batch replayer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Also require a transition-table edge for `status_change`.
    ///
    /// Off by default: a matching `from_status` is the only gate.
    pub enforce_transitions: bool,
}

/// Why an event left the snapshot untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The issue is deleted.
    Terminal,
    /// `status_change` without a target status.
    EmptyTargetStatus,
    /// `status_change` naming a status outside the known six, as target or
    /// as `from_status`.
    UnknownStatus,
    /// `status_change` whose `from_status` differs from the current status.
    FromStatusMismatch { expected: Status, actual: Status },
    /// `status_change` rejected by the transition table (strict mode only).
    NotInTable { from: Status, to: Status },
    /// `close` on an issue that is already closed.
    AlreadyClosed,
    /// `reopen` on an issue that is not closed.
    NotClosed { actual: Status },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal => f.write_str("issue is deleted"),
            Self::EmptyTargetStatus => f.write_str("no target status"),
            Self::UnknownStatus => f.write_str("unknown status name"),
            Self::FromStatusMismatch { expected, actual } => {
                write!(f, "from_status {expected} does not match current {actual}")
            }
            Self::NotInTable { from, to } => write!(f, "{from} -> {to} is not a valid transition"),
            Self::AlreadyClosed => f.write_str("already closed"),
            Self::NotClosed { actual } => write!(f, "cannot reopen from {actual}"),
        }
    }
}

/// What happened to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The action mutated the snapshot.
    Applied,
    /// The action was a policy no-op.
    Skipped(SkipReason),
}

impl Outcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Result of [`apply_detailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub snapshot: IssueSnapshot,
    pub outcome: Outcome,
    /// Whether the comment side-channel appended a comment.
    pub commented: bool,
}

/// Apply one event with default options.
///
/// # Errors
///
/// See [`ApplyError`].
pub fn apply(existing: Option<IssueSnapshot>, event: &Event) -> Result<IssueSnapshot, ApplyError> {
    apply_with(existing, event, ReplayOptions::default())
}

/// Apply one event with explicit options.
///
/// # Errors
///
/// See [`ApplyError`].
pub fn apply_with(
    existing: Option<IssueSnapshot>,
    event: &Event,
    options: ReplayOptions,
) -> Result<IssueSnapshot, ApplyError> {
    apply_detailed(existing, event, options).map(|applied| applied.snapshot)
}

/// Apply one event and report whether it mutated the snapshot.
///
/// The snapshot is taken by value and updated in place. Callers that need
/// the previous state must clone before calling.
///
/// # Errors
///
/// See [`ApplyError`].
pub fn apply_detailed(
    existing: Option<IssueSnapshot>,
    event: &Event,
    options: ReplayOptions,
) -> Result<Applied, ApplyError> {
    let mut slot = existing;
    let effect = step(&mut slot, event, options)?;
    match slot {
        Some(snapshot) => Ok(Applied {
            snapshot,
            outcome: effect.outcome,
            commented: effect.commented,
        }),
        None => Err(ApplyError::MissingIssue {
            issue_id: event.issue_id.clone(),
            action: event.action()?,
        }),
    }
}

/// Effect of one event on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub outcome: Outcome,
    pub commented: bool,
}

/// Apply `event` to `slot` in place.
///
/// Every error is raised before the slot is touched, so on `Err` the slot
/// still holds what it held before. On `Ok` the slot is always `Some`.
pub(crate) fn step(
    slot: &mut Option<IssueSnapshot>,
    event: &Event,
    options: ReplayOptions,
) -> Result<Step, ApplyError> {
    let action = event.action()?;
    let payload = event.payload(action)?;

    let Some(snapshot) = slot.as_mut() else {
        if action != Action::Create {
            return Err(ApplyError::MissingIssue {
                issue_id: event.issue_id.clone(),
                action,
            });
        }
        let snapshot = slot.insert(create_snapshot(event, &payload));
        let commented = record_comment(snapshot, event, &payload);
        trace!(issue_id = %event.issue_id, event_id = %event.id, "issue created");
        return Ok(Step {
            outcome: Outcome::Applied,
            commented,
        });
    };

    let locked = snapshot.is_terminal();
    let outcome = match action {
        Action::Create => {
            return Err(ApplyError::DuplicateCreate {
                issue_id: event.issue_id.clone(),
            });
        }
        _ if locked => Outcome::Skipped(SkipReason::Terminal),
        Action::StatusChange => change_status(snapshot, event, &payload, options),
        Action::Assign => {
            snapshot.owner = payload.owner.clone().unwrap_or_default();
            snapshot.touch(event.timestamp);
            Outcome::Applied
        }
        Action::Close => {
            if snapshot.status == Status::Closed {
                Outcome::Skipped(SkipReason::AlreadyClosed)
            } else {
                snapshot.status = Status::Closed;
                snapshot.closed_at = Some(event.timestamp);
                snapshot.touch(event.timestamp);
                Outcome::Applied
            }
        }
        Action::Reopen => {
            if snapshot.status == Status::Closed {
                snapshot.status = Status::Open;
                snapshot.closed_at = None;
                snapshot.touch(event.timestamp);
                Outcome::Applied
            } else {
                Outcome::Skipped(SkipReason::NotClosed {
                    actual: snapshot.status,
                })
            }
        }
        Action::Update => {
            patch(snapshot, &payload);
            snapshot.touch(event.timestamp);
            Outcome::Applied
        }
        Action::Delete => {
            snapshot.status = Status::Deleted;
            snapshot.touch(event.timestamp);
            Outcome::Applied
        }
        Action::Comment => {
            snapshot.touch(event.timestamp);
            Outcome::Applied
        }
    };

    match outcome {
        Outcome::Applied => {
            trace!(issue_id = %event.issue_id, event_id = %event.id, %action, "event applied");
        }
        Outcome::Skipped(reason) => {
            debug!(
                issue_id = %event.issue_id,
                event_id = %event.id,
                %action,
                %reason,
                "event skipped"
            );
        }
    }

    let commented = !locked && record_comment(snapshot, event, &payload);
    Ok(Step { outcome, commented })
}

fn create_snapshot(event: &Event, payload: &Payload) -> IssueSnapshot {
    let mut snapshot = IssueSnapshot::new(&event.issue_id, &event.repo_id, event.timestamp);
    snapshot.title = payload.title.clone().unwrap_or_default();
    snapshot.description = payload.description.clone().unwrap_or_default();
    snapshot.owner = payload.owner.clone().unwrap_or_default();
    snapshot.labels = normalize_labels(payload.labels.clone().unwrap_or_default());
    snapshot.priority = payload.priority;
    if let Some(issue_type) = payload.issue_type {
        snapshot.issue_type = issue_type;
    }
    snapshot
}

fn change_status(
    snapshot: &mut IssueSnapshot,
    event: &Event,
    payload: &Payload,
    options: ReplayOptions,
) -> Outcome {
    let Some(raw_target) = payload.status.as_deref() else {
        return Outcome::Skipped(SkipReason::EmptyTargetStatus);
    };
    let Ok(target) = raw_target.parse::<Status>() else {
        debug!(issue_id = %event.issue_id, status = raw_target, "unknown target status");
        return Outcome::Skipped(SkipReason::UnknownStatus);
    };

    // Legacy events carry no from_status and are accepted as-is.
    match payload.from_status.as_deref().map(str::parse::<Status>) {
        Some(Err(err)) => {
            debug!(issue_id = %event.issue_id, %err, "unknown from_status");
            return Outcome::Skipped(SkipReason::UnknownStatus);
        }
        Some(Ok(expected)) if expected != snapshot.status => {
            return Outcome::Skipped(SkipReason::FromStatusMismatch {
                expected,
                actual: snapshot.status,
            });
        }
        _ => {}
    }

    if options.enforce_transitions && !snapshot.status.valid_transition(target) {
        return Outcome::Skipped(SkipReason::NotInTable {
            from: snapshot.status,
            to: target,
        });
    }

    snapshot.status = target;
    snapshot.touch(event.timestamp);
    Outcome::Applied
}

/// Overwrite only the fields the payload carries.
fn patch(snapshot: &mut IssueSnapshot, payload: &Payload) {
    if let Some(title) = &payload.title {
        snapshot.title.clone_from(title);
    }
    if let Some(description) = &payload.description {
        snapshot.description.clone_from(description);
    }
    if let Some(priority) = payload.priority {
        snapshot.priority = Some(priority);
    }
    if let Some(issue_type) = payload.issue_type {
        snapshot.issue_type = issue_type;
    }
    if let Some(labels) = &payload.labels {
        snapshot.labels = normalize_labels(labels.clone());
    }
}

fn record_comment(snapshot: &mut IssueSnapshot, event: &Event, payload: &Payload) -> bool {
    let Some(text) = payload.comment_text() else {
        return false;
    };
    snapshot
        .comments
        .push(Comment::new(text, &event.agent, event.timestamp));
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid time")
    }

    fn event(seq: i64, action: &str, payload: serde_json::Value) -> Event {
        Event {
            id: format!("c-{seq}"),
            sequence: seq,
            issue_id: "101".into(),
            repo_id: "acme/api".into(),
            timestamp: at(seq),
            action: action.into(),
            payload,
            agent: "alice".into(),
        }
    }

    fn created() -> IssueSnapshot {
        apply(
            None,
            &event(0, "create", json!({"title": "Flaky login", "labels": ["auth"]})),
        )
        .expect("create")
    }

    fn with_status(status: Status) -> IssueSnapshot {
        let mut snap = created();
        snap.status = status;
        snap
    }

    // -----------------------------------------------------------------------
    // create
    // -----------------------------------------------------------------------

    #[test]
    fn create_sets_defaults_and_payload() {
        let snap = apply(
            None,
            &event(
                0,
                "create",
                json!({
                    "title": "A",
                    "description": "B",
                    "priority": 1,
                    "issue_type": "bug",
                    "owner": "carol"
                }),
            ),
        )
        .expect("create");

        assert_eq!(snap.id, "101");
        assert_eq!(snap.repo_id, "acme/api");
        assert_eq!(snap.status, Status::Open);
        assert_eq!(snap.title, "A");
        assert_eq!(snap.description, "B");
        assert_eq!(snap.priority, Some(1));
        assert_eq!(snap.issue_type, crate::IssueType::Bug);
        assert_eq!(snap.owner, "carol");
        assert!(snap.labels.is_empty());
        assert_eq!(snap.created_at, at(0));
        assert_eq!(snap.updated_at, at(0));
        assert_eq!(snap.closed_at, None);
    }

    #[test]
    fn create_with_null_labels_normalizes_to_empty() {
        let snap = apply(None, &event(0, "create", json!({"labels": null}))).expect("create");
        assert_eq!(snap.labels, Vec::<String>::new());
    }

    #[test]
    fn create_with_empty_payload() {
        let snap = apply(None, &event(0, "create", serde_json::Value::Null)).expect("create");
        assert_eq!(snap.title, "");
        assert_eq!(snap.priority, None);
    }

    #[test]
    fn create_on_existing_snapshot_is_an_error() {
        let err = apply(Some(created()), &event(1, "create", json!({}))).unwrap_err();
        assert!(matches!(err, ApplyError::DuplicateCreate { ref issue_id } if issue_id == "101"));
    }

    #[test]
    fn create_records_comment() {
        let snap = apply(None, &event(0, "create", json!({"comment": "filed from triage"})))
            .expect("create");
        assert_eq!(snap.comments.len(), 1);
        assert_eq!(snap.comments[0].author, "alice");
    }

    // -----------------------------------------------------------------------
    // structural errors
    // -----------------------------------------------------------------------

    #[test]
    fn non_create_without_snapshot_is_an_error() {
        for action in Action::ALL {
            if action == Action::Create {
                continue;
            }
            let err = apply(None, &event(1, action.as_str(), json!({}))).unwrap_err();
            assert!(
                matches!(err, ApplyError::MissingIssue { action: a, .. } if a == action),
                "{action}: {err}"
            );
        }
    }

    #[test]
    fn unknown_action_is_an_error() {
        let err = apply(Some(created()), &event(1, "archive", json!({}))).unwrap_err();
        assert!(matches!(err, ApplyError::UnknownAction(ref u) if u.raw == "archive"));
    }

    #[test]
    fn bad_payload_is_an_error() {
        let err = apply(Some(created()), &event(1, "update", json!({"priority": "high"})))
            .unwrap_err();
        assert!(matches!(err, ApplyError::Payload(_)));
        assert!(err.to_string().contains("invalid update payload"));
    }

    // -----------------------------------------------------------------------
    // status_change
    // -----------------------------------------------------------------------

    #[test]
    fn status_change_with_matching_from_status() {
        let snap = apply(
            Some(with_status(Status::InProgress)),
            &event(1, "status_change", json!({"status": "closed", "from_status": "in_progress"})),
        )
        .expect("apply");
        assert_eq!(snap.status, Status::Closed);
        assert_eq!(snap.updated_at, at(1));
    }

    #[test]
    fn status_change_with_stale_from_status_is_noop() {
        let before = with_status(Status::InProgress);
        let after = apply(
            Some(before.clone()),
            &event(1, "status_change", json!({"status": "closed", "from_status": "open"})),
        )
        .expect("apply");
        assert_eq!(after, before);
    }

    #[test]
    fn status_change_without_from_status_always_applies() {
        for status in [Status::Open, Status::InProgress, Status::Blocked, Status::Closed] {
            let snap = apply(
                Some(with_status(status)),
                &event(1, "status_change", json!({"status": "in_review"})),
            )
            .expect("apply");
            assert_eq!(snap.status, Status::InReview, "from {status}");
        }
    }

    #[test]
    fn status_change_without_target_is_noop() {
        let before = created();
        for payload in [json!({}), json!({"status": ""}), json!({"from_status": "open"})] {
            let after = apply(Some(before.clone()), &event(1, "status_change", payload))
                .expect("apply");
            assert_eq!(after, before);
        }
    }

    #[test]
    fn status_change_with_unknown_from_status_is_dropped() {
        let before = created();
        let applied = apply_detailed(
            Some(before.clone()),
            &event(1, "status_change", json!({"status": "closed", "from_status": "todo"})),
            ReplayOptions::default(),
        )
        .expect("apply");
        assert_eq!(applied.snapshot, before);
        assert_eq!(applied.outcome, Outcome::Skipped(SkipReason::UnknownStatus));
    }

    #[test]
    fn status_change_to_unknown_status_is_dropped() {
        let before = with_status(Status::InProgress);
        for payload in [
            json!({"status": "done"}),
            json!({"status": "Closed", "from_status": "in_progress"}),
        ] {
            let applied = apply_detailed(
                Some(before.clone()),
                &event(1, "status_change", payload),
                ReplayOptions::default(),
            )
            .expect("apply");
            assert_eq!(applied.snapshot, before);
            assert_eq!(applied.outcome, Outcome::Skipped(SkipReason::UnknownStatus));
        }
    }

    #[test]
    fn unknown_status_still_records_comment() {
        let snap = apply(
            Some(created()),
            &event(1, "status_change", json!({"status": "wontfix", "comment": "see #9"})),
        )
        .expect("apply");
        assert_eq!(snap.status, Status::Open);
        assert_eq!(snap.comments.len(), 1);
    }

    #[test]
    fn status_change_ignores_table_by_default() {
        // blocked is not a table key, yet a matching from_status is enough.
        let snap = apply(
            Some(with_status(Status::Blocked)),
            &event(1, "status_change", json!({"status": "closed", "from_status": "blocked"})),
        )
        .expect("apply");
        assert_eq!(snap.status, Status::Closed);
    }

    #[test]
    fn strict_mode_consults_table() {
        let strict = ReplayOptions {
            enforce_transitions: true,
        };
        let before = with_status(Status::Blocked);
        let applied = apply_detailed(
            Some(before.clone()),
            &event(1, "status_change", json!({"status": "closed", "from_status": "blocked"})),
            strict,
        )
        .expect("apply");
        assert_eq!(applied.snapshot, before);
        assert_eq!(
            applied.outcome,
            Outcome::Skipped(SkipReason::NotInTable {
                from: Status::Blocked,
                to: Status::Closed
            })
        );

        let snap = apply_with(
            Some(created()),
            &event(1, "status_change", json!({"status": "in_progress"})),
            strict,
        )
        .expect("apply");
        assert_eq!(snap.status, Status::InProgress);
    }

    // -----------------------------------------------------------------------
    // assign / close / reopen / update / delete / comment
    // -----------------------------------------------------------------------

    #[test]
    fn assign_sets_owner_including_empty() {
        let snap = apply(Some(created()), &event(1, "assign", json!({"owner": "bob"})))
            .expect("apply");
        assert_eq!(snap.owner, "bob");
        let snap = apply(Some(snap), &event(2, "assign", json!({}))).expect("apply");
        assert_eq!(snap.owner, "");
        assert_eq!(snap.updated_at, at(2));
    }

    #[test]
    fn close_sets_closed_at() {
        let snap = apply(Some(created()), &event(3, "close", json!({}))).expect("apply");
        assert_eq!(snap.status, Status::Closed);
        assert_eq!(snap.closed_at, Some(at(3)));
        assert_eq!(snap.updated_at, at(3));
    }

    #[test]
    fn close_on_closed_is_noop_but_records_comment() {
        let closed = apply(Some(created()), &event(1, "close", json!({}))).expect("close");
        let applied = apply_detailed(
            Some(closed.clone()),
            &event(2, "close", json!({"comment": "dup of #7"})),
            ReplayOptions::default(),
        )
        .expect("apply");

        assert_eq!(applied.outcome, Outcome::Skipped(SkipReason::AlreadyClosed));
        assert!(applied.commented);
        let snap = applied.snapshot;
        assert_eq!(snap.status, Status::Closed);
        assert_eq!(snap.closed_at, closed.closed_at);
        assert_eq!(snap.updated_at, closed.updated_at);
        assert_eq!(snap.comments.len(), 1);
        assert_eq!(snap.comments[0].text, "dup of #7");
        assert_eq!(snap.comments[0].timestamp, "2023-11-14T22:13:22Z");
    }

    #[test]
    fn reopen_only_from_closed() {
        let closed = apply(Some(created()), &event(1, "close", json!({}))).expect("close");
        let reopened = apply(Some(closed), &event(2, "reopen", json!({}))).expect("reopen");
        assert_eq!(reopened.status, Status::Open);
        assert_eq!(reopened.closed_at, None);
        assert_eq!(reopened.updated_at, at(2));

        for status in [Status::Open, Status::InProgress, Status::Blocked, Status::InReview] {
            let before = with_status(status);
            let after = apply(Some(before.clone()), &event(3, "reopen", json!({})))
                .expect("reopen");
            assert_eq!(after, before, "reopen from {status}");
        }
    }

    #[test]
    fn update_is_a_partial_patch() {
        let snap = apply(
            None,
            &event(
                0,
                "create",
                json!({"title": "A", "description": "B", "priority": 3, "labels": ["a", "b"]}),
            ),
        )
        .expect("create");
        let snap = apply(
            Some(snap),
            &event(1, "update", json!({"title": "C", "labels": ["x"]})),
        )
        .expect("update");

        assert_eq!(snap.title, "C");
        assert_eq!(snap.description, "B");
        assert_eq!(snap.priority, Some(3));
        assert_eq!(snap.labels, vec!["x"]);
        assert_eq!(snap.updated_at, at(1));
    }

    #[test]
    fn update_with_present_empty_values_overwrites() {
        let snap = apply(
            Some(created()),
            &event(1, "update", json!({"title": "", "priority": 0, "labels": []})),
        )
        .expect("update");
        assert_eq!(snap.title, "");
        assert_eq!(snap.priority, Some(0));
        assert!(snap.labels.is_empty());
    }

    #[test]
    fn empty_update_still_bumps_updated_at() {
        let before = created();
        let after = apply(Some(before.clone()), &event(5, "update", json!({}))).expect("update");
        assert_eq!(after.updated_at, at(5));
        assert_eq!(after.title, before.title);
    }

    #[test]
    fn delete_is_terminal_for_every_action() {
        let deleted = apply(Some(created()), &event(1, "delete", json!({}))).expect("delete");
        assert_eq!(deleted.status, Status::Deleted);

        let payload = json!({
            "status": "open",
            "title": "resurrected",
            "owner": "mallory",
            "labels": ["x"],
            "comment": "hello?"
        });
        for action in Action::ALL {
            if action == Action::Create {
                continue;
            }
            let applied = apply_detailed(
                Some(deleted.clone()),
                &event(2, action.as_str(), payload.clone()),
                ReplayOptions::default(),
            )
            .expect("apply");
            assert_eq!(applied.snapshot, deleted, "{action} changed a deleted issue");
            assert_eq!(applied.outcome, Outcome::Skipped(SkipReason::Terminal));
            assert!(!applied.commented);
        }
    }

    #[test]
    fn delete_event_may_carry_a_comment() {
        let snap = apply(Some(created()), &event(1, "delete", json!({"comment": "spam"})))
            .expect("delete");
        assert_eq!(snap.status, Status::Deleted);
        assert_eq!(snap.comments.len(), 1);
    }

    #[test]
    fn comment_action_bumps_and_records() {
        let snap = apply(Some(created()), &event(4, "comment", json!({"comment": "+1"})))
            .expect("comment");
        assert_eq!(snap.updated_at, at(4));
        assert_eq!(snap.comments.len(), 1);
        assert_eq!(snap.comments[0].text, "+1");
    }

    #[test]
    fn empty_comment_is_not_recorded() {
        let snap = apply(Some(created()), &event(4, "comment", json!({"comment": ""})))
            .expect("comment");
        assert!(snap.comments.is_empty());
    }
}
