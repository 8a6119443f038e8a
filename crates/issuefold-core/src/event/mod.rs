//! Event data model for the issuefold event log.
//!
//! An [`Event`] is one change to one issue, reconstructed by the event source
//! from an external record (a tracker comment). The action tag and payload
//! stay in their wire form here; [`Event::action`] and [`Event::payload`]
//! decode them, and decoding failures surface as applier errors attributable
//! to the event.
//!
//! # Ordering
//!
//! `sequence` is the only ordering key. Callers sort ascending by it before
//! handing events to the engine; the engine never re-sorts.

pub mod action;
pub mod codec;
pub mod payload;

pub use action::{Action, UnknownAction};
pub use codec::{CodecError, decode_comment, encode_comment, is_event_comment};
pub use payload::{Payload, PayloadError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single event in an issue's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identity of the originating external record (e.g. a comment id).
    pub id: String,

    /// Monotonic ordering key. Used only for ordering and tie-breaking.
    pub sequence: i64,

    /// The issue this event mutates.
    pub issue_id: String,

    /// Repository the issue lives in. Copied onto the snapshot at creation.
    #[serde(default)]
    pub repo_id: String,

    /// Wall-clock time attributed to the change.
    pub timestamp: DateTime<Utc>,

    /// Raw action tag. See [`Action`] for the closed set.
    pub action: String,

    /// Raw payload. `null` when the event carries none.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Who produced the event. Attribution only.
    #[serde(default)]
    pub agent: String,
}

impl Event {
    /// Build an event with a typed action and payload.
    ///
    /// # Panics
    ///
    /// Never in practice: a [`Payload`] always serializes.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        sequence: i64,
        issue_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        action: Action,
        payload: &Payload,
    ) -> Self {
        Self {
            id: id.into(),
            sequence,
            issue_id: issue_id.into(),
            repo_id: String::new(),
            timestamp,
            action: action.as_str().to_string(),
            payload: serde_json::to_value(payload).expect("payload maps have string keys"),
            agent: String::new(),
        }
    }

    /// Set the repository id.
    #[must_use]
    pub fn in_repo(mut self, repo_id: impl Into<String>) -> Self {
        self.repo_id = repo_id.into();
        self
    }

    /// Set the producing agent.
    #[must_use]
    pub fn by(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    /// Parse the action tag.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownAction`] for tags outside the closed set.
    pub fn action(&self) -> Result<Action, UnknownAction> {
        self.action.parse()
    }

    /// Decode the payload for the given (already parsed) action.
    ///
    /// # Errors
    ///
    /// Returns a [`PayloadError`] if the payload has the wrong shape.
    pub fn payload(&self, action: Action) -> Result<Payload, PayloadError> {
        Payload::from_value(action, &self.payload)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} {} on {} by {}",
            self.sequence,
            self.id,
            self.action,
            self.issue_id,
            if self.agent.is_empty() { "-" } else { &self.agent }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::status::Status;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).single().expect("valid time")
    }

    fn sample_create_event() -> Event {
        Event::new(
            "c-100",
            1,
            "42",
            ts(),
            Action::Create,
            &Payload {
                title: Some("Fix auth retry".into()),
                labels: Some(vec!["backend".into()]),
                ..Payload::default()
            },
        )
        .in_repo("acme/api")
        .by("alice")
    }

    #[test]
    fn builder_sets_wire_fields() {
        let event = sample_create_event();
        assert_eq!(event.action, "create");
        assert_eq!(event.repo_id, "acme/api");
        assert_eq!(event.agent, "alice");
        assert_eq!(
            event.payload,
            json!({"title": "Fix auth retry", "labels": ["backend"]})
        );
    }

    #[test]
    fn builder_keeps_raw_status_text_and_extra_fields() {
        let mut payload = Payload::status_change(Status::Closed, Some(Status::InReview));
        payload.extra.insert("milestone".into(), json!({"due": [1, 2]}));
        let event = Event::new("c-7", 7, "42", ts(), Action::StatusChange, &payload);
        assert_eq!(
            event.payload,
            json!({"status": "closed", "from_status": "in_review", "milestone": {"due": [1, 2]}})
        );
        assert_eq!(event.payload(Action::StatusChange).expect("payload"), payload);
    }

    #[test]
    fn typed_accessors_decode() {
        let event = sample_create_event();
        let action = event.action().expect("action");
        assert_eq!(action, Action::Create);
        let payload = event.payload(action).expect("payload");
        assert_eq!(payload.title.as_deref(), Some("Fix auth retry"));
    }

    #[test]
    fn unknown_action_is_reported() {
        let mut event = sample_create_event();
        event.action = "transfer".into();
        assert_eq!(event.action().unwrap_err().raw, "transfer");
    }

    #[test]
    fn json_roundtrip() {
        let event = sample_create_event();
        let text = serde_json::to_string(&event).expect("serialize");
        let back: Event = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn missing_optional_wire_fields_default() {
        let event: Event = serde_json::from_value(json!({
            "id": "c-1",
            "sequence": 3,
            "issue_id": "9",
            "timestamp": "2024-05-06T07:08:09Z",
            "action": "close"
        }))
        .expect("deserialize");
        assert_eq!(event.payload, serde_json::Value::Null);
        assert_eq!(event.agent, "");
        assert_eq!(event.repo_id, "");
    }

    #[test]
    fn display_is_compact() {
        let event = sample_create_event();
        assert_eq!(event.to_string(), "#1 c-100 create on 42 by alice");
    }
}
