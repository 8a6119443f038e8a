//! The shared payload bag carried by every event.
//!
//! Every field is optional. `None` means "not present in the event" and is
//! never the same as a present-but-empty value: `Some(String::new())` for a
//! title or `Some(0)` for a priority are real updates. The exceptions are
//! `status`, `from_status` and `issue_type`, where an empty string on the
//! wire is read as absent. Unknown keys are kept in `extra` for forward
//! compatibility.
//!
//! `status` and `from_status` stay raw text: an unrecognized value is a
//! stale request the applier drops, not a malformed payload.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::model::issue::IssueType;
use crate::model::status::Status;

use super::action::Action;

/// Decoded event payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Target status for `status_change`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub status: Option<String>,

    /// Status the producer observed when it emitted a `status_change`.
    /// Absent on legacy events.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub from_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub issue_type: Option<IssueType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,

    /// Free-text comment recorded by the comment side-channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Payload {
    /// Decode the raw JSON text of an event payload.
    ///
    /// Blank text and a bare `null` decode to [`Payload::default`].
    ///
    /// # Errors
    ///
    /// Returns a [`PayloadError`] if the JSON is malformed or a field has the
    /// wrong type or an unknown enum value.
    pub fn decode(action: Action, raw: &str) -> Result<Self, PayloadError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let value: serde_json::Value =
            serde_json::from_str(trimmed).map_err(|source| PayloadError { action, source })?;
        Self::from_value(action, &value)
    }

    /// Decode a payload that has already been parsed as JSON.
    ///
    /// `null` and the empty string decode to [`Payload::default`].
    ///
    /// # Errors
    ///
    /// Returns a [`PayloadError`] if the value is not an object of the
    /// expected shape.
    pub fn from_value(action: Action, value: &serde_json::Value) -> Result<Self, PayloadError> {
        match value {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::String(s) if s.trim().is_empty() => Ok(Self::default()),
            other => Self::deserialize(other).map_err(|source| PayloadError { action, source }),
        }
    }

    /// Encode back to compact JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if a value in `extra` fails to serialize.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Payload for a `status_change` from `from` (if given) to `to`.
    #[must_use]
    pub fn status_change(to: Status, from: Option<Status>) -> Self {
        Self {
            status: Some(to.as_str().to_string()),
            from_status: from.map(|s| s.as_str().to_string()),
            ..Self::default()
        }
    }

    /// The comment text, if present and non-empty.
    #[must_use]
    pub fn comment_text(&self) -> Option<&str> {
        self.comment.as_deref().filter(|text| !text.is_empty())
    }
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// PayloadError
// ---------------------------------------------------------------------------

/// Error returned when decoding an event's JSON payload fails.
#[derive(Debug)]
pub struct PayloadError {
    /// The action whose payload was being decoded.
    pub action: Action,
    /// The underlying JSON error.
    pub source: serde_json::Error,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} payload: {}", self.action, self.source)
    }
}

impl std::error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
