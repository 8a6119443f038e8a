//! Closed set of event actions.
//!
//! The wire carries the action as a bare tag (`create`, `status_change`, ...).
//! [`Action::from_str`] is the only place an unknown tag is rejected; the
//! applier matches exhaustively on the parsed enum.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The eight event actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Create a new issue.
    Create,
    /// Move to a new status, gated by `from_status`.
    StatusChange,
    /// Set the owner.
    Assign,
    /// Close the issue.
    Close,
    /// Partial patch of title, description, priority, type, labels.
    Update,
    /// Tombstone the issue. Terminal.
    Delete,
    /// Reopen a closed issue.
    Reopen,
    /// Comment only; the text rides in the payload.
    Comment,
}

/// Error returned when parsing an unknown action tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown action '{}': expected one of create, status_change, assign, \
             close, update, delete, reopen, comment",
            self.raw
        )
    }
}

impl std::error::Error for UnknownAction {}

impl Action {
    /// All actions in catalog order.
    pub const ALL: [Self; 8] = [
        Self::Create,
        Self::StatusChange,
        Self::Assign,
        Self::Close,
        Self::Update,
        Self::Delete,
        Self::Reopen,
        Self::Comment,
    ];

    /// Return the wire tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::StatusChange => "status_change",
            Self::Assign => "assign",
            Self::Close => "close",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Reopen => "reopen",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "status_change" => Ok(Self::StatusChange),
            "assign" => Ok(Self::Assign),
            "close" => Ok(Self::Close),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "reopen" => Ok(Self::Reopen),
            "comment" => Ok(Self::Comment),
            _ => Err(UnknownAction { raw: s.to_string() }),
        }
    }
}

impl Serialize for Action {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
