//! Remote open/closed decision.
//!
//! Trackers only know "open" and "closed". A derived status maps onto that
//! flag, and [`reconcile`] says whether the remote side needs to flip.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::ParseEnumError;
use crate::model::status::Status;

/// The tracker's native issue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteState {
    Open,
    Closed,
}

impl RemoteState {
    /// `closed` and `deleted` map to [`RemoteState::Closed`]; everything
    /// else is [`RemoteState::Open`].
    #[must_use]
    pub const fn for_status(status: Status) -> Self {
        match status {
            Status::Closed | Status::Deleted => Self::Closed,
            Status::Open | Status::InProgress | Status::Blocked | Status::InReview => Self::Open,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for RemoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "remote state",
                got: s.to_string(),
            }),
        }
    }
}

/// The remote state to set, or `None` if `current` already matches.
#[must_use]
pub fn reconcile(current: RemoteState, status: Status) -> Option<RemoteState> {
    let target = RemoteState::for_status(status);
    (target != current).then_some(target)
}
