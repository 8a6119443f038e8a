//! Issue status and the transition table.
//!
//! The table is a compile-time constant. Edges (directed, no self-loops):
//!
//! - `open -> in_progress | closed | deleted`
//! - `in_progress -> open | closed | deleted`
//! - `closed -> open | deleted`
//! - `deleted -> (none)`
//!
//! `blocked` and `in_review` are not table keys. They are only reachable
//! through a `status_change` event whose `from_status` matches.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ParseEnumError;

/// The six issue statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    InProgress,
    Blocked,
    InReview,
    Closed,
    Deleted,
}

impl Default for Status {
    fn default() -> Self {
        Self::Open
    }
}

impl Status {
    /// All statuses in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Open,
        Self::InProgress,
        Self::Blocked,
        Self::InReview,
        Self::Closed,
        Self::Deleted,
    ];

    /// Canonical wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::InReview => "in_review",
            Self::Closed => "closed",
            Self::Deleted => "deleted",
        }
    }

    /// Outgoing edges of the transition table.
    ///
    /// Returns `None` when `self` is not a key of the table.
    #[must_use]
    pub const fn table_entry(self) -> Option<&'static [Self]> {
        match self {
            Self::Open => Some(&[Self::InProgress, Self::Closed, Self::Deleted]),
            Self::InProgress => Some(&[Self::Open, Self::Closed, Self::Deleted]),
            Self::Closed => Some(&[Self::Open, Self::Deleted]),
            Self::Deleted => Some(&[]),
            Self::Blocked | Self::InReview => None,
        }
    }

    /// Statuses reachable from `self` in one step. Empty for non-keys.
    #[must_use]
    pub const fn allowed_targets(self) -> &'static [Self] {
        match self.table_entry() {
            Some(targets) => targets,
            None => &[],
        }
    }

    /// Whether the table has an edge `self -> target`.
    #[must_use]
    pub fn valid_transition(self, target: Self) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Terminal statuses block every further mutation of the snapshot.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// String form of [`Status::valid_transition`].
///
/// Unknown status strings on either side yield `false`.
#[must_use]
pub fn valid_transition_str(from: &str, to: &str) -> bool {
    match (from.parse::<Status>(), to.parse::<Status>()) {
        (Ok(from), Ok(to)) => from.valid_transition(to),
        _ => false,
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "in_review" => Ok(Self::InReview),
            "closed" => Ok(Self::Closed),
            "deleted" => Ok(Self::Deleted),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_edges_match_lifecycle() {
        use Status::*;
        let allowed = [
            (Open, InProgress),
            (Open, Closed),
            (Open, Deleted),
            (InProgress, Open),
            (InProgress, Closed),
            (InProgress, Deleted),
            (Closed, Open),
            (Closed, Deleted),
        ];

        for from in Status::ALL {
            for to in Status::ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.valid_transition(to),
                    expected,
                    "{from} -> {to} should be {expected}"
                );
            }
        }
    }

    #[test]
    fn no_self_loops() {
        for status in Status::ALL {
            assert!(!status.valid_transition(status), "{status} self-loop");
        }
    }

    #[test]
    fn deleted_is_the_only_terminal_status() {
        for status in Status::ALL {
            assert_eq!(status.is_terminal(), status == Status::Deleted);
        }
        assert!(Status::Deleted.allowed_targets().is_empty());
    }

    #[test]
    fn blocked_and_in_review_are_not_table_keys() {
        assert_eq!(Status::Blocked.table_entry(), None);
        assert_eq!(Status::InReview.table_entry(), None);
        assert!(!Status::Blocked.valid_transition(Status::Open));
        assert!(!Status::InReview.valid_transition(Status::Closed));
    }

    #[test]
    fn string_form_rejects_garbage() {
        assert!(valid_transition_str("open", "closed"));
        assert!(!valid_transition_str("opn", "closed"));
        assert!(!valid_transition_str("open", "done"));
        assert!(!valid_transition_str("", ""));
    }

    #[test]
    fn display_fromstr_roundtrip() {
        for status in Status::ALL {
            let parsed: Status = status.to_string().parse().expect("should parse");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Status::InProgress).expect("serialize");
        assert_eq!(json, "\"in_progress\"");
        let back: Status = serde_json::from_str("\"in_review\"").expect("deserialize");
        assert_eq!(back, Status::InReview);
    }

    #[test]
    fn fromstr_error_names_the_input() {
        let err = "Done".parse::<Status>().unwrap_err();
        assert_eq!(err.got, "Done");
        assert_eq!(err.to_string(), "invalid status: 'Done'");
    }
}
