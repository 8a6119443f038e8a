use std::fmt;

use crate::apply::ApplyError;
use crate::event::codec::CodecError;
use crate::metadata::MetadataError;
use crate::replay::ReplayError;

/// Machine-readable error codes for callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    PayloadDecodeFailed,
    UnknownAction,
    IssueNotCreated,
    DuplicateCreate,
    EventRecordInvalid,
    MetadataBlockInvalid,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::PayloadDecodeFailed => "E2001",
            Self::UnknownAction => "E2002",
            Self::IssueNotCreated => "E2003",
            Self::DuplicateCreate => "E2004",
            Self::EventRecordInvalid => "E3001",
            Self::MetadataBlockInvalid => "E3002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file could not be loaded",
            Self::PayloadDecodeFailed => "Event payload could not be decoded",
            Self::UnknownAction => "Unknown event action",
            Self::IssueNotCreated => "Event for an issue that was never created",
            Self::DuplicateCreate => "Issue created twice",
            Self::EventRecordInvalid => "Event record is not valid",
            Self::MetadataBlockInvalid => "Metadata block is not valid",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => {
                Some("Fix the TOML in .issuefold/config.toml or the user config file and retry.")
            }
            Self::PayloadDecodeFailed => {
                Some("Check the payload fields and their types on the reported event.")
            }
            Self::UnknownAction => Some(
                "Use one of: create, status_change, assign, close, update, delete, reopen, comment.",
            ),
            Self::IssueNotCreated => {
                Some("Make sure the create event is included and sorted before later events.")
            }
            Self::DuplicateCreate => Some("Remove or re-target the second create event."),
            Self::EventRecordInvalid => Some("Re-emit the event comment with a valid JSON body."),
            Self::MetadataBlockInvalid => {
                Some("Delete the metadata block from the issue body; it is regenerated.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl ApplyError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownAction(_) => ErrorCode::UnknownAction,
            Self::Payload(_) => ErrorCode::PayloadDecodeFailed,
            Self::MissingIssue { .. } => ErrorCode::IssueNotCreated,
            Self::DuplicateCreate { .. } => ErrorCode::DuplicateCreate,
        }
    }
}

impl ReplayError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateCreate { .. } => ErrorCode::DuplicateCreate,
            Self::Apply { source, .. } => source.code(),
        }
    }
}

impl CodecError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::EventRecordInvalid
    }
}

impl MetadataError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::MetadataBlockInvalid
    }
}
