use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ParseEnumError;
use super::status::Status;

/// The five kinds of issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Task,
    Bug,
    Feature,
    Epic,
    Chore,
}

impl Default for IssueType {
    fn default() -> Self {
        Self::Task
    }
}

impl IssueType {
    pub const ALL: [Self; 5] = [Self::Task, Self::Bug, Self::Feature, Self::Epic, Self::Chore];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Epic => "epic",
            Self::Chore => "chore",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(Self::Task),
            "bug" => Ok(Self::Bug),
            "feature" => Ok(Self::Feature),
            "epic" => Ok(Self::Epic),
            "chore" => Ok(Self::Chore),
            _ => Err(ParseEnumError {
                expected: "issue type",
                got: s.to_string(),
            }),
        }
    }
}

/// A comment recorded on a snapshot by the comment side-channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub author: String,
    /// RFC 3339 UTC, second precision, `Z` suffix.
    pub timestamp: String,
}

impl Comment {
    #[must_use]
    pub fn new(text: impl Into<String>, author: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            timestamp: format_timestamp(at),
        }
    }
}

/// The derived state of one issue, produced by folding its events.
///
/// Nullable fields (`priority`, `closed_at`) serialize as `null` rather than
/// being skipped, so the null/empty distinction survives a JSON round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    pub id: String,
    pub repo_id: String,
    pub title: String,
    pub description: String,
    pub priority: Option<i64>,
    pub issue_type: IssueType,
    pub owner: String,
    pub labels: Vec<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl IssueSnapshot {
    /// A blank `open` snapshot born at `created_at`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        repo_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            repo_id: repo_id.into(),
            title: String::new(),
            description: String::new(),
            priority: None,
            issue_type: IssueType::default(),
            owner: String::new(),
            labels: Vec::new(),
            status: Status::Open,
            created_at,
            updated_at: created_at,
            closed_at: None,
            comments: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Bump `updated_at` to the event time.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Collapse duplicate labels, keeping the first occurrence of each.
#[must_use]
pub fn normalize_labels(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

/// Format a timestamp the way comment records store it.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
