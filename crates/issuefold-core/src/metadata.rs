//! Machine metadata block embedded in an issue's free-text body.
//!
//! The block is a single HTML comment, invisible when the tracker renders
//! markdown:
//!
//! ```text
//! <!-- issuefold:meta {"status":"open","priority":2,"issue_type":"bug","owner":"","labels":[]} -->
//! ```
//!
//! Only the block is ever rewritten. Human-authored text before and after it
//! is preserved byte for byte by [`splice`].

use serde::{Deserialize, Serialize};

use crate::model::issue::{IssueSnapshot, IssueType};
use crate::model::status::Status;

const OPEN: &str = "<!-- issuefold:meta ";
const CLOSE: &str = " -->";

/// The snapshot fields mirrored into the issue body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueMetadata {
    pub status: Status,
    pub priority: Option<i64>,
    pub issue_type: IssueType,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl IssueMetadata {
    #[must_use]
    pub fn from_snapshot(snapshot: &IssueSnapshot) -> Self {
        Self {
            status: snapshot.status,
            priority: snapshot.priority,
            issue_type: snapshot.issue_type,
            owner: snapshot.owner.clone(),
            labels: snapshot.labels.clone(),
        }
    }
}

/// Errors from reading a metadata block.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("metadata block is not terminated")]
    Unterminated,

    #[error("metadata block is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render the block as a single line.
///
/// # Panics
///
/// Never in practice: [`IssueMetadata`] holds only strings, integers and
/// enums, which always serialize.
#[must_use]
pub fn render_block(meta: &IssueMetadata) -> String {
    let json = serde_json::to_string(meta).expect("metadata holds only strings and integers");
    // "-->" can only occur inside a JSON string; escape it so it cannot end
    // the HTML comment early.
    let json = json.replace("-->", "--\\u003e");
    format!("{OPEN}{json}{CLOSE}")
}

/// Byte range of the block in `body`, including its delimiters.
fn locate(body: &str) -> Option<Result<(usize, usize), MetadataError>> {
    let start = body.find(OPEN)?;
    let json_start = start + OPEN.len();
    Some(match body[json_start..].find(CLOSE) {
        Some(offset) => Ok((start, json_start + offset + CLOSE.len())),
        None => Err(MetadataError::Unterminated),
    })
}

/// Read the block from `body`, if there is one.
///
/// # Errors
///
/// Returns a [`MetadataError`] if a block is present but malformed.
pub fn extract(body: &str) -> Result<Option<IssueMetadata>, MetadataError> {
    let Some(range) = locate(body) else {
        return Ok(None);
    };
    let (start, end) = range?;
    let json = &body[start + OPEN.len()..end - CLOSE.len()];
    Ok(Some(serde_json::from_str(json)?))
}

/// Remove the block, returning only the human-authored text.
///
/// A malformed block is left in place.
#[must_use]
pub fn strip(body: &str) -> String {
    match locate(body) {
        Some(Ok((start, end))) => {
            let before = body[..start].trim_end();
            let after = body[end..].trim_start_matches(['\r', '\n']);
            match (before.is_empty(), after.is_empty()) {
                (true, _) => after.to_string(),
                (false, true) => before.to_string(),
                (false, false) => format!("{before}\n\n{after}"),
            }
        }
        _ => body.to_string(),
    }
}

/// Write `meta` into `body`.
///
/// An existing well-formed block is replaced in place. Otherwise the block
/// is appended after a blank line.
#[must_use]
pub fn splice(body: &str, meta: &IssueMetadata) -> String {
    let block = render_block(meta);
    match locate(body) {
        Some(Ok((start, end))) => format!("{}{block}{}", &body[..start], &body[end..]),
        _ => {
            let human = body.trim_end();
            if human.is_empty() {
                block
            } else {
                format!("{human}\n\n{block}")
            }
        }
    }
}
