//! Event loading: JSON-lines logs or exported tracker comments.
//!
//! Events from every input file are concatenated and then stable-sorted by
//! `sequence`, so ties keep their input order.

use anyhow::{Context, Result};
use issuefold_core::Event;
use issuefold_core::event::codec::{decode_comment, is_event_comment};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How an input file is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// One JSON event per line. Blank lines are ignored.
    Lines,
    /// A JSON array of comments, each a bare body string or an object with
    /// a `body` field. Comments without an event marker are skipped.
    Comments,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommentRecord {
    Body(String),
    Object { body: String },
}

impl CommentRecord {
    fn body(&self) -> &str {
        match self {
            Self::Body(body) | Self::Object { body } => body,
        }
    }
}

/// Load, concatenate and order events from `paths`.
///
/// # Errors
///
/// Fails if a file cannot be read or holds a malformed event record.
pub fn load_events(paths: &[PathBuf], source: Source) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for path in paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let loaded = match source {
            Source::Lines => parse_lines(&content, path)?,
            Source::Comments => parse_comments(&content, path)?,
        };
        debug!(path = %path.display(), events = loaded.len(), "loaded events");
        events.extend(loaded);
    }
    order_events(&mut events);
    Ok(events)
}

/// Read a single event from a file holding either a JSON object or an
/// event comment body.
///
/// # Errors
///
/// Fails if the file cannot be read or does not hold an event.
pub fn load_event(path: &Path) -> Result<Event> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if is_event_comment(&content) {
        decode_comment(&content)
            .with_context(|| format!("{}: invalid event comment", path.display()))?
            .with_context(|| format!("{}: no event record", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("{}: invalid event record", path.display()))
    }
}

fn parse_lines(content: &str, path: &Path) -> Result<Vec<Event>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid event record", path.display(), idx + 1))
        })
        .collect()
}

fn parse_comments(content: &str, path: &Path) -> Result<Vec<Event>> {
    let records: Vec<CommentRecord> = serde_json::from_str(content)
        .with_context(|| format!("{}: expected a JSON array of comments", path.display()))?;

    let mut events = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let decoded = decode_comment(record.body())
            .with_context(|| format!("{}: comment #{}: invalid event comment", path.display(), idx + 1))?;
        match decoded {
            Some(event) => events.push(event),
            None => debug!(path = %path.display(), comment = idx + 1, "skipping non-event comment"),
        }
    }
    Ok(events)
}

/// Stable sort by `sequence`, warning when the input was not already ordered.
pub fn order_events(events: &mut [Event]) {
    if let Some(pair) = events.windows(2).find(|w| w[1].sequence < w[0].sequence) {
        warn!(
            previous = pair[0].sequence,
            sequence = pair[1].sequence,
            event_id = %pair[1].id,
            "events are not in sequence order; sorting"
        );
    }
    events.sort_by_key(|event| event.sequence);
}
