//! Comment-body codec: store an [`Event`] inside a tracker comment.
//!
//! ````text
//! <!-- issuefold:event v1 -->
//! ```json
//! {"id":"...","sequence":1,...}
//! ```
//! ````
//!
//! The marker line must be the first non-blank line. Bodies without it are
//! ordinary human comments and decode to `Ok(None)`. The code fence is
//! written so the record renders readably on the tracker; it is optional on
//! input.

use super::Event;

const MARKER_PREFIX: &str = "<!-- issuefold:event v";
const MARKER_SUFFIX: &str = " -->";

/// Highest record version this build understands.
pub const CODEC_VERSION: u32 = 1;

/// Errors from decoding or encoding an event comment.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The marker carries a version this build does not understand.
    #[error("unsupported event record version {found} (max {max})", max = CODEC_VERSION)]
    UnsupportedVersion { found: u32 },

    /// The marker line is present but malformed.
    #[error("malformed event marker: {line}")]
    BadMarker { line: String },

    /// The marker is present but the body is not a valid event.
    #[error("invalid event record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whether `body` starts with an event marker.
#[must_use]
pub fn is_event_comment(body: &str) -> bool {
    first_line(body).is_some_and(|line| line.starts_with(MARKER_PREFIX))
}

/// Render an event as a comment body.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if the event fails to serialize.
pub fn encode_comment(event: &Event) -> Result<String, CodecError> {
    let json = serde_json::to_string_pretty(event)?;
    Ok(format!(
        "{MARKER_PREFIX}{CODEC_VERSION}{MARKER_SUFFIX}\n```json\n{json}\n```\n"
    ))
}

/// Parse a comment body back into an event.
///
/// Returns `Ok(None)` for comments that are not event records.
///
/// # Errors
///
/// Returns a [`CodecError`] when the marker is present but the version is
/// unsupported, the marker is malformed, or the JSON does not decode.
pub fn decode_comment(body: &str) -> Result<Option<Event>, CodecError> {
    let Some(marker) = first_line(body) else {
        return Ok(None);
    };
    let Some(rest) = marker.strip_prefix(MARKER_PREFIX) else {
        return Ok(None);
    };

    let version: u32 = rest
        .strip_suffix(MARKER_SUFFIX)
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| CodecError::BadMarker {
            line: marker.to_string(),
        })?;
    if version == 0 || version > CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion { found: version });
    }

    let after_marker = body
        .trim_start()
        .split_once('\n')
        .map_or("", |(_, tail)| tail);
    let json = strip_fence(after_marker);
    Ok(Some(serde_json::from_str(json)?))
}

fn first_line(body: &str) -> Option<&str> {
    body.trim_start().lines().next().map(str::trim_end)
}

fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let inner = inner.split_once('\n').map_or("", |(_, tail)| tail);
    inner.trim_end().strip_suffix("```").unwrap_or(inner).trim()
}
