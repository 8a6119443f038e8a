//! Batch replay: fold an ordered event list into one snapshot per issue.
//!
//! [`replay`] is a loop over [`Replayer::push`], and `push` is the same
//! in-place step the single-event applier uses. Replaying `[e1..en]` in one
//! batch therefore yields, per issue, exactly what folding [`apply`] over
//! the same events would.
//!
//! Events are processed in the order given. Sorting by `sequence` is the
//! caller's job; out-of-order input is not detected here.
//!
//! [`apply`]: crate::apply::apply

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::apply::{ApplyError, Outcome, ReplayOptions, step};
use crate::event::{Action, Event};
use crate::model::issue::IssueSnapshot;

/// Errors that stop a replay. Each one names the offending event.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// A create event for an issue that already has a snapshot.
    #[error("duplicate create for issue {issue_id} (event {event_id}, sequence {sequence})")]
    DuplicateCreate {
        issue_id: String,
        event_id: String,
        sequence: i64,
    },

    /// The applier rejected an event.
    #[error("event {event_id} (sequence {sequence}, {action} on issue {issue_id}): {source}")]
    Apply {
        event_id: String,
        sequence: i64,
        action: String,
        issue_id: String,
        #[source]
        source: ApplyError,
    },
}

impl ReplayError {
    /// Id of the event that stopped replay.
    #[must_use]
    pub fn event_id(&self) -> &str {
        match self {
            Self::DuplicateCreate { event_id, .. } | Self::Apply { event_id, .. } => event_id,
        }
    }

    /// Issue the offending event targeted.
    #[must_use]
    pub fn issue_id(&self) -> &str {
        match self {
            Self::DuplicateCreate { issue_id, .. } | Self::Apply { issue_id, .. } => issue_id,
        }
    }

    /// Sequence key of the offending event.
    #[must_use]
    pub const fn sequence(&self) -> i64 {
        match self {
            Self::DuplicateCreate { sequence, .. } | Self::Apply { sequence, .. } => *sequence,
        }
    }
}

/// Counters collected while replaying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    /// Events accepted (applied or skipped).
    pub events: usize,
    /// Events that mutated a snapshot.
    pub applied: usize,
    /// Events that were policy no-ops.
    pub skipped: usize,
    /// Comments appended by the side-channel.
    pub comments: usize,
}

/// Incremental replayer holding one working snapshot per issue.
///
/// A failed [`push`](Self::push) leaves every snapshot as it was, so a
/// caller may log the error and keep feeding events if it chooses to.
#[derive(Debug, Clone, Default)]
pub struct Replayer {
    options: ReplayOptions,
    snapshots: BTreeMap<String, IssueSnapshot>,
    stats: ReplayStats,
}

impl Replayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: ReplayOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn options(&self) -> ReplayOptions {
        self.options
    }

    /// Fold one event into the working set.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::DuplicateCreate`] for a second create of the
    /// same issue, and [`ReplayError::Apply`] for any applier error.
    pub fn push(&mut self, event: &Event) -> Result<Outcome, ReplayError> {
        if matches!(event.action(), Ok(Action::Create)) && self.snapshots.contains_key(&event.issue_id)
        {
            return Err(ReplayError::DuplicateCreate {
                issue_id: event.issue_id.clone(),
                event_id: event.id.clone(),
                sequence: event.sequence,
            });
        }

        let mut slot = self.snapshots.remove(&event.issue_id);
        let result = step(&mut slot, event, self.options);
        if let Some(snapshot) = slot {
            self.snapshots.insert(event.issue_id.clone(), snapshot);
        }

        let effect = result.map_err(|source| ReplayError::Apply {
            event_id: event.id.clone(),
            sequence: event.sequence,
            action: event.action.clone(),
            issue_id: event.issue_id.clone(),
            source,
        })?;

        self.stats.events += 1;
        if effect.outcome.is_applied() {
            self.stats.applied += 1;
        } else {
            self.stats.skipped += 1;
        }
        if effect.commented {
            self.stats.comments += 1;
        }
        Ok(effect.outcome)
    }

    /// Fold every event in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// See [`push`](Self::push).
    pub fn extend<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a Event>,
    ) -> Result<(), ReplayError> {
        for event in events {
            self.push(event)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, issue_id: &str) -> Option<&IssueSnapshot> {
        self.snapshots.get(issue_id)
    }

    #[must_use]
    pub const fn snapshots(&self) -> &BTreeMap<String, IssueSnapshot> {
        &self.snapshots
    }

    #[must_use]
    pub fn into_snapshots(self) -> BTreeMap<String, IssueSnapshot> {
        self.snapshots
    }

    #[must_use]
    pub const fn stats(&self) -> ReplayStats {
        self.stats
    }

    /// Number of issues with a snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Replay `events` with default options.
///
/// # Errors
///
/// See [`Replayer::push`].
pub fn replay(events: &[Event]) -> Result<BTreeMap<String, IssueSnapshot>, ReplayError> {
    replay_with(events, ReplayOptions::default())
}

/// Replay `events` with explicit options.
///
/// # Errors
///
/// See [`Replayer::push`].
pub fn replay_with(
    events: &[Event],
    options: ReplayOptions,
) -> Result<BTreeMap<String, IssueSnapshot>, ReplayError> {
    let mut replayer = Replayer::with_options(options);
    if let Err(err) = replayer.extend(events) {
        debug!(
            event_id = err.event_id(),
            issue_id = err.issue_id(),
            code = %err.code(),
            "replay stopped"
        );
        return Err(err);
    }

    let stats = replayer.stats();
    info!(
        events = stats.events,
        issues = replayer.len(),
        applied = stats.applied,
        skipped = stats.skipped,
        "replay complete"
    );
    Ok(replayer.into_snapshots())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
