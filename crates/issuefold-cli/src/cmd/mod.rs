pub mod apply;
pub mod completions;
pub mod meta;
pub mod replay;
pub mod sync_state;
pub mod transitions;

use crate::load::{self, Source};
use crate::output::{CliError, OutputMode, render_error};
use clap::Args;
use issuefold_core::apply::ReplayOptions;
use issuefold_core::replay::{ReplayError, Replayer};
use issuefold_core::{Event, IssueSnapshot};
use std::path::PathBuf;

/// Event inputs shared by every command that replays a log.
#[derive(Args, Debug)]
pub struct EventFiles {
    /// Event files: JSON lines, or comment exports with `--comments`.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Read files as JSON arrays of tracker comments.
    #[arg(long)]
    pub comments: bool,
}

impl EventFiles {
    pub fn load(&self) -> anyhow::Result<Vec<Event>> {
        let source = if self.comments {
            Source::Comments
        } else {
            Source::Lines
        };
        load::load_events(&self.files, source)
    }
}

/// Replay `events`, rendering any failure before handing it back.
pub fn run_replayer(
    events: &[Event],
    options: ReplayOptions,
    output: OutputMode,
) -> anyhow::Result<Replayer> {
    let mut replayer = Replayer::with_options(options);
    if let Err(err) = replayer.extend(events) {
        render_replay_error(output, &err)?;
        return Err(err.into());
    }
    Ok(replayer)
}

/// Replay only the events of `issue_id` and return its snapshot.
pub fn replay_issue(
    files: &EventFiles,
    issue_id: &str,
    options: ReplayOptions,
    output: OutputMode,
) -> anyhow::Result<IssueSnapshot> {
    let mut events = files.load()?;
    events.retain(|event| event.issue_id == issue_id);

    let replayer = run_replayer(&events, options, output)?;
    let Some(snapshot) = replayer.into_snapshots().remove(issue_id) else {
        render_error(
            output,
            &CliError::with_details(
                format!("issue '{issue_id}' has no events"),
                "check --issue against the issue_id field of the event records",
                "issue_not_found",
            ),
        )?;
        anyhow::bail!("issue '{issue_id}' has no events");
    };
    Ok(snapshot)
}

fn render_replay_error(output: OutputMode, err: &ReplayError) -> anyhow::Result<()> {
    let message = format!("event #{} ({}): {err}", err.sequence(), err.event_id());
    render_error(output, &CliError::from_code(err.code(), message))
}
