//! `ifold sync-state`: decide whether the tracker's open/closed flag must flip.

use super::{EventFiles, replay_issue};
use crate::output::{OutputMode, pretty_kv, render_mode};
use clap::Args;
use issuefold_core::Status;
use issuefold_core::apply::ReplayOptions;
use issuefold_core::sync::{RemoteState, reconcile};
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct SyncStateArgs {
    #[command(flatten)]
    pub source: EventFiles,

    /// Issue to check.
    #[arg(long)]
    pub issue: String,

    /// The tracker's current state: open or closed.
    #[arg(long)]
    pub remote: RemoteState,
}

/// Sync decision as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub issue_id: String,
    pub status: Status,
    pub remote: RemoteState,
    /// State to set on the tracker, or `null` when it already matches.
    pub target: Option<RemoteState>,
    /// `close`, `reopen` or `none`.
    pub action: &'static str,
}

/// Execute `ifold sync-state`.
///
/// # Errors
///
/// Returns an error if replay fails or output rendering fails.
pub fn run_sync_state(
    args: &SyncStateArgs,
    options: ReplayOptions,
    output: OutputMode,
) -> anyhow::Result<()> {
    let snapshot = replay_issue(&args.source, &args.issue, options, output)?;
    let target = reconcile(args.remote, snapshot.status);
    let report = SyncReport {
        issue_id: snapshot.id,
        status: snapshot.status,
        remote: args.remote,
        target,
        action: action_name(target),
    };

    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "{}", r.action),
        render_sync_human,
    )
}

const fn action_name(target: Option<RemoteState>) -> &'static str {
    match target {
        Some(RemoteState::Closed) => "close",
        Some(RemoteState::Open) => "reopen",
        None => "none",
    }
}

fn render_sync_human(report: &SyncReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(w, "issue", &report.issue_id)?;
    pretty_kv(w, "status", report.status.as_str())?;
    pretty_kv(w, "remote", report.remote.as_str())?;
    match report.target {
        Some(target) => pretty_kv(w, "action", format!("{} (set {target})", report.action)),
        None => pretty_kv(w, "action", "none (in sync)"),
    }
}
