//! `ifold apply`: fold a single event onto an optional snapshot.

use crate::load::load_event;
use crate::output::{CliError, OutputMode, pretty_kv, render_error, render_mode};
use anyhow::Context;
use clap::Args;
use issuefold_core::{Event, IssueSnapshot};
use issuefold_core::apply::{Outcome, ReplayOptions, apply_detailed};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Event to apply: a JSON object, or an event comment body.
    #[arg(long, value_name = "FILE")]
    pub event: PathBuf,

    /// Existing snapshot (JSON). Omit for a create event.
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
}

/// Single-apply result as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct ApplyReport {
    /// `applied` or `skipped`.
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub commented: bool,
    pub snapshot: IssueSnapshot,
}

/// Execute `ifold apply`.
///
/// # Errors
///
/// Returns an error if an input file cannot be read, the event cannot be
/// applied, or output rendering fails.
pub fn run_apply(
    args: &ApplyArgs,
    options: ReplayOptions,
    output: OutputMode,
) -> anyhow::Result<()> {
    let event = load_event(&args.event)?;
    let existing = match &args.snapshot {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let snapshot: IssueSnapshot = serde_json::from_str(&content)
                .with_context(|| format!("{}: invalid snapshot", path.display()))?;
            if let Err(err) = check_target(&snapshot, &event) {
                render_error(output, &err)?;
                anyhow::bail!("{}", err.message);
            }
            Some(snapshot)
        }
        None => None,
    };

    let applied = match apply_detailed(existing, &event, options) {
        Ok(applied) => applied,
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(err.code(), format!("event {}: {err}", event.id)),
            )?;
            return Err(err.into());
        }
    };

    let report = ApplyReport {
        outcome: match applied.outcome {
            Outcome::Applied => "applied",
            Outcome::Skipped(_) => "skipped",
        },
        reason: match applied.outcome {
            Outcome::Applied => None,
            Outcome::Skipped(reason) => Some(reason.to_string()),
        },
        commented: applied.commented,
        snapshot: applied.snapshot,
    };

    render_mode(output, &report, render_apply_text, render_apply_human)
}

/// The snapshot must belong to the issue the event targets.
fn check_target(snapshot: &IssueSnapshot, event: &Event) -> Result<(), CliError> {
    if snapshot.id == event.issue_id {
        return Ok(());
    }
    Err(CliError::with_details(
        format!(
            "event {} targets issue '{}' but the snapshot is issue '{}'",
            event.id, event.issue_id, snapshot.id
        ),
        "pass the snapshot of the issue named by the event's issue_id",
        "issue_mismatch",
    ))
}

fn render_apply_text(report: &ApplyReport, w: &mut dyn Write) -> std::io::Result<()> {
    match &report.reason {
        Some(reason) => writeln!(w, "{}  {}  {reason}", report.snapshot.id, report.outcome)?,
        None => writeln!(w, "{}  {}", report.snapshot.id, report.outcome)?,
    }
    writeln!(
        w,
        "{}",
        serde_json::to_string(&report.snapshot).map_err(std::io::Error::other)?
    )
}

fn render_apply_human(report: &ApplyReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_kv(w, "issue", &report.snapshot.id)?;
    pretty_kv(w, "outcome", report.outcome)?;
    if let Some(reason) = &report.reason {
        pretty_kv(w, "reason", reason)?;
    }
    if report.commented {
        pretty_kv(w, "comment", "recorded")?;
    }
    pretty_kv(w, "status", report.snapshot.status.as_str())?;
    writeln!(w)?;
    writeln!(
        w,
        "{}",
        serde_json::to_string_pretty(&report.snapshot).map_err(std::io::Error::other)?
    )
}
