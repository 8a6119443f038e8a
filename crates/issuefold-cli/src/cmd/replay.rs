//! `ifold replay`: fold event logs into issue snapshots.

use super::{EventFiles, run_replayer};
use crate::output::{
    OutputMode, local_time, or_dash, pretty_kv, pretty_rule, pretty_section, render_mode,
};
use clap::Args;
use issuefold_core::IssueSnapshot;
use issuefold_core::apply::ReplayOptions;
use issuefold_core::replay::ReplayStats;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub source: EventFiles,

    /// Only replay and show this issue.
    #[arg(long)]
    pub issue: Option<String>,
}

/// Replay result as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub issues: Vec<IssueSnapshot>,
    pub stats: ReplayStats,
}

/// Execute `ifold replay`.
///
/// # Errors
///
/// Returns an error if loading fails, replay hits a structural error, or
/// output rendering fails.
pub fn run_replay(
    args: &ReplayArgs,
    options: ReplayOptions,
    output: OutputMode,
) -> anyhow::Result<()> {
    let mut events = args.source.load()?;
    if let Some(issue_id) = &args.issue {
        events.retain(|event| &event.issue_id == issue_id);
    }

    let replayer = run_replayer(&events, options, output)?;
    let stats = replayer.stats();
    let report = ReplayReport {
        issues: replayer.into_snapshots().into_values().collect(),
        stats,
    };

    render_mode(output, &report, render_replay_text, render_replay_human)
}

const TEXT_HEADERS: [&str; 6] = ["ID", "STATUS", "TYPE", "PRIORITY", "OWNER", "TITLE"];

fn render_replay_text(report: &ReplayReport, w: &mut dyn Write) -> std::io::Result<()> {
    if report.issues.is_empty() {
        return Ok(());
    }
    writeln!(w, "{}", TEXT_HEADERS.join("  "))?;
    for issue in &report.issues {
        let priority = issue
            .priority
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        writeln!(
            w,
            "{}  {}  {}  {}  {}  {}",
            issue.id,
            issue.status,
            issue.issue_type,
            priority,
            or_dash(&issue.owner),
            or_dash(&issue.title)
        )?;
    }
    Ok(())
}

fn render_replay_human(report: &ReplayReport, w: &mut dyn Write) -> std::io::Result<()> {
    for (i, issue) in report.issues.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        render_issue_human(issue, w)?;
    }
    if !report.issues.is_empty() {
        writeln!(w)?;
    }
    let stats = report.stats;
    writeln!(
        w,
        "{} issue(s) from {} event(s): {} applied, {} skipped, {} comment(s)",
        report.issues.len(),
        stats.events,
        stats.applied,
        stats.skipped,
        stats.comments
    )
}

fn render_issue_human(issue: &IssueSnapshot, w: &mut dyn Write) -> std::io::Result<()> {
    if issue.repo_id.is_empty() {
        pretty_section(w, &format!("Issue {}", issue.id))?;
    } else {
        pretty_section(w, &format!("Issue {} ({})", issue.id, issue.repo_id))?;
    }
    writeln!(w, "{}", or_dash(&issue.title))?;
    pretty_rule(w)?;
    pretty_kv(w, "status", issue.status.as_str())?;
    pretty_kv(w, "type", issue.issue_type.as_str())?;
    if let Some(priority) = issue.priority {
        pretty_kv(w, "priority", priority.to_string())?;
    }
    if !issue.owner.is_empty() {
        pretty_kv(w, "owner", &issue.owner)?;
    }
    if !issue.labels.is_empty() {
        pretty_kv(w, "labels", issue.labels.join(", "))?;
    }
    pretty_kv(w, "created", local_time(issue.created_at))?;
    pretty_kv(w, "updated", local_time(issue.updated_at))?;
    if let Some(closed_at) = issue.closed_at {
        pretty_kv(w, "closed", local_time(closed_at))?;
    }

    if !issue.description.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Description")?;
        for line in issue.description.lines() {
            writeln!(w, "{line}")?;
        }
    }

    if !issue.comments.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Comments ({})", issue.comments.len()))?;
        for comment in &issue.comments {
            writeln!(
                w,
                "[{}] {}: {}",
                comment.timestamp,
                or_dash(&comment.author),
                comment.text
            )?;
        }
    }
    Ok(())
}
