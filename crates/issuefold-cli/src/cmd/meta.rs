//! `ifold meta`: render an issue's metadata block, or splice it into a body.

use super::{EventFiles, replay_issue};
use crate::output::{OutputMode, pretty_kv, render_mode};
use anyhow::Context;
use clap::Args;
use issuefold_core::apply::ReplayOptions;
use issuefold_core::metadata::{self, IssueMetadata};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct MetaArgs {
    #[command(flatten)]
    pub source: EventFiles,

    /// Issue to render.
    #[arg(long)]
    pub issue: String,

    /// Issue body to splice the block into.
    #[arg(long, value_name = "FILE")]
    pub body: Option<PathBuf>,

    /// Rewrite the body file in place instead of printing it.
    #[arg(long, requires = "body")]
    pub write: bool,
}

/// Metadata result as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct MetaReport {
    pub issue_id: String,
    pub metadata: IssueMetadata,
    pub block: String,
    /// The spliced body, when `--body` was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Whether the body's existing block differed from the new one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<PathBuf>,
}

/// Execute `ifold meta`.
///
/// # Errors
///
/// Returns an error if replay fails, the body file cannot be read or
/// written, or output rendering fails.
pub fn run_meta(args: &MetaArgs, options: ReplayOptions, output: OutputMode) -> anyhow::Result<()> {
    let snapshot = replay_issue(&args.source, &args.issue, options, output)?;
    let meta = IssueMetadata::from_snapshot(&snapshot);
    let block = metadata::render_block(&meta);

    let mut report = MetaReport {
        issue_id: snapshot.id,
        metadata: meta,
        block,
        body: None,
        changed: None,
        written: None,
    };

    if let Some(path) = &args.body {
        let original = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let existing = match metadata::extract(&original) {
            Ok(existing) => existing,
            Err(err) => {
                warn!(path = %path.display(), code = %err.code(), error = %err, "replacing unreadable metadata block");
                None
            }
        };
        let spliced = metadata::splice(&original, &report.metadata);
        report.changed = Some(existing.as_ref() != Some(&report.metadata));

        if args.write {
            std::fs::write(path, &spliced)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), changed = report.changed, "metadata block written");
            report.written = Some(path.clone());
        }
        report.body = Some(spliced);
    }

    render_mode(output, &report, render_meta_text, render_meta_human)
}

fn render_meta_text(report: &MetaReport, w: &mut dyn Write) -> std::io::Result<()> {
    match (&report.written, &report.body) {
        (Some(path), _) => writeln!(w, "{}", path.display()),
        (None, Some(body)) => write!(w, "{body}"),
        (None, None) => writeln!(w, "{}", report.block),
    }
}

fn render_meta_human(report: &MetaReport, w: &mut dyn Write) -> std::io::Result<()> {
    if let Some(path) = &report.written {
        let verb = if report.changed == Some(false) {
            "unchanged"
        } else {
            "updated"
        };
        return pretty_kv(w, verb, path.display().to_string());
    }
    render_meta_text(report, w)
}
