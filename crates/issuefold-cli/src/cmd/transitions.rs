//! `ifold transitions`: print the status transition table.

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use clap::Args;
use issuefold_core::Status;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct TransitionsArgs {
    /// Only show edges out of this status.
    #[arg(long)]
    pub from: Option<Status>,
}

/// One row of the table as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct TransitionRow {
    pub from: Status,
    /// `false` for statuses the table has no entry for.
    pub key: bool,
    pub to: Vec<Status>,
}

fn rows(from: Option<Status>) -> Vec<TransitionRow> {
    let statuses: Vec<Status> = from.map_or_else(|| Status::ALL.to_vec(), |s| vec![s]);
    statuses
        .into_iter()
        .map(|status| TransitionRow {
            from: status,
            key: status.table_entry().is_some(),
            to: status.allowed_targets().to_vec(),
        })
        .collect()
}

fn targets(row: &TransitionRow) -> String {
    if !row.key {
        return "(not a table key)".to_string();
    }
    if row.to.is_empty() {
        return "(none)".to_string();
    }
    row.to
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Execute `ifold transitions`.
///
/// # Errors
///
/// Returns an error if output rendering fails.
pub fn run_transitions(args: &TransitionsArgs, output: OutputMode) -> anyhow::Result<()> {
    let table = rows(args.from);
    render_mode(
        output,
        &table,
        |table, w| {
            for row in table {
                writeln!(w, "{} -> {}", row.from, targets(row))?;
            }
            Ok(())
        },
        |table, w| {
            pretty_section(w, "Transitions")?;
            for row in table {
                pretty_kv(w, row.from.as_str(), targets(row))?;
            }
            Ok(())
        },
    )
}
