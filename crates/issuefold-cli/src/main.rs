#![forbid(unsafe_code)]

mod cmd;
mod load;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use issuefold_core::config;
use issuefold_core::error::ErrorCode;
use output::{CliError, OutputMode, render_error};
use std::env;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ifold: rebuild issue state from comment-backed event logs",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format (defaults to pretty on a TTY, text when piped).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Skip status changes the transition table does not list.
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// The output mode named on the command line, if any.
    fn format_flag(&self) -> Option<&'static str> {
        match (self.format, self.json) {
            (Some(mode), _) => Some(mode.as_str()),
            (None, true) => Some(OutputMode::Json.as_str()),
            (None, false) => None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Replay",
        about = "Replay event logs into snapshots",
        long_about = "Load events, order them by sequence, and fold them into one snapshot per issue.",
        after_help = "EXAMPLES:\n    # Replay a JSON-lines log\n    ifold replay events.jsonl\n\n    # Replay one issue from an exported comment thread\n    ifold replay comments.json --comments --issue 42\n\n    # Emit machine-readable output\n    ifold replay events.jsonl --format json"
    )]
    Replay(cmd::replay::ReplayArgs),

    #[command(
        next_help_heading = "Replay",
        about = "Apply one event to a snapshot",
        long_about = "Fold a single event onto an optional existing snapshot and report the outcome.",
        after_help = "EXAMPLES:\n    # Apply a create event\n    ifold apply --event create.json\n\n    # Apply onto an existing snapshot\n    ifold apply --event close.json --snapshot issue.json --format json"
    )]
    Apply(cmd::apply::ApplyArgs),

    #[command(
        next_help_heading = "Write-back",
        about = "Render an issue's metadata block",
        long_about = "Replay an issue and render the hidden metadata block for its body.",
        after_help = "EXAMPLES:\n    # Print the block\n    ifold meta events.jsonl --issue 42\n\n    # Splice it into a body file in place\n    ifold meta events.jsonl --issue 42 --body body.md --write"
    )]
    Meta(cmd::meta::MetaArgs),

    #[command(
        next_help_heading = "Write-back",
        about = "Decide the tracker's open/closed state",
        long_about = "Replay an issue and say whether the tracker's open/closed flag must change.",
        after_help = "EXAMPLES:\n    # Check an issue the tracker shows as open\n    ifold sync-state events.jsonl --issue 42 --remote open"
    )]
    SyncState(cmd::sync_state::SyncStateArgs),

    #[command(
        next_help_heading = "Reference",
        about = "Print the status transition table",
        after_help = "EXAMPLES:\n    # Whole table\n    ifold transitions\n\n    # Edges out of one status\n    ifold transitions --from closed"
    )]
    Transitions(cmd::transitions::TransitionsArgs),

    #[command(
        next_help_heading = "Reference",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    ifold completions bash\n\n    # Generate zsh completions\n    ifold completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("IFOLD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "issuefold=debug,info"
        } else {
            "issuefold=info,warn"
        })
    });

    let format = env::var("IFOLD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Logs go to stderr so stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let project_root = env::current_dir()?;
    let effective = match config::resolve_config(&project_root, cli.format_flag()) {
        Ok(effective) => effective,
        Err(err) => {
            let mode = cli
                .format_flag()
                .and_then(OutputMode::from_name)
                .unwrap_or(OutputMode::Text);
            render_error(
                mode,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };
    let output = OutputMode::from_name(&effective.resolved_output).unwrap_or(OutputMode::Text);

    let mut options = effective.project.replay.options();
    if cli.strict {
        options.enforce_transitions = true;
    }
    debug!(
        output = output.as_str(),
        enforce_transitions = options.enforce_transitions,
        "resolved configuration"
    );

    match &cli.command {
        Commands::Replay(args) => cmd::replay::run_replay(args, options, output),
        Commands::Apply(args) => cmd::apply::run_apply(args, options, output),
        Commands::Meta(args) => cmd::meta::run_meta(args, options, output),
        Commands::SyncState(args) => cmd::sync_state::run_sync_state(args, options, output),
        Commands::Transitions(args) => cmd::transitions::run_transitions(args, output),
        Commands::Completions(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["ifold", "transitions", "--format", "json"]);
        assert_eq!(cli.format, Some(OutputMode::Json));
        assert_eq!(cli.format_flag(), Some("json"));
    }

    #[test]
    fn hidden_json_flag_maps_to_json() {
        let cli = Cli::parse_from(["ifold", "--json", "transitions"]);
        assert_eq!(cli.format_flag(), Some("json"));
    }

    #[test]
    fn format_beats_json_flag() {
        let cli = Cli::parse_from(["ifold", "--json", "--format", "text", "transitions"]);
        assert_eq!(cli.format_flag(), Some("text"));
    }

    #[test]
    fn no_flag_defers_to_config() {
        let cli = Cli::parse_from(["ifold", "transitions"]);
        assert_eq!(cli.format_flag(), None);
        assert!(!cli.strict);
    }

    #[test]
    fn strict_flag_is_global() {
        let cli = Cli::parse_from(["ifold", "replay", "e.jsonl", "--strict"]);
        assert!(cli.strict);
    }

    #[test]
    fn replay_requires_a_file() {
        assert!(Cli::try_parse_from(["ifold", "replay"]).is_err());
    }

    #[test]
    fn write_requires_body() {
        assert!(Cli::try_parse_from(["ifold", "meta", "e.jsonl", "--issue", "1", "--write"]).is_err());
        assert!(
            Cli::try_parse_from([
                "ifold", "meta", "e.jsonl", "--issue", "1", "--body", "b.md", "--write"
            ])
            .is_ok()
        );
    }

    #[test]
    fn sync_state_parses_remote() {
        let cli = Cli::parse_from([
            "ifold", "sync-state", "e.jsonl", "--issue", "1", "--remote", "closed",
        ]);
        let Commands::SyncState(args) = cli.command else {
            panic!("expected sync-state");
        };
        assert_eq!(args.remote, issuefold_core::sync::RemoteState::Closed);
        assert!(Cli::try_parse_from(["ifold", "sync-state", "e.jsonl", "--issue", "1", "--remote", "merged"]).is_err());
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["ifold", "replay", "e.jsonl"],
            vec!["ifold", "replay", "c.json", "--comments", "--issue", "7"],
            vec!["ifold", "apply", "--event", "e.json"],
            vec!["ifold", "apply", "--event", "e.json", "--snapshot", "s.json"],
            vec!["ifold", "meta", "e.jsonl", "--issue", "7"],
            vec!["ifold", "sync-state", "e.jsonl", "--issue", "7", "--remote", "open"],
            vec!["ifold", "transitions", "--from", "in_progress"],
            vec!["ifold", "completions", "bash"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "Failed to parse: {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
