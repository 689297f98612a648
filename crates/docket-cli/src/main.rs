#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use docket_core::config;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "dk: document state tracking and IESG balloting",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Override actor identity (skips env resolution).
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn actor_flag(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    /// `--json`, then `DOCKET_FORMAT`, then the user config, then TTY
    /// detection.
    fn output_mode(&self, project_root: &std::path::Path) -> OutputMode {
        match config::resolve_config(project_root, self.json) {
            Ok(effective) => OutputMode::from_resolved(&effective.resolved_output),
            Err(err) => {
                debug!("config resolution failed: {err:#}");
                if self.json { OutputMode::Json } else { OutputMode::Pretty }
            }
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a docket project",
        long_about = "Create .docket/ with a starter config and an empty store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    dk init\n\n    # Rewrite the starter config\n    dk init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Documents",
        about = "File a new document",
        long_about = "File a draft, RFC, charter, conflict review or status change.",
        after_help = "EXAMPLES:\n    # File a WG draft headed for Proposed Standard\n    dk file draft-ietf-quic-foo --title \"QUIC Foo\" --group quic --group-kind wg --intended ps\n\n    # Start it in AD evaluation\n    dk file draft-ietf-quic-foo --title \"QUIC Foo\" --state draft-iesg=ad-eval --ad ad1"
    )]
    File(cmd::file::FileArgs),

    #[command(
        next_help_heading = "Documents",
        about = "Record a new revision",
        after_help = "EXAMPLES:\n    dk revise draft-ietf-quic-foo 01"
    )]
    Revise(cmd::edit::ReviseArgs),

    #[command(
        next_help_heading = "Documents",
        about = "Change document attributes",
        after_help = "EXAMPLES:\n    # Hand the document to another AD\n    dk edit draft-ietf-quic-foo --ad ad2\n\n    # Clear the shepherd\n    dk edit draft-ietf-quic-foo --shepherd \"\""
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Documents",
        about = "Add a comment to the history",
        after_help = "EXAMPLES:\n    dk comment draft-ietf-quic-foo \"Discussed with the chairs.\""
    )]
    Comment(cmd::edit::CommentArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one document",
        long_about = "Show the friendly status, every state dimension and the action holders.",
        after_help = "EXAMPLES:\n    dk show draft-ietf-quic-foo\n\n    # Emit machine-readable output\n    dk show draft-ietf-quic-foo --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "List documents",
        after_help = "EXAMPLES:\n    dk list"
    )]
    List(cmd::show::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show the event log",
        long_about = "Show a document's events, newest first.",
        after_help = "EXAMPLES:\n    dk log draft-ietf-quic-foo\n\n    # Last five events\n    dk log draft-ietf-quic-foo -n 5"
    )]
    Log(cmd::log::LogArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show stored snapshots or a past version",
        after_help = "EXAMPLES:\n    dk history draft-ietf-quic-foo\n\n    # The document as of an instant\n    dk history draft-ietf-quic-foo --at 2026-06-01T00:00:00Z\n\n    # The document while -01 was current\n    dk history draft-ietf-quic-foo --rev 01"
    )]
    History(cmd::log::HistoryArgs),

    #[command(
        next_help_heading = "State",
        about = "Move a document in one state dimension",
        after_help = "EXAMPLES:\n    # Start AD evaluation\n    dk state draft-ietf-quic-foo draft-iesg ad-eval\n\n    # Ask the authors for a revision\n    dk state draft-ietf-quic-foo draft-iesg --substate need-rev -m \"See review\""
    )]
    State(cmd::state::StateArgs),

    #[command(
        next_help_heading = "State",
        about = "Clear a non-IESG state dimension",
        after_help = "EXAMPLES:\n    dk unset-state draft-ietf-quic-foo draft-stream-ietf"
    )]
    UnsetState(cmd::state::UnsetStateArgs),

    #[command(
        next_help_heading = "State",
        about = "Revert a state change or ballot position",
        long_about = "Revert the given event. Only state changes and ballot positions can be undone, and only while the document has not moved on.",
        after_help = "EXAMPLES:\n    dk undo 42"
    )]
    Undo(cmd::undo::UndoArgs),

    #[command(
        next_help_heading = "Relations",
        about = "Add, remove or list relations",
        after_help = "EXAMPLES:\n    dk relate add draft-ietf-quic-foo refnorm rfc9000\n\n    dk relate list draft-ietf-quic-foo\n\n    dk relate replace draft-ietf-quic-foo draft-smith-foo"
    )]
    Relate(cmd::relate::RelateArgs),

    #[command(
        next_help_heading = "IESG",
        about = "Ballots and positions",
        after_help = "EXAMPLES:\n    dk ballot issue draft-ietf-quic-foo\n\n    dk ballot position draft-ietf-quic-foo discuss --discuss \"Section 3 is unclear.\"\n\n    dk ballot tally draft-ietf-quic-foo\n\n    dk ballot approve draft-ietf-quic-foo"
    )]
    Ballot(cmd::ballot::BallotArgs),

    #[command(
        next_help_heading = "IESG",
        about = "IETF last calls",
        after_help = "EXAMPLES:\n    dk last-call request draft-ietf-quic-foo\n\n    dk last-call send draft-ietf-quic-foo\n\n    # Expire every last call that has run out\n    dk last-call sweep"
    )]
    LastCall(cmd::last_call::LastCallArgs),

    #[command(
        next_help_heading = "IESG",
        about = "Telechat calendar and agenda",
        after_help = "EXAMPLES:\n    dk telechat add 2026-06-11 2026-06-25\n\n    dk telechat schedule draft-ietf-quic-foo 2026-06-11"
    )]
    Telechat(cmd::telechat::TelechatArgs),

    #[command(
        next_help_heading = "IESG",
        about = "Read or replace writeup texts",
        after_help = "EXAMPLES:\n    dk writeup show draft-ietf-quic-foo ballot-writeup\n\n    dk writeup set draft-ietf-quic-foo ballot-writeup writeup.txt"
    )]
    Writeup(cmd::writeup::WriteupArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Mail waiting for redelivery",
        after_help = "EXAMPLES:\n    dk outbox list\n\n    dk outbox retry"
    )]
    Outbox(cmd::outbox::OutboxArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    dk completions bash > ~/.local/share/bash-completion/completions/dk"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOCKET_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "docket=debug,info"
        } else {
            "docket=info,warn"
        })
    });

    let format = env::var("DOCKET_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays parseable.
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

fn run(cli: &Cli, ctx: &cmd::Context<'_>) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, ctx),
        Commands::File(args) => cmd::file::run_file(args, ctx),
        Commands::Revise(args) => cmd::edit::run_revise(args, ctx),
        Commands::Edit(args) => cmd::edit::run_edit(args, ctx),
        Commands::Comment(args) => cmd::edit::run_comment(args, ctx),
        Commands::Show(args) => cmd::show::run_show(args, ctx),
        Commands::List(args) => cmd::show::run_list(args, ctx),
        Commands::Log(args) => cmd::log::run_log(args, ctx),
        Commands::History(args) => cmd::log::run_history(args, ctx),
        Commands::State(args) => cmd::state::run_state(args, ctx),
        Commands::UnsetState(args) => cmd::state::run_unset_state(args, ctx),
        Commands::Undo(args) => cmd::undo::run_undo(args, ctx),
        Commands::Relate(args) => cmd::relate::run_relate(args, ctx),
        Commands::Ballot(args) => cmd::ballot::run_ballot(args, ctx),
        Commands::LastCall(args) => cmd::last_call::run_last_call(args, ctx),
        Commands::Telechat(args) => cmd::telechat::run_telechat(args, ctx),
        Commands::Writeup(args) => cmd::writeup::run_writeup(args, ctx),
        Commands::Outbox(args) => cmd::outbox::run_outbox(args, ctx),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = match env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("error: cannot read the current directory: {err}");
            return ExitCode::FAILURE;
        }
    };
    let output = cli.output_mode(&project_root);
    let ctx = cmd::Context {
        project_root: &project_root,
        output,
        actor_flag: cli.actor_flag(),
    };

    match run(&cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Err(render_err) = render_error(output, &CliError::from(&err)) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["dk", "list", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn actor_flag_parsed() {
        let cli = Cli::parse_from(["dk", "--actor", "ad1", "list"]);
        assert_eq!(cli.actor_flag(), Some("ad1"));
        let cli = Cli::parse_from(["dk", "list"]);
        assert!(cli.actor_flag().is_none());
    }

    #[test]
    fn nested_subcommands_parse() {
        let cli = Cli::parse_from(["dk", "ballot", "position", "draft-x", "discuss", "--discuss", "why"]);
        assert!(matches!(
            cli.command,
            Commands::Ballot(cmd::ballot::BallotArgs {
                command: cmd::ballot::BallotCommand::Position { .. }
            })
        ));
        let cli = Cli::parse_from(["dk", "last-call", "sweep"]);
        assert!(matches!(cli.command, Commands::LastCall(_)));
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["dk", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn unknown_position_is_rejected() {
        assert!(Cli::try_parse_from(["dk", "ballot", "position", "draft-x", "maybe"]).is_err());
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["dk", "init"],
            vec!["dk", "file", "draft-x", "--title", "X"],
            vec!["dk", "revise", "draft-x", "01"],
            vec!["dk", "edit", "draft-x", "--title", "Y"],
            vec!["dk", "comment", "draft-x", "hello"],
            vec!["dk", "show", "draft-x"],
            vec!["dk", "list"],
            vec!["dk", "log", "draft-x"],
            vec!["dk", "history", "draft-x", "--rev", "00"],
            vec!["dk", "state", "draft-x", "draft-iesg", "ad-eval"],
            vec!["dk", "unset-state", "draft-x", "draft-stream-ietf"],
            vec!["dk", "undo", "7"],
            vec!["dk", "relate", "add", "draft-x", "refnorm", "rfc9000"],
            vec!["dk", "relate", "list", "draft-x", "--kind", "refnorm"],
            vec!["dk", "relate", "approve-downref", "draft-x", "rfc1"],
            vec!["dk", "ballot", "issue", "draft-x"],
            vec!["dk", "ballot", "tally", "draft-x"],
            vec!["dk", "ballot", "approve", "draft-x"],
            vec!["dk", "last-call", "request", "draft-x"],
            vec!["dk", "last-call", "expired"],
            vec!["dk", "telechat", "add", "2026-06-11"],
            vec!["dk", "telechat", "schedule", "draft-x", "2026-06-11"],
            vec!["dk", "writeup", "show", "draft-x", "last-call"],
            vec!["dk", "outbox", "retry"],
            vec!["dk", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "Failed to parse: {args:?}: {:?}", result.err());
        }
    }
}
