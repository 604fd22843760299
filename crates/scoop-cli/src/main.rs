#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::Session;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "scoop: hybrid retrieval and novelty checks for incoming news",
    long_about = None
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ./scoop.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path; overrides `store.path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Alias for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    Ingest(cmd::ingest::IngestArgs),
    Similar(cmd::similar::SimilarArgs),
    Assess(cmd::assess::AssessArgs),
    Report(cmd::report::ReportArgs),
    Evaluate(cmd::evaluate::EvaluateArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SCOOP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "scoop=debug,info"
        } else {
            "scoop=info,warn"
        })
    });

    let format = env::var("SCOOP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

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

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let session = Session::load(cli.config.as_deref(), cli.db.clone(), output, &project_root)?;

    match &cli.command {
        Commands::Ingest(args) => cmd::ingest::run_ingest(args, &session),
        Commands::Similar(args) => cmd::similar::run_similar(args, &session),
        Commands::Assess(args) => cmd::assess::run_assess(args, &session),
        Commands::Report(args) => cmd::report::run_report(args, &session),
        Commands::Evaluate(args) => cmd::evaluate::run_evaluate(args, &session),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    debug!(?output, "starting");

    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let cli_error = CliError::from(&err);
            debug!(code = %cli_error.error_code, error = ?err, "command failed");
            if let Err(render_err) = render_error(output, &cli_error) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["scoop", "report", "--json", "--db", "/tmp/x.db", "-v"]);
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/x.db")));
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }

    #[test]
    fn format_flag_selects_mode() {
        let cli = Cli::parse_from(["scoop", "--format", "text", "report"]);
        assert_eq!(cli.output_mode(), OutputMode::Text);
    }

    #[test]
    fn similar_requires_positive_top_k() {
        assert!(Cli::try_parse_from(["scoop", "similar", "--query", "x", "--top-k", "0"]).is_err());
        let cli = Cli::parse_from(["scoop", "similar", "-q", "x", "-k", "3"]);
        match cli.command {
            Commands::Similar(args) => assert_eq!(args.top_k, Some(3)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn assess_takes_input_and_optional_output() {
        let cli = Cli::parse_from(["scoop", "assess", "--input", "in.json"]);
        match cli.command {
            Commands::Assess(args) => {
                assert_eq!(args.input, PathBuf::from("in.json"));
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
