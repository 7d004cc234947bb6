//! `larder` command-line entry point.

use clap::{Parser, Subcommand};
use larder_core::LarderResult;
use larder_runner::{demo_jobs, init_tracing, read_jobs, BatchReport, JobRunner, RunnerConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// larder - composable inventory proxy chains
#[derive(Parser)]
#[command(name = "larder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (falls back to LARDER_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the report as single-line JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON array of jobs
    Run {
        /// Job file, or `-` for stdin
        input: PathBuf,
    },

    /// Run the built-in demonstration jobs
    Demo,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "larder failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> LarderResult<()> {
    let config = RunnerConfig::load(cli.config.as_deref())?;
    init_tracing(&config)?;

    let jobs = match &cli.command {
        Commands::Run { input } => read_jobs(input)?,
        Commands::Demo => demo_jobs(),
    };

    let runner = JobRunner::new(config.defaults.clone());
    let report = runner.run_jobs(&jobs)?;
    print_report(&report, config.pretty_output && !cli.compact);
    Ok(())
}

fn print_report(report: &BatchReport, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Failed to serialize report"),
    }
}
