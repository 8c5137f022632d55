use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ttp_sweep::{parse_team_count, SweepConfig, SweepCoordinator, SweepOutcome};
use ttp_types::SweepError;

/// Fallback status for errors raised outside the sweep itself.
const EXIT_SWEEP: u8 = 4;
/// Command-line usage errors reported by clap.
const EXIT_USAGE: u8 = 5;

#[derive(Parser, Debug)]
#[command(name = "ttp-sweep")]
#[command(about = "Sweep rdb-ttp annealing parameters and summarize the results")]
struct Args {
    /// Number of teams passed to the solver (even, at least 4)
    #[arg(allow_negative_numbers = true)]
    teams: Option<String>,

    /// JSON sweep configuration; missing fields use the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the solver executable
    #[arg(long)]
    solver: Option<PathBuf>,

    /// Report file to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Add elapsed-time columns to the report
    #[arg(long)]
    timing: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ttp_sweep={level}")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<SweepConfig> {
    let mut config = match &args.config {
        Some(path) => SweepConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => SweepConfig::default(),
    };
    if let Some(solver) = &args.solver {
        config.solver = solver.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.timing {
        config.timing = true;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> anyhow::Result<SweepOutcome> {
    let teams = parse_team_count(args.teams.as_deref()).map_err(SweepError::from)?;
    let config = load_config(args)?;
    let outcome = SweepCoordinator::with_process_solver(config, teams).run()?;
    Ok(outcome)
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        // --help and --version land here too and are not failures
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_USAGE);
        }
    };
    init_logging(&args.log_level);

    match run(&args) {
        Ok(outcome) => {
            tracing::info!(id = %outcome.id, cells = outcome.cells, "report complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            let err = e.downcast_ref::<SweepError>();
            if let Some(SweepError::TeamCount(_)) = err {
                eprintln!("Usage: ttp-sweep [OPTIONS] <TEAMS>");
            }
            let code = err.map_or(i32::from(EXIT_SWEEP), SweepError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(EXIT_SWEEP))
        }
    }
}
