//! Solver invocation and output parsing.
//!
//! The solver is an opaque external program. [`SolverInvoker`] turns a
//! (cell, seed) pair into its argument list, hands it to a
//! [`SolverBackend`] and interprets whatever the backend returns. Every
//! problem along the way ends up as [`RunOutcome::Failure`].

use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use tracing::{trace, warn};
use ttp_types::{GridCell, RunOutcome, SolverError};

/// Literal the solver prints when it produced a schedule meeting every
/// constraint.
pub const VALID_SCHEDULE_MARKER: &str = "Valid Schedule!";

/// Something that can run the solver with an argument list and return its
/// standard output.
pub trait SolverBackend: Send + Sync {
    fn execute(&self, args: &[String]) -> Result<String, SolverError>;
}

impl<F> SolverBackend for F
where
    F: Fn(&[String]) -> Result<String, SolverError> + Send + Sync,
{
    fn execute(&self, args: &[String]) -> Result<String, SolverError> {
        self(args)
    }
}

/// Runs the solver binary as a child process.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    program: PathBuf,
}

impl ProcessBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl SolverBackend for ProcessBackend {
    fn execute(&self, args: &[String]) -> Result<String, SolverError> {
        // `output` waits for the child, so it is always reaped here.
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| SolverError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(SolverError::ExitStatus {
                status: output.status.to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| SolverError::InvalidUtf8)
    }
}

/// Extract the schedule cost from solver output.
///
/// The output must contain [`VALID_SCHEDULE_MARKER`]; the cost is then the
/// second whitespace-separated token of the second line.
pub fn parse_cost(stdout: &str) -> Result<i64, SolverError> {
    if !stdout.contains(VALID_SCHEDULE_MARKER) {
        return Err(SolverError::NoValidSchedule);
    }

    let line = stdout.lines().nth(1).unwrap_or_default();
    line.split_whitespace()
        .nth(1)
        .and_then(|token| token.parse::<i64>().ok())
        .ok_or_else(|| SolverError::MalformedCost {
            line: line.to_string(),
        })
}

/// Drives one solver run per (cell, seed).
#[derive(Debug, Clone)]
pub struct SolverInvoker<B> {
    backend: B,
    teams: u32,
}

impl<B: SolverBackend> SolverInvoker<B> {
    pub fn new(backend: B, teams: u32) -> Self {
        Self { backend, teams }
    }

    pub fn teams(&self) -> u32 {
        self.teams
    }

    /// Argument list for one run: the team count, then flag/value pairs.
    pub fn arguments(&self, cell: &GridCell, seed: u32) -> Vec<String> {
        vec![
            self.teams.to_string(),
            "-s".into(),
            seed.to_string(),
            "-b".into(),
            cell.beta.to_string(),
            "-d".into(),
            cell.delta.to_string(),
            "-w".into(),
            cell.weight.to_string(),
            "-r".into(),
            cell.reheat.to_string(),
            "-p".into(),
            cell.phase.to_string(),
            "-c".into(),
            cell.iterations.to_string(),
            "-t".into(),
            cell.temperature.to_string(),
        ]
    }

    /// Run the solver once, blocking until it exits. Never retries.
    pub fn invoke(&self, cell: &GridCell, seed: u32) -> RunOutcome {
        let args = self.arguments(cell, seed);
        let started = Instant::now();
        let result = self
            .backend
            .execute(&args)
            .and_then(|stdout| parse_cost(&stdout));
        let elapsed = started.elapsed();

        match result {
            Ok(cost) => {
                trace!(seed, cost, elapsed_ns = elapsed.as_nanos() as u64, "solver run succeeded");
                RunOutcome::success(cost, elapsed)
            }
            Err(e) => {
                warn!(
                    seed,
                    temperature = cell.temperature,
                    reheat = cell.reheat,
                    phase = cell.phase,
                    iterations = cell.iterations,
                    "solver run failed: {e}"
                );
                RunOutcome::Failure
            }
        }
    }
}
