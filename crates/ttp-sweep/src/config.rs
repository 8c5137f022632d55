//! Sweep configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ttp_types::{SweepError, SweepResult, TeamCountError};

use crate::space::SweepSpace;

/// Top-level configuration for a sweep run.
///
/// `Default` is the reference calibration: four workers, one per
/// temperature, timing off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub space: SweepSpace,

    /// Number of concurrent workers.
    pub workers: usize,

    /// Add min/max/mean elapsed-time columns to the report.
    pub timing: bool,

    /// Path to the solver executable.
    pub solver: PathBuf,

    /// Report file, created or truncated at start.
    pub output: PathBuf,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            space: SweepSpace::default(),
            workers: 4,
            timing: false,
            solver: PathBuf::from("./rdb-ttp"),
            output: PathBuf::from("results.csv"),
        }
    }
}

impl SweepConfig {
    /// Load from a JSON file. Missing fields take their default.
    pub fn from_json_file(path: &Path) -> SweepResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SweepError::Config(format!("cannot read {}: {e}", path.display())))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn with_timing(mut self, timing: bool) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_solver(mut self, solver: impl Into<PathBuf>) -> Self {
        self.solver = solver.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_space(mut self, space: SweepSpace) -> Self {
        self.space = space;
        self
    }

    pub fn validate(&self) -> SweepResult<()> {
        if self.workers == 0 {
            return Err(SweepError::Config("workers must be at least 1".into()));
        }
        if self.space.seeds == 0 {
            return Err(SweepError::Config("at least one seed is required".into()));
        }
        let axes = [
            ("temperature", &self.space.temperature),
            ("reheat", &self.space.reheat),
            ("phase", &self.space.phase),
            ("iterations", &self.space.iterations),
        ];
        for (name, axis) in axes {
            if axis.is_empty() {
                return Err(SweepError::Config(format!("{name} axis is empty")));
            }
        }
        Ok(())
    }
}

/// Parse and check the team-count argument: an even integer of at least 4.
pub fn parse_team_count(arg: Option<&str>) -> Result<u32, TeamCountError> {
    let input = arg.ok_or(TeamCountError::Missing)?;
    let count: i64 = input
        .trim()
        .parse()
        .map_err(|_| TeamCountError::NotANumber {
            input: input.to_string(),
        })?;

    if count < 4 || count % 2 != 0 {
        return Err(TeamCountError::Invalid { count });
    }
    u32::try_from(count).map_err(|_| TeamCountError::Invalid { count })
}
