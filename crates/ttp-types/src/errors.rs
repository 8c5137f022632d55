use thiserror::Error;

/// Main error type for a sweep run
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Team count error: {0}")]
    TeamCount(#[from] TeamCountError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

impl SweepError {
    /// Process exit status for a run that stopped with this error.
    ///
    /// Team-count rejections keep their own codes, configuration problems
    /// exit with 3 and anything that went wrong during the sweep with 4.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TeamCount(e) => e.exit_code(),
            Self::Config(_) | Self::Serialization(_) => 3,
            Self::Io(_) | Self::Csv(_) | Self::WorkerPanicked { .. } => 4,
        }
    }
}

/// Why a single solver invocation did not produce a usable cost.
///
/// These never abort a sweep; the invoker turns them into a failed run.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("failed to launch solver {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("solver exited with {status}")]
    ExitStatus { status: String },

    #[error("solver output is not valid UTF-8")]
    InvalidUtf8,

    #[error("solver did not report a valid schedule")]
    NoValidSchedule,

    #[error("malformed cost line: {line:?}")]
    MalformedCost { line: String },
}

/// Rejections of the team-count argument, checked before any work starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TeamCountError {
    #[error("missing team count")]
    Missing,

    #[error("team count {input:?} is not a number")]
    NotANumber { input: String },

    #[error("number of teams must be even and at least 4, got {count}")]
    Invalid { count: i64 },
}

impl TeamCountError {
    /// Process exit status for this rejection.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Missing => 1,
            Self::NotANumber { .. } | Self::Invalid { .. } => 2,
        }
    }
}

/// Result type alias for sweep operations
pub type SweepResult<T> = Result<T, SweepError>;
