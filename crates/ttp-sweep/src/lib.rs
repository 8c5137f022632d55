//! # ttp-sweep
//!
//! Concurrent parameter sweep harness for the `rdb-ttp` annealing solver.
//!
//! The outer (temperature) axis is split across a fixed set of worker
//! threads. Each worker walks its slice of the grid, runs the solver once
//! per seed, folds the outcomes into a per-cell summary and appends one CSV
//! row to a report shared by all workers.

mod aggregate;
mod config;
mod coordinator;
mod grid;
mod progress;
mod report;
mod solver;
mod space;

pub use aggregate::{summarize, CellAggregator, CellSummary};
pub use config::{parse_team_count, SweepConfig};
pub use coordinator::{SharedReport, SweepCoordinator, SweepId, SweepOutcome};
pub use grid::GridIterator;
pub use progress::ProgressTracker;
pub use report::{header_columns, record_fields, ReportWriter};
pub use solver::{parse_cost, ProcessBackend, SolverBackend, SolverInvoker, VALID_SCHEDULE_MARKER};
pub use space::{partition, Axis, SweepSpace};
