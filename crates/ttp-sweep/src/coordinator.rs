//! Sweep orchestration: partitioning, worker threads and the shared report.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::thread;
use tracing::{debug, dispatcher, error, info, info_span, Dispatch, Span};
use uuid::Uuid;

use ttp_types::{SweepError, SweepResult};

use crate::aggregate::{CellAggregator, CellSummary};
use crate::config::SweepConfig;
use crate::grid::GridIterator;
use crate::progress::ProgressTracker;
use crate::report::ReportWriter;
use crate::solver::{ProcessBackend, SolverBackend, SolverInvoker};

/// Unique sweep run identifier.
pub type SweepId = Uuid;

// ---------------------------------------------------------------------------
// Shared report state
// ---------------------------------------------------------------------------

struct ReportState<W: Write> {
    writer: ReportWriter<W>,
    progress: ProgressTracker,
}

/// Report sink and progress counter behind one lock.
///
/// Every worker holds a reference to the same handle. The lock is taken
/// once per completed cell and covers the row write plus the progress
/// update, so a row and its progress step are never interleaved with
/// another worker's.
pub struct SharedReport<W: Write> {
    state: Mutex<ReportState<W>>,
}

impl<W: Write> SharedReport<W> {
    pub fn new(writer: ReportWriter<W>, progress: ProgressTracker) -> Self {
        Self {
            state: Mutex::new(ReportState { writer, progress }),
        }
    }

    /// Append the row for `summary` and advance progress.
    ///
    /// Returns the completion fraction after this cell.
    pub fn record(&self, summary: &CellSummary) -> SweepResult<f64> {
        let mut state = self.state.lock();
        state.writer.append(summary)?;
        Ok(state.progress.advance())
    }

    pub fn fraction(&self) -> f64 {
        self.state.lock().progress.fraction()
    }

    pub fn into_parts(self) -> (ReportWriter<W>, ProgressTracker) {
        let state = self.state.into_inner();
        (state.writer, state.progress)
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Counters gathered by one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct WorkerTally {
    cells: usize,
    runs: usize,
    successful_runs: usize,
}

impl WorkerTally {
    fn merge(&mut self, other: WorkerTally) {
        self.cells += other.cells;
        self.runs += other.runs;
        self.successful_runs += other.successful_runs;
    }
}

/// Summary of a finished sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub id: SweepId,
    pub workers: usize,
    pub cells: usize,
    pub runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    /// Completion fraction shown on the status line at the end.
    pub progress: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Splits the outer axis across a fixed set of worker threads and waits
/// for all of them before finalizing the report.
///
/// Inputs are taken as given; validation happens before a coordinator is
/// built.
pub struct SweepCoordinator<B> {
    config: SweepConfig,
    invoker: SolverInvoker<B>,
}

impl SweepCoordinator<ProcessBackend> {
    /// Coordinator driving the solver binary named in `config`.
    pub fn with_process_solver(config: SweepConfig, teams: u32) -> Self {
        let backend = ProcessBackend::new(config.solver.clone());
        Self::new(config, SolverInvoker::new(backend, teams))
    }
}

impl<B: SolverBackend> SweepCoordinator<B> {
    pub fn new(config: SweepConfig, invoker: SolverInvoker<B>) -> Self {
        Self { config, invoker }
    }

    /// Run the sweep into the report file named in the config, rendering
    /// progress on stdout.
    pub fn run(&self) -> SweepResult<SweepOutcome> {
        let file = File::create(&self.config.output)?;
        info!(output = %self.config.output.display(), "report file opened");
        let progress = ProgressTracker::new(self.config.space.total_cells());
        let (outcome, _file) = self.run_with(file, progress)?;
        Ok(outcome)
    }

    /// Run the sweep into an arbitrary sink. Returns the sink once every
    /// worker has finished.
    pub fn run_with<W>(&self, sink: W, progress: ProgressTracker) -> SweepResult<(SweepOutcome, W)>
    where
        W: Write + Send,
    {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let workers = self.config.workers;
        let span = info_span!("sweep", %id);
        let _guard = span.enter();

        info!(
            workers,
            cells = self.config.space.total_cells(),
            runs = self.config.space.total_runs(),
            teams = self.invoker.teams(),
            timing = self.config.timing,
            "starting sweep"
        );

        let writer = ReportWriter::new(sink, self.config.timing)?;
        let shared = SharedReport::new(writer, progress);

        let (tally, first_error) = self.spawn_workers(&shared, &span)?;

        let (writer, mut progress) = shared.into_parts();
        progress.finish();
        let sink = writer.into_inner()?;

        if let Some(e) = first_error {
            return Err(e);
        }

        let outcome = SweepOutcome {
            id,
            workers,
            cells: tally.cells,
            runs: tally.runs,
            successful_runs: tally.successful_runs,
            failed_runs: tally.runs - tally.successful_runs,
            progress: progress.fraction(),
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            cells = outcome.cells,
            successful_runs = outcome.successful_runs,
            failed_runs = outcome.failed_runs,
            "sweep finished"
        );
        Ok((outcome, sink))
    }

    /// Start every worker and join them all. The first worker error, if
    /// any, is handed back alongside the merged tally.
    ///
    /// Workers log through the caller's subscriber, under `sweep_span`.
    fn spawn_workers<W>(
        &self,
        shared: &SharedReport<W>,
        sweep_span: &Span,
    ) -> SweepResult<(WorkerTally, Option<SweepError>)>
    where
        W: Write + Send,
    {
        let workers = self.config.workers;
        let dispatch = dispatcher::get_default(Dispatch::clone);
        let dispatch = &dispatch;

        thread::scope(|scope| -> SweepResult<(WorkerTally, Option<SweepError>)> {
            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let handle = thread::Builder::new()
                    .name(format!("sweep-worker-{worker}"))
                    .spawn_scoped(scope, move || {
                        dispatcher::with_default(dispatch, || {
                            self.run_worker(worker, shared, sweep_span)
                        })
                    })?;
                handles.push(handle);
            }

            let mut tally = WorkerTally::default();
            let mut first_error = None;
            for (worker, handle) in handles.into_iter().enumerate() {
                let result = handle
                    .join()
                    .unwrap_or(Err(SweepError::WorkerPanicked { worker }));
                match result {
                    Ok(t) => tally.merge(t),
                    Err(e) => {
                        error!(worker, "worker stopped early: {e}");
                        first_error.get_or_insert(e);
                    }
                }
            }
            Ok((tally, first_error))
        })
    }

    fn run_worker<W: Write>(
        &self,
        worker: usize,
        shared: &SharedReport<W>,
        sweep_span: &Span,
    ) -> SweepResult<WorkerTally> {
        let space = &self.config.space;
        let grid = GridIterator::for_worker(space, worker, self.config.workers);
        let span = info_span!(parent: sweep_span, "worker", worker);
        let _guard = span.enter();
        debug!(outer = ?grid.outer_range(), cells = grid.len(), "worker started");

        let mut tally = WorkerTally::default();
        for cell in grid {
            let mut agg = CellAggregator::new(cell);
            for seed in 0..space.seeds {
                let outcome = self.invoker.invoke(&cell, seed);
                tally.runs += 1;
                if outcome.is_success() {
                    tally.successful_runs += 1;
                }
                agg.record(seed, outcome);
            }

            let summary = agg.finish();
            let fraction = shared.record(&summary)?;
            tally.cells += 1;
            debug!(
                temperature = cell.temperature,
                reheat = cell.reheat,
                phase = cell.phase,
                iterations = cell.iterations,
                successful = summary.successful,
                fraction,
                "cell recorded"
            );
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::header_columns;
    use crate::space::{Axis, SweepSpace};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ttp_types::SolverError;

    fn fake<F>(f: F) -> F
    where
        F: Fn(&[String]) -> Result<String, SolverError> + Send + Sync,
    {
        f
    }

    /// Value following `flag` in a solver argument list.
    fn arg(args: &[String], flag: &str) -> i64 {
        let pos = args.iter().position(|a| a == flag).unwrap();
        args[pos + 1].parse().unwrap()
    }

    /// Deterministic stand-in: cost depends on the cell and seed, and every
    /// third seed of some cells fails.
    fn deterministic_solver(args: &[String]) -> Result<String, SolverError> {
        let seed = arg(args, "-s");
        let temp = arg(args, "-t");
        let phase = arg(args, "-p");
        if (seed + temp / 50 + phase / 1000) % 3 == 0 {
            return Ok("Schedule violates repeat contraint.\n".into());
        }
        let cost = 1000 + temp + phase / 100 - seed * 7;
        Ok(format!("Valid Schedule!\nCost: {cost}\n"))
    }

    fn run_in_memory<B: SolverBackend>(config: SweepConfig, backend: B) -> (SweepOutcome, String) {
        let coordinator = SweepCoordinator::new(config.clone(), SolverInvoker::new(backend, 8));
        let progress = ProgressTracker::hidden(config.space.total_cells());
        let (outcome, sink) = coordinator.run_with(Vec::new(), progress).unwrap();
        (outcome, String::from_utf8(sink).unwrap())
    }

    #[test]
    fn report_has_one_row_per_cell() {
        let config = SweepConfig::default();
        let (outcome, text) = run_in_memory(config.clone(), fake(deterministic_solver));

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0].split(',').collect::<Vec<_>>(), header_columns(false));
        assert_eq!(lines.len() - 1, 4 * 2 * 3 * 3);
        assert_eq!(outcome.cells, 72);
        assert_eq!(outcome.runs, 288);
        assert_eq!(outcome.successful_runs + outcome.failed_runs, 288);
        assert_eq!(outcome.progress, 1.0);

        let tuples: HashSet<_> = lines[1..]
            .iter()
            .map(|l| l.split(',').take(7).collect::<Vec<_>>().join(","))
            .collect();
        assert_eq!(tuples.len(), 72);
    }

    #[test]
    fn rows_are_never_interleaved() {
        let config = SweepConfig::default().with_workers(4);
        let (_, text) = run_in_memory(config, fake(deterministic_solver));
        for line in text.lines().skip(1) {
            let fields: Vec<_> = line.split(',').collect();
            assert_eq!(fields.len(), 13, "corrupted row: {line:?}");
            for field in &fields[3..] {
                field.parse::<i64>().unwrap();
            }
        }
    }

    #[test]
    fn reruns_are_byte_identical_once_sorted() {
        let config = SweepConfig::default();
        let (_, a) = run_in_memory(config.clone(), fake(deterministic_solver));
        let (_, b) = run_in_memory(config, fake(deterministic_solver));
        let mut a: Vec<_> = a.lines().collect();
        let mut b: Vec<_> = b.lines().collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn single_worker_report_is_byte_identical() {
        let config = SweepConfig::default().with_workers(1);
        let (_, a) = run_in_memory(config.clone(), fake(deterministic_solver));
        let (_, b) = run_in_memory(config, fake(deterministic_solver));
        assert_eq!(a, b);
    }

    #[test]
    fn mocked_costs_follow_min_max_rule() {
        let solver = fake(|args| match arg(args, "-s") {
            0 => Ok("Valid Schedule!\nCost: 100\n".into()),
            1 => Ok("Valid Schedule!\nCost: 50\n".into()),
            _ => Err(SolverError::ExitStatus {
                status: "exit status: 1".into(),
            }),
        });
        let (outcome, text) = run_in_memory(SweepConfig::default(), solver);
        assert_eq!(outcome.successful_runs, 72 * 2);
        for line in text.lines().skip(1) {
            let tail: Vec<_> = line.split(',').skip(7).collect();
            assert_eq!(tail, ["2", "1", "0", "50", "0", "75"]);
        }
    }

    #[test]
    fn all_failures_still_complete_the_sweep() {
        let solver = fake(|_| Err(SolverError::NoValidSchedule));
        let (outcome, text) = run_in_memory(SweepConfig::default(), solver);
        assert_eq!(outcome.successful_runs, 0);
        assert_eq!(outcome.progress, 1.0);
        for line in text.lines().skip(1) {
            let fields: Vec<_> = line.split(',').collect();
            assert_eq!(fields[7], "0");
            assert_eq!(fields[12], "0");
        }
    }

    #[test]
    fn all_successes_count_every_seed() {
        let solver = fake(|_| Ok("Valid Schedule!\nCost: 9\n".into()));
        let (_, text) = run_in_memory(SweepConfig::default(), solver);
        for line in text.lines().skip(1) {
            assert_eq!(line.split(',').nth(7), Some("4"));
        }
    }

    #[test]
    fn timing_schema_adds_three_columns() {
        let config = SweepConfig::default().with_timing(true);
        let (_, text) = run_in_memory(config, fake(deterministic_solver));
        let mut lines = text.lines();
        let first = lines.next().unwrap();
        assert_eq!(first.split(',').collect::<Vec<_>>(), header_columns(true));
        for line in lines {
            assert_eq!(line.split(',').count(), 16);
        }
    }

    #[test]
    fn worker_count_need_not_match_outer_axis() {
        let calls = AtomicUsize::new(0);
        let solver = |_: &[String]| -> Result<String, SolverError> {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok("Valid Schedule!\nCost: 1\n".into())
        };
        let space = SweepSpace {
            temperature: Axis::new(0, 5, 50, 300),
            ..SweepSpace::default()
        };
        let config = SweepConfig::default().with_space(space).with_workers(3);
        let (outcome, text) = run_in_memory(config, solver);

        assert_eq!(outcome.workers, 3);
        assert_eq!(outcome.cells, 90);
        assert_eq!(text.lines().count(), 91);
        assert_eq!(calls.load(Ordering::Relaxed), 360);
    }

    #[test]
    fn more_workers_than_outer_values() {
        let config = SweepConfig::default().with_workers(6);
        let (outcome, text) = run_in_memory(config, fake(deterministic_solver));
        assert_eq!(outcome.cells, 72);
        assert_eq!(text.lines().count(), 73);
    }

    #[test]
    fn shared_report_progress_reaches_one() {
        let writer = ReportWriter::new(Vec::new(), false).unwrap();
        let shared = SharedReport::new(writer, ProgressTracker::hidden(3));
        let cell = GridIterator::full(&SweepSpace::default()).next().unwrap();
        let summary = CellAggregator::new(cell).finish();

        let mut last = shared.fraction();
        for _ in 0..3 {
            let next = shared.record(&summary).unwrap();
            assert!(next > last);
            last = next;
        }
        assert_eq!(last, 1.0);
        let (writer, _) = shared.into_parts();
        assert_eq!(writer.records(), 3);
    }

    #[test]
    fn run_writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results.csv");
        let config = SweepConfig::default()
            .with_workers(2)
            .with_output(&output);
        let coordinator =
            SweepCoordinator::new(config, SolverInvoker::new(fake(deterministic_solver), 4));

        let outcome = coordinator.run().unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), outcome.cells + 1);
    }

    #[test]
    fn unwritable_output_fails_before_any_run() {
        let calls = AtomicUsize::new(0);
        let solver = |_: &[String]| -> Result<String, SolverError> {
            calls.fetch_add(1, Ordering::Relaxed);
            Ok(String::new())
        };
        let config = SweepConfig::default().with_output("/nonexistent-dir/results.csv");
        let coordinator = SweepCoordinator::new(config, SolverInvoker::new(solver, 4));
        assert!(matches!(coordinator.run(), Err(SweepError::Io(_))));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[cfg(unix)]
    #[test]
    fn missing_solver_binary_reports_zero_successes() {
        let dir = tempfile::tempdir().unwrap();
        let space = SweepSpace {
            temperature: Axis::new(0, 2, 50, 300),
            reheat: Axis::new(1, 1, 5, 0),
            phase: Axis::new(0, 1, 2000, 3100),
            iterations: Axis::new(0, 1, 1000, 3000),
            seeds: 2,
            ..SweepSpace::default()
        };
        let config = SweepConfig::default()
            .with_space(space)
            .with_workers(2)
            .with_solver(dir.path().join("no-such-solver"))
            .with_output(dir.path().join("results.csv"));

        let outcome = SweepCoordinator::with_process_solver(config, 4).run().unwrap();
        assert_eq!(outcome.cells, 2);
        assert_eq!(outcome.failed_runs, 4);
    }

    /// Records every new span's name together with its parent's name.
    #[derive(Clone, Default)]
    struct SpanParents(std::sync::Arc<Mutex<Vec<(String, Option<String>)>>>);

    impl<S> tracing_subscriber::Layer<S> for SpanParents
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        fn on_new_span(
            &self,
            _attrs: &tracing::span::Attributes<'_>,
            id: &tracing::span::Id,
            ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if let Some(span) = ctx.span(id) {
                let parent = span.parent().map(|p| p.name().to_string());
                self.0.lock().push((span.name().to_string(), parent));
            }
        }
    }

    #[test]
    fn worker_spans_nest_under_the_sweep_span() {
        use tracing_subscriber::layer::SubscriberExt;

        let parents = SpanParents::default();
        let subscriber = tracing_subscriber::registry().with(parents.clone());
        tracing::subscriber::with_default(subscriber, || {
            run_in_memory(SweepConfig::default(), fake(deterministic_solver));
        });

        let recorded = parents.0.lock().clone();
        let workers: Vec<_> = recorded.iter().filter(|(name, _)| name == "worker").collect();
        assert_eq!(workers.len(), 4);
        for (_, parent) in workers {
            assert_eq!(parent.as_deref(), Some("sweep"));
        }
    }
}
