//! Per-cell statistics over all seeds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use ttp_types::{GridCell, RunOutcome};

/// Aggregate over every seed of one grid cell.
///
/// Times are whole nanoseconds. When no seed succeeded, both means are zero
/// and every other statistic keeps its starting sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSummary {
    pub cell: GridCell,
    pub successful: u32,
    pub min_seed: u32,
    pub max_seed: u32,
    pub min_cost: i64,
    pub max_cost: i64,
    pub mean_cost: i64,
    pub min_time_ns: i64,
    pub max_time_ns: i64,
    pub mean_time_ns: i64,
}

/// Folds seed outcomes, in seed order, into a [`CellSummary`].
///
/// Minimum and maximum are tracked with an else-if: a run that sets a new
/// minimum is never also considered for the maximum. The first success
/// therefore always lands in the minimum and leaves the maximum at zero.
/// Existing reports depend on this, so keep it.
#[derive(Debug, Clone)]
pub struct CellAggregator {
    cell: GridCell,
    successful: u32,
    min_seed: u32,
    max_seed: u32,
    min_cost: i64,
    max_cost: i64,
    total_cost: i128,
    min_time_ns: i64,
    max_time_ns: i64,
    total_time_ns: i128,
}

impl CellAggregator {
    pub fn new(cell: GridCell) -> Self {
        Self {
            cell,
            successful: 0,
            min_seed: 0,
            max_seed: 0,
            min_cost: i64::MAX,
            max_cost: 0,
            total_cost: 0,
            min_time_ns: i64::MAX,
            max_time_ns: 0,
            total_time_ns: 0,
        }
    }

    /// Record the outcome for `seed`. Failures contribute nothing.
    pub fn record(&mut self, seed: u32, outcome: RunOutcome) {
        let RunOutcome::Success { cost, elapsed } = outcome else {
            return;
        };
        let time_ns = duration_ns(elapsed);

        self.successful += 1;
        self.total_cost += i128::from(cost);
        self.total_time_ns += i128::from(time_ns);

        if cost < self.min_cost {
            self.min_cost = cost;
            self.min_seed = seed;
        } else if cost > self.max_cost {
            self.max_cost = cost;
            self.max_seed = seed;
        }

        if time_ns < self.min_time_ns {
            self.min_time_ns = time_ns;
        } else if time_ns > self.max_time_ns {
            self.max_time_ns = time_ns;
        }
    }

    pub fn finish(self) -> CellSummary {
        let (mean_cost, mean_time_ns) = if self.successful > 0 {
            let n = i128::from(self.successful);
            (mean(self.total_cost, n), mean(self.total_time_ns, n))
        } else {
            (0, 0)
        };

        CellSummary {
            cell: self.cell,
            successful: self.successful,
            min_seed: self.min_seed,
            max_seed: self.max_seed,
            min_cost: self.min_cost,
            max_cost: self.max_cost,
            mean_cost,
            min_time_ns: self.min_time_ns,
            max_time_ns: self.max_time_ns,
            mean_time_ns,
        }
    }
}

/// Summarize outcomes given in seed order, seed `i` at position `i`.
pub fn summarize<I>(cell: GridCell, outcomes: I) -> CellSummary
where
    I: IntoIterator<Item = RunOutcome>,
{
    let mut agg = CellAggregator::new(cell);
    for (seed, outcome) in (0u32..).zip(outcomes) {
        agg.record(seed, outcome);
    }
    agg.finish()
}

// Sums are kept wide so a cell of near-maximal costs cannot overflow; the
// mean of in-range values always fits back into i64.
fn mean(total: i128, n: i128) -> i64 {
    i64::try_from(total / n).unwrap_or(i64::MAX)
}

fn duration_ns(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}
