//! Sweep space definitions and outer-axis partitioning.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use ttp_types::SweepConstants;

/// A single integer-indexed sweep dimension.
///
/// Index `i` runs over `start .. start + count` and maps to the concrete
/// parameter value `offset + scale * i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub start: i64,
    pub count: usize,
    pub scale: i64,
    pub offset: i64,
}

impl Axis {
    pub fn new(start: i64, count: usize, scale: i64, offset: i64) -> Self {
        Self {
            start,
            count,
            scale,
            offset,
        }
    }

    /// Number of distinct values along this axis.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Parameter value at position `pos` (0-based, relative to `start`).
    pub fn value_at(&self, pos: usize) -> i64 {
        self.offset + self.scale * (self.start + pos as i64)
    }

    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.count).map(move |pos| self.value_at(pos))
    }
}

/// The full sweep space: four axes, fixed constants and a seed count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSpace {
    /// Outer dimension, split across workers.
    pub temperature: Axis,
    pub reheat: Axis,
    pub phase: Axis,
    pub iterations: Axis,
    pub constants: SweepConstants,
    /// Seeds `0..seeds` are run for every cell.
    pub seeds: u32,
}

impl SweepSpace {
    /// Number of cells sharing one outer value.
    pub fn cells_per_outer(&self) -> usize {
        self.reheat.len() * self.phase.len() * self.iterations.len()
    }

    /// Total number of grid cells across all workers.
    pub fn total_cells(&self) -> usize {
        self.temperature.len() * self.cells_per_outer()
    }

    /// Total number of solver invocations the sweep performs.
    pub fn total_runs(&self) -> usize {
        self.total_cells() * self.seeds as usize
    }
}

impl Default for SweepSpace {
    fn default() -> Self {
        Self {
            temperature: Axis::new(0, 4, 50, 300),
            reheat: Axis::new(1, 2, 5, 0),
            phase: Axis::new(0, 3, 2000, 3100),
            iterations: Axis::new(0, 3, 1000, 3000),
            constants: SweepConstants::default(),
            seeds: 4,
        }
    }
}

/// Contiguous slice of an axis of length `len` owned by `worker`.
///
/// Slices are disjoint and together cover `0..len`. When `workers` does not
/// divide `len`, the first `len % workers` workers take one extra position.
/// Workers past the end of the axis get an empty range.
pub fn partition(len: usize, workers: usize, worker: usize) -> Range<usize> {
    if workers == 0 || worker >= workers {
        return 0..0;
    }
    let base = len / workers;
    let extra = len % workers;
    let start = worker * base + worker.min(extra);
    let size = base + usize::from(worker < extra);
    start..start + size
}
