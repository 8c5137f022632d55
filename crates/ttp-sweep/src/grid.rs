//! Per-worker enumeration of grid cells.

use std::ops::Range;

use ttp_types::GridCell;

use crate::space::{partition, SweepSpace};

/// Lazily walks one worker's slice of the sweep space.
///
/// Order is outer ascending, then reheat, phase and iterations ascending.
/// Seeds are not part of the iterator; callers run `0..space.seeds` for each
/// cell in ascending order.
#[derive(Debug, Clone)]
pub struct GridIterator<'a> {
    space: &'a SweepSpace,
    outer: Range<usize>,
    cursor: usize,
    end: usize,
}

impl<'a> GridIterator<'a> {
    /// Iterator over the slice owned by `worker` out of `workers`.
    pub fn for_worker(space: &'a SweepSpace, worker: usize, workers: usize) -> Self {
        let outer = partition(space.temperature.len(), workers, worker);
        Self::over_outer(space, outer)
    }

    /// Iterator over the whole space, as a single worker would see it.
    pub fn full(space: &'a SweepSpace) -> Self {
        Self::over_outer(space, 0..space.temperature.len())
    }

    fn over_outer(space: &'a SweepSpace, outer: Range<usize>) -> Self {
        let end = outer.len() * space.cells_per_outer();
        Self {
            space,
            outer,
            cursor: 0,
            end,
        }
    }

    /// Positions of the outer axis this iterator covers.
    pub fn outer_range(&self) -> Range<usize> {
        self.outer.clone()
    }

    /// Rewind to the first cell.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    fn cell_at(&self, flat: usize) -> GridCell {
        let space = self.space;
        let n_iter = space.iterations.len();
        let n_phase = space.phase.len();
        let n_reheat = space.reheat.len();

        let iter_pos = flat % n_iter;
        let phase_pos = (flat / n_iter) % n_phase;
        let reheat_pos = (flat / (n_iter * n_phase)) % n_reheat;
        let outer_pos = self.outer.start + flat / (n_iter * n_phase * n_reheat);

        GridCell::new(
            space.constants,
            space.temperature.value_at(outer_pos),
            space.reheat.value_at(reheat_pos),
            space.phase.value_at(phase_pos),
            space.iterations.value_at(iter_pos),
        )
    }
}

impl Iterator for GridIterator<'_> {
    type Item = GridCell;

    fn next(&mut self) -> Option<GridCell> {
        if self.cursor >= self.end {
            return None;
        }
        let cell = self.cell_at(self.cursor);
        self.cursor += 1;
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.cursor;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIterator<'_> {}
