//! Grid cells: one concrete solver configuration under sweep.

use serde::{Deserialize, Serialize};

/// Solver settings that stay fixed across the whole sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConstants {
    /// Cooling factor applied per phase.
    pub beta: f64,
    /// Penalty weight for soft-constraint violations.
    pub weight: f64,
    /// Penalty growth factor.
    pub delta: f64,
}

impl Default for SweepConstants {
    fn default() -> Self {
        Self {
            beta: 0.9999,
            weight: 4000.0 * 2.0,
            delta: 1.04,
        }
    }
}

/// One combination of solver parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub temperature: i64,
    pub beta: f64,
    pub weight: f64,
    pub delta: f64,
    pub reheat: i64,
    pub phase: i64,
    pub iterations: i64,
}

impl GridCell {
    pub fn new(
        constants: SweepConstants,
        temperature: i64,
        reheat: i64,
        phase: i64,
        iterations: i64,
    ) -> Self {
        Self {
            temperature,
            beta: constants.beta,
            weight: constants.weight,
            delta: constants.delta,
            reheat,
            phase,
            iterations,
        }
    }

    /// The swept coordinates, without the fixed constants.
    pub fn key(&self) -> (i64, i64, i64, i64) {
        (self.temperature, self.reheat, self.phase, self.iterations)
    }
}
