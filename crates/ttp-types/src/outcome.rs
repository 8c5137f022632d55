use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one solver invocation for one (cell, seed) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Success { cost: i64, elapsed: Duration },
    Failure,
}

impl RunOutcome {
    pub fn success(cost: i64, elapsed: Duration) -> Self {
        Self::Success { cost, elapsed }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn cost(&self) -> Option<i64> {
        match self {
            Self::Success { cost, .. } => Some(*cost),
            Self::Failure => None,
        }
    }
}
