//! Completion tracking and the interactive status line.

use std::io::Write;

/// Fraction of grid cells completed across all workers.
///
/// Each completed cell advances the fraction by `1 / total`; the value is
/// derived from the completed count so the last cell lands on exactly 1.0.
pub struct ProgressTracker {
    completed: usize,
    total: usize,
    display: Box<dyn Write + Send>,
}

impl ProgressTracker {
    /// Tracker rendering to standard output.
    pub fn new(total: usize) -> Self {
        Self::with_display(total, Box::new(std::io::stdout()))
    }

    pub fn with_display(total: usize, display: Box<dyn Write + Send>) -> Self {
        Self {
            completed: 0,
            total,
            display,
        }
    }

    /// Tracker that renders nothing.
    pub fn hidden(total: usize) -> Self {
        Self::with_display(total, Box::new(std::io::sink()))
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Mark one more cell done and redraw the status line.
    pub fn advance(&mut self) -> f64 {
        self.completed += 1;
        let fraction = self.fraction();
        // Display failures never affect the sweep.
        let _ = write!(self.display, "\rPercentage complete: {:.6}", fraction * 100.0);
        let _ = self.display.flush();
        fraction
    }

    /// Terminate the status line.
    pub fn finish(&mut self) {
        let _ = writeln!(self.display, "\nDone.");
        let _ = self.display.flush();
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("completed", &self.completed)
            .field("total", &self.total)
            .finish()
    }
}
