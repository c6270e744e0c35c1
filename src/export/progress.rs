//! Progress tracking for export operations
//!
//! This module provides the progress bar and per-batch statistics for long
//! running exports. Percentages are computed against the total counted at
//! the start, so they are best-effort if the store changes mid-export.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// Point-in-time export progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub exported: u64,
    pub total: u64,
    pub batch: u64,
    pub total_batches: u64,
}

impl ProgressSnapshot {
    /// Whole percent of the initial total; 100 when nothing was expected
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            100
        } else {
            self.exported * 100 / self.total
        }
    }
}

/// Progress tracker for export operations
///
/// Tracks exported rows and displays a progress bar with speed and
/// batch position.
pub struct ProgressTracker {
    /// Start time of the operation
    start_time: Instant,
    /// Progress bar (optional, can be disabled)
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// Create a new progress tracker
    ///
    /// # Arguments
    /// * `total` - Total number of rows expected
    /// * `enable_bar` - Whether to display a progress bar
    pub fn new(total: u64, enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self {
            start_time: Instant::now(),
            bar,
        }
    }

    /// Record progress after a batch was written
    pub fn update(&self, snapshot: &ProgressSnapshot) {
        if let Some(ref bar) = self.bar {
            bar.set_position(snapshot.exported);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            let speed = if elapsed > 0.0 {
                snapshot.exported as f64 / elapsed
            } else {
                0.0
            };
            bar.set_message(format!(
                "batch {}/{} ({:.0} rows/sec)",
                snapshot.batch, snapshot.total_batches, speed
            ));
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }

    /// Stop the bar, leaving the last state visible
    pub fn abandon(&self) {
        if let Some(ref bar) = self.bar {
            bar.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        let snapshot = ProgressSnapshot {
            exported: 250,
            total: 1000,
            batch: 1,
            total_batches: 4,
        };
        assert_eq!(snapshot.percent(), 25);

        let empty = ProgressSnapshot {
            exported: 0,
            total: 0,
            batch: 0,
            total_batches: 0,
        };
        assert_eq!(empty.percent(), 100);
    }

    #[test]
    fn test_tracker_moves_bar() {
        let snapshot = ProgressSnapshot {
            exported: 7,
            total: 10,
            batch: 2,
            total_batches: 2,
        };

        let tracker = ProgressTracker::new(10, true);
        tracker.update(&snapshot);
        let bar = tracker.bar.as_ref().unwrap();
        assert_eq!(bar.position(), 7);
        assert!(bar.message().starts_with("batch 2/2"));
        tracker.finish();

        let quiet = ProgressTracker::new(10, false);
        quiet.update(&snapshot);
        assert!(quiet.bar.is_none());
    }
}
