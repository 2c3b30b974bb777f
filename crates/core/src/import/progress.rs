//! Progress counters, remaining-time estimates and the terminal outcome.
//!
//! Progress only moves when a batch actually completes. There is no timer
//! animating it in between.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Below this much elapsed time the throughput is too noisy to estimate.
const MIN_ELAPSED_FOR_ESTIMATE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub started_at: Timestamp,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            processed: 0,
            total,
            started_at: Utc::now(),
        }
    }

    /// Count `rows` more as processed, never past `total`.
    pub fn advance(&mut self, rows: usize) {
        self.processed = (self.processed + rows).min(self.total);
    }

    /// Whole-number percentage, rounded half up.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.processed as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    /// Remaining-time estimate given the time spent so far.
    pub fn eta(&self, elapsed: Duration) -> Eta {
        Eta::estimate(self.processed, self.total, elapsed)
    }
}

/// Remaining-time estimate shown while batches are being saved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eta {
    Calculating,
    AlmostDone,
    Remaining(Duration),
}

impl Eta {
    pub fn estimate(processed: usize, total: usize, elapsed: Duration) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        if elapsed < MIN_ELAPSED_FOR_ESTIMATE || processed == 0 {
            return Self::Calculating;
        }
        let throughput = processed as f64 / elapsed_secs;
        if !throughput.is_finite() || throughput <= 0.0 {
            return Self::Calculating;
        }

        let remaining = total.saturating_sub(processed) as f64 / throughput;
        if remaining < 1.0 {
            Self::AlmostDone
        } else {
            Self::Remaining(Duration::from_secs_f64(remaining))
        }
    }
}

impl std::fmt::Display for Eta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calculating => f.write_str("Calculating..."),
            Self::AlmostDone => f.write_str("Almost done..."),
            Self::Remaining(d) => {
                let secs = d.as_secs_f64().ceil() as u64;
                if secs < 60 {
                    write!(f, "{secs}s remaining")
                } else {
                    write!(f, "{}m {}s remaining", secs / 60, secs % 60)
                }
            }
        }
    }
}

/// `Xs` under a minute, otherwise `Xm Ys`. Rounds up to whole seconds.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).ceil() as u64;
    if total < 60 {
        format!("{total}s")
    } else {
        format!("{}m {}s", total / 60, total % 60)
    }
}

/// Counts reported once a session reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success_count: usize,
    pub failure_count: usize,
    pub elapsed_seconds: f64,
    /// Indices of batches the server rejected, in run order.
    #[serde(default)]
    pub failed_batches: Vec<usize>,
}

impl Outcome {
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }
}
