use crate::prelude::Outcome;
use serde::Serialize;
use std::sync::Mutex;

/// Counts request outcomes; shared across batch workers.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub solved: usize,
    pub no_solution: usize,
    pub failed: usize,
}

impl MetricsSnapshot {
    pub fn total(&self) -> usize {
        self.solved + self.no_solution + self.failed
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_outcome(&self, outcome: &Outcome) {
        if let Ok(mut metrics) = self.inner.lock() {
            match outcome {
                Outcome::Solved(_) => metrics.solved += 1,
                Outcome::NoSolution(_) => metrics.no_solution += 1,
            }
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failed += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::convergence::Rejection;

    #[test]
    fn counts_each_outcome_kind() {
        let recorder = MetricsRecorder::new();
        recorder.record_outcome(&Outcome::NoSolution(Rejection::ResidualAboveThreshold {
            metric: 50.0,
            threshold: 10.0,
        }));
        recorder.record_failure();
        recorder.record_failure();

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.no_solution, 1);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.solved, 0);
        assert_eq!(snapshot.total(), 3);
    }
}
