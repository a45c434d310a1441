//! Post-solve acceptance policy.
//!
//! A solver run must both report success and leave every range residual
//! within the variant's threshold. Doppler entries and altitude penalties
//! do not take part in the check.

use crate::estimation::solver::{SolverReport, Termination};
use crate::math::StatsHelper;
use std::fmt;

/// Why a solved state was not accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    SolverFailed(Termination),
    ResidualAboveThreshold { metric: f64, threshold: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::SolverFailed(termination) => write!(f, "solver failed: {}", termination),
            Rejection::ResidualAboveThreshold { metric, threshold } => write!(
                f,
                "max range residual {:.3} m exceeds {:.1} m",
                metric, threshold
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted { metric: f64 },
    Rejected(Rejection),
}

/// Range entries (even indices) of an interleaved measurement residual
/// vector.
pub fn range_residuals(measurement: &[f64]) -> impl Iterator<Item = f64> + '_ {
    measurement.iter().step_by(2).copied()
}

/// Largest absolute range residual in meters; NaN if any entry is NaN.
pub fn convergence_metric(measurement: &[f64]) -> f64 {
    StatsHelper::max_abs(range_residuals(measurement))
}

/// Acceptance threshold of the two-detection variant, in meters.
pub const PAIR_THRESHOLD_M: f64 = 10.0;
/// Looser threshold of the three-detection variant, whose altitude is
/// estimated jointly.
pub const TRIPLE_THRESHOLD_M: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceEvaluator {
    threshold_m: f64,
}

impl ConvergenceEvaluator {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    /// `measurement` must be the penalty-free residual vector at
    /// `report.state`.
    pub fn evaluate(&self, report: &SolverReport, measurement: &[f64]) -> Verdict {
        if !report.success {
            return Verdict::Rejected(Rejection::SolverFailed(report.termination));
        }
        let metric = convergence_metric(measurement);
        if !(metric <= self.threshold_m) {
            return Verdict::Rejected(Rejection::ResidualAboveThreshold {
                metric,
                threshold: self.threshold_m,
            });
        }
        Verdict::Accepted { metric }
    }
}
