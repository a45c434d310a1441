use crate::estimation::compose::Solution;
use crate::estimation::convergence::{
    ConvergenceEvaluator, Rejection, PAIR_THRESHOLD_M, TRIPLE_THRESHOLD_M,
};
use crate::estimation::solver::{SolverConfig, StateBounds};
use serde::{Deserialize, Serialize};

/// Solver and acceptance settings for one detection-set variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub solver: SolverConfig,
    /// Largest accepted absolute range residual, in meters.
    pub acceptance_threshold_m: f64,
}

impl VariantConfig {
    pub fn pair() -> Self {
        Self {
            solver: SolverConfig::unconstrained(),
            acceptance_threshold_m: PAIR_THRESHOLD_M,
        }
    }

    pub fn triple() -> Self {
        Self {
            solver: SolverConfig::bounded(),
            acceptance_threshold_m: TRIPLE_THRESHOLD_M,
        }
    }

    pub fn evaluator(&self) -> ConvergenceEvaluator {
        ConvergenceEvaluator::new(self.acceptance_threshold_m)
    }
}

/// Shared configuration for the estimation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub pair: VariantConfig,
    pub triple: VariantConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            pair: VariantConfig::pair(),
            triple: VariantConfig::triple(),
        }
    }
}

/// A detection field outside its physical range.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InvalidField {
    #[error("sensor_lat {0} outside [-90, 90]")]
    SensorLatitude(f64),
    #[error("sensor_lon {0} outside [-180, 180]")]
    SensorLongitude(f64),
    #[error("ioo_lat {0} outside [-90, 90]")]
    IlluminatorLatitude(f64),
    #[error("ioo_lon {0} outside [-180, 180]")]
    IlluminatorLongitude(f64),
    #[error("freq_mhz {0} must be positive")]
    Frequency(f64),
    #[error("bistatic_range_km {0} must be positive")]
    BistaticRange(f64),
}

/// Common error type for the estimation pipeline.
///
/// A solver run that fails to produce an acceptable fit is not an error; it
/// is reported as [`Outcome::NoSolution`].
#[derive(thiserror::Error, Debug)]
pub enum EstimateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("Detection {index} validation failed: {field}")]
    Validation { index: usize, field: InvalidField },
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type EstimateResult<T> = Result<T, EstimateError>;

/// Result of a pipeline run over a well-formed detection set.
#[derive(Debug, Clone)]
pub enum Outcome {
    Solved(Solution),
    NoSolution(Rejection),
}

impl Outcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Outcome::Solved(solution) => Some(solution),
            Outcome::NoSolution(_) => None,
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, Outcome::Solved(_))
    }
}

/// Residual model minimized by the nonlinear solver.
pub trait MeasurementModel {
    /// Length of the state vector.
    fn dimension(&self) -> usize;

    /// Full residual vector at `state`, including any penalty terms.
    fn residuals(&self, state: &[f64]) -> Vec<f64>;

    /// Box constraints on the state, if the model is bounded.
    fn bounds(&self) -> Option<&StateBounds> {
        None
    }
}
