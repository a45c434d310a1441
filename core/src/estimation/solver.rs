//! Damped Gauss-Newton (Levenberg-Marquardt) minimizer of `½‖r(x)‖²`.
//!
//! Each iteration builds a forward-difference Jacobian `J`, solves the
//! damped normal equations
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ))·h = -Jᵀr
//! ```
//!
//! and accepts the step when the cost drops, updating `λ` from the gain
//! ratio between actual and predicted reduction (Nielsen's rule). A rejected
//! step multiplies `λ` by a growing factor and the system is re-solved.
//!
//! When the model carries box bounds, components pinned at a bound whose
//! gradient points outward are frozen for the iteration, and a trial point
//! that leaves the box is either reflected off the violated bound or clipped
//! onto it, whichever the local quadratic model predicts to reduce the cost
//! more. Every evaluated state therefore lies inside the box.
//!
//! Termination: relative cost change below `ftol`, step below `xtol`, scaled
//! gradient below `gtol`, the `max_nfev` trial-evaluation cap, or a damping
//! factor that can no longer produce a descent step. Only the first three
//! report success.

use crate::math::{MatrixHelper, StatsHelper};
use crate::prelude::{EstimateError, EstimateResult, MeasurementModel};
use crate::telemetry::LogManager;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower limit on a Marquardt scaling entry so that columns with no
/// sensitivity still receive damping.
const DIAGONAL_FLOOR: f64 = 1e-12;
const MIN_DAMPING: f64 = 1e-15;
const MAX_DAMPING: f64 = 1e32;

/// Iteration settings of [`LevenbergMarquardt`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Cap on residual evaluations at trial points.
    pub max_nfev: usize,
    pub initial_damping: f64,
    /// Forward-difference step relative to `max(1, |xᵢ|)`.
    pub fd_relative_step: f64,
}

impl SolverConfig {
    pub fn unconstrained() -> Self {
        Self {
            ftol: 1e-6,
            xtol: 1e-8,
            gtol: 1e-8,
            max_nfev: 1000,
            initial_damping: 1e-3,
            fd_relative_step: 1e-7,
        }
    }

    pub fn bounded() -> Self {
        Self {
            xtol: 1e-6,
            ..Self::unconstrained()
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::unconstrained()
    }
}

/// Inclusive per-component box on the state vector.
#[derive(Debug, Clone, PartialEq)]
pub struct StateBounds {
    pub(crate) lower: Vec<f64>,
    pub(crate) upper: Vec<f64>,
}

impl StateBounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> EstimateResult<Self> {
        if lower.len() != upper.len() {
            return Err(EstimateError::Internal(format!(
                "bounds have {} lower and {} upper entries",
                lower.len(),
                upper.len()
            )));
        }
        for (index, (lo, hi)) in lower.iter().zip(&upper).enumerate() {
            if !(lo <= hi) {
                return Err(EstimateError::Internal(format!(
                    "bound {} is empty: [{}, {}]",
                    index, lo, hi
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    pub fn contains(&self, state: &[f64]) -> bool {
        state.len() == self.dimension()
            && state
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(v, (lo, hi))| *lo <= *v && *v <= *hi)
    }

    /// Projects every component onto its interval.
    pub fn clip(&self, state: &mut [f64]) {
        for (value, (lo, hi)) in state.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            *value = value.clamp(*lo, *hi);
        }
    }

    /// Mirrors each out-of-range component about the violated bound, then
    /// clips whatever still overshoots the opposite bound.
    pub fn reflect(&self, state: &mut [f64]) {
        for (value, (lo, hi)) in state.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            if *value < *lo {
                *value = 2.0 * lo - *value;
            } else if *value > *hi {
                *value = 2.0 * hi - *value;
            }
            *value = value.clamp(*lo, *hi);
        }
    }
}

/// Why the iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    FunctionTolerance,
    StepTolerance,
    GradientTolerance,
    EvaluationLimit,
    Stalled,
    NonFiniteResidual,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Termination::FunctionTolerance
                | Termination::StepTolerance
                | Termination::GradientTolerance
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Termination::FunctionTolerance => "cost reduction below ftol",
            Termination::StepTolerance => "step size below xtol",
            Termination::GradientTolerance => "scaled gradient below gtol",
            Termination::EvaluationLimit => "evaluation limit reached",
            Termination::Stalled => "no descent step found",
            Termination::NonFiniteResidual => "residual is not finite",
        };
        f.write_str(text)
    }
}

/// Final state of a solver run.
#[derive(Debug, Clone)]
pub struct SolverReport {
    pub success: bool,
    pub termination: Termination,
    pub state: Vec<f64>,
    /// Full residual vector at `state`, penalty terms included.
    pub residuals: Vec<f64>,
    pub cost: f64,
    pub iterations: usize,
    pub nfev: usize,
    pub njev: usize,
}

pub struct LevenbergMarquardt {
    config: SolverConfig,
    logger: LogManager,
}

impl LevenbergMarquardt {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            logger: LogManager::new("solver"),
        }
    }

    pub fn minimize<M>(&self, model: &M, initial: &[f64]) -> EstimateResult<SolverReport>
    where
        M: MeasurementModel + ?Sized,
    {
        let dimension = model.dimension();
        if initial.len() != dimension {
            return Err(EstimateError::Internal(format!(
                "initial state has {} components, model expects {}",
                initial.len(),
                dimension
            )));
        }
        let bounds = model.bounds();
        if let Some(bounds) = bounds {
            if bounds.dimension() != dimension {
                return Err(EstimateError::Internal(format!(
                    "bounds have {} components, model expects {}",
                    bounds.dimension(),
                    dimension
                )));
            }
        }

        let config = &self.config;
        let mut state = initial.to_vec();
        if let Some(bounds) = bounds {
            bounds.clip(&mut state);
        }

        let mut residuals = model.residuals(&state);
        let mut nfev = 1;
        let mut njev = 0;
        let mut iterations = 0;

        if !all_finite(&residuals) {
            return Ok(self.finish(
                Termination::NonFiniteResidual,
                state,
                residuals,
                f64::INFINITY,
                iterations,
                nfev,
                njev,
            ));
        }

        let mut cost = 0.5 * StatsHelper::sum_squares(&residuals);
        let mut damping = config.initial_damping.max(MIN_DAMPING);
        let mut growth = 2.0;

        let termination = 'outer: loop {
            if cost == 0.0 {
                break Termination::GradientTolerance;
            }
            if nfev >= config.max_nfev {
                break Termination::EvaluationLimit;
            }

            let jacobian = self.jacobian(model, &state, &residuals, bounds)?;
            njev += 1;
            iterations += 1;

            let gradient = MatrixHelper::transpose_mul(jacobian.view(), ArrayView1::from(&residuals[..]));
            let normal = MatrixHelper::gram(jacobian.view());
            let free = free_components(&state, &gradient, bounds);

            let scaled_gradient = scaled_gradient_norm(&normal, &gradient, &free, cost);
            self.logger.detail(format_args!(
                "iteration {} cost {:.6e} scaled gradient {:.3e} damping {:.3e}",
                iterations, cost, scaled_gradient, damping
            ));
            if scaled_gradient <= config.gtol {
                break Termination::GradientTolerance;
            }

            loop {
                let step = match damped_step(&normal, &gradient, &free, damping) {
                    Some(step) => step,
                    None => {
                        damping *= growth;
                        growth *= 2.0;
                        if damping > MAX_DAMPING {
                            break 'outer Termination::Stalled;
                        }
                        continue;
                    }
                };

                let candidate = select_candidate(&state, &step, &gradient, &normal, bounds);
                let effective: Array1<f64> = candidate
                    .iter()
                    .zip(&state)
                    .map(|(next, current)| next - current)
                    .collect();
                let step_norm = effective.dot(&effective).sqrt();
                let state_norm = StatsHelper::sum_squares(&state).sqrt();

                let trial = model.residuals(&candidate);
                nfev += 1;
                if trial.len() != residuals.len() {
                    return Err(EstimateError::Internal(format!(
                        "residual length changed from {} to {}",
                        residuals.len(),
                        trial.len()
                    )));
                }
                let trial_cost = if all_finite(&trial) {
                    0.5 * StatsHelper::sum_squares(&trial)
                } else {
                    f64::INFINITY
                };

                let predicted = predicted_reduction(&effective, &gradient, &normal);
                let actual = cost - trial_cost;

                if actual > 0.0 && predicted > 0.0 {
                    let ratio = actual / predicted;
                    damping *= (1.0_f64 / 3.0).max(1.0 - (2.0 * ratio - 1.0).powi(3));
                    damping = damping.max(MIN_DAMPING);
                    growth = 2.0;

                    let previous = cost;
                    state = candidate;
                    residuals = trial;
                    cost = trial_cost;

                    if actual <= config.ftol * previous && predicted <= config.ftol * previous {
                        break 'outer Termination::FunctionTolerance;
                    }
                    if step_norm <= config.xtol * (config.xtol + state_norm) {
                        break 'outer Termination::StepTolerance;
                    }
                    if nfev >= config.max_nfev {
                        break 'outer Termination::EvaluationLimit;
                    }
                    continue 'outer;
                }

                damping *= growth;
                growth *= 2.0;
                if step_norm <= config.xtol * (config.xtol + state_norm) {
                    break 'outer Termination::StepTolerance;
                }
                if damping > MAX_DAMPING {
                    break 'outer Termination::Stalled;
                }
                if nfev >= config.max_nfev {
                    break 'outer Termination::EvaluationLimit;
                }
            }
        };

        Ok(self.finish(termination, state, residuals, cost, iterations, nfev, njev))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        termination: Termination,
        state: Vec<f64>,
        residuals: Vec<f64>,
        cost: f64,
        iterations: usize,
        nfev: usize,
        njev: usize,
    ) -> SolverReport {
        self.logger.detail(format_args!(
            "terminated after {} iterations ({} evaluations): {}",
            iterations, nfev, termination
        ));
        SolverReport {
            success: termination.is_converged(),
            termination,
            state,
            residuals,
            cost,
            iterations,
            nfev,
            njev,
        }
    }

    /// Forward differences; the step flips backward where a forward step
    /// would leave the box.
    fn jacobian<M>(
        &self,
        model: &M,
        state: &[f64],
        residuals: &[f64],
        bounds: Option<&StateBounds>,
    ) -> EstimateResult<Array2<f64>>
    where
        M: MeasurementModel + ?Sized,
    {
        let rows = residuals.len();
        let mut jacobian = Array2::<f64>::zeros((rows, state.len()));
        let mut perturbed = state.to_vec();

        for column in 0..state.len() {
            let mut step = self.config.fd_relative_step * state[column].abs().max(1.0);
            if let Some(bounds) = bounds {
                if state[column] + step > bounds.upper[column] {
                    step = -step;
                }
            }
            perturbed[column] = state[column] + step;
            let actual_step = perturbed[column] - state[column];
            let shifted = model.residuals(&perturbed);
            perturbed[column] = state[column];

            if shifted.len() != rows {
                return Err(EstimateError::Internal(format!(
                    "residual length changed from {} to {} while differencing component {}",
                    rows,
                    shifted.len(),
                    column
                )));
            }
            for row in 0..rows {
                jacobian[(row, column)] = (shifted[row] - residuals[row]) / actual_step;
            }
        }

        Ok(jacobian)
    }
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Components free to move this iteration; a component sitting on a bound
/// with the descent direction pointing out of the box is frozen.
fn free_components(state: &[f64], gradient: &Array1<f64>, bounds: Option<&StateBounds>) -> Vec<bool> {
    match bounds {
        None => vec![true; state.len()],
        Some(bounds) => state
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let pinned_low = value <= bounds.lower[i] && gradient[i] > 0.0;
                let pinned_high = value >= bounds.upper[i] && gradient[i] < 0.0;
                !(pinned_low || pinned_high)
            })
            .collect(),
    }
}

/// Largest cosine between the residual vector and a free Jacobian column.
fn scaled_gradient_norm(normal: &Array2<f64>, gradient: &Array1<f64>, free: &[bool], cost: f64) -> f64 {
    let residual_norm = (2.0 * cost).sqrt();
    let mut largest = 0.0_f64;
    for (i, &is_free) in free.iter().enumerate() {
        let column_norm = normal[(i, i)].sqrt();
        if !is_free || column_norm == 0.0 {
            continue;
        }
        let cosine = gradient[i].abs() / (column_norm * residual_norm);
        if cosine.is_nan() {
            return f64::NAN;
        }
        largest = largest.max(cosine);
    }
    largest
}

fn damped_step(
    normal: &Array2<f64>,
    gradient: &Array1<f64>,
    free: &[bool],
    damping: f64,
) -> Option<Array1<f64>> {
    let n = gradient.len();
    let mut system = Array2::<f64>::zeros((n, n));
    let mut rhs = Array1::<f64>::zeros(n);

    for i in 0..n {
        if !free[i] {
            system[(i, i)] = 1.0;
            continue;
        }
        rhs[i] = -gradient[i];
        for j in 0..n {
            if free[j] {
                system[(i, j)] = normal[(i, j)];
            }
        }
        system[(i, i)] += damping * normal[(i, i)].max(DIAGONAL_FLOOR);
    }

    MatrixHelper::solve_cholesky(system.view(), rhs.view())
}

/// Reduction of `½‖r‖²` predicted by the undamped quadratic model.
fn predicted_reduction(step: &Array1<f64>, gradient: &Array1<f64>, normal: &Array2<f64>) -> f64 {
    -(step.dot(gradient) + 0.5 * MatrixHelper::quadratic_form(normal.view(), step.view()))
}

fn select_candidate(
    state: &[f64],
    step: &Array1<f64>,
    gradient: &Array1<f64>,
    normal: &Array2<f64>,
    bounds: Option<&StateBounds>,
) -> Vec<f64> {
    let raw: Vec<f64> = state.iter().zip(step.iter()).map(|(x, h)| x + h).collect();
    let bounds = match bounds {
        Some(bounds) if !bounds.contains(&raw) => bounds,
        _ => return raw,
    };

    let mut reflected = raw.clone();
    bounds.reflect(&mut reflected);
    let mut clipped = raw;
    bounds.clip(&mut clipped);

    let gain = |candidate: &[f64]| {
        let offset: Array1<f64> = candidate.iter().zip(state).map(|(c, x)| c - x).collect();
        predicted_reduction(&offset, gradient, normal)
    };
    if gain(&reflected) >= gain(&clipped) {
        reflected
    } else {
        clipped
    }
}
