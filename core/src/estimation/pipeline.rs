use crate::detection::{DetectionPair, DetectionSet, DetectionTriple};
use crate::estimation::compose::SolutionComposer;
use crate::estimation::convergence::{Rejection, Verdict};
use crate::estimation::guess::{pair_initial_guess, triple_initial_guess};
use crate::estimation::model::{PairModel, TripleModel};
use crate::estimation::solver::LevenbergMarquardt;
use crate::prelude::{EstimateResult, EstimatorConfig, Outcome};
use crate::telemetry::LogManager;

/// Runs guess, solve, acceptance and composition for one detection set.
pub struct Estimator {
    config: EstimatorConfig,
    logger: LogManager,
}

impl Estimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            logger: LogManager::new("estimator"),
        }
    }

    pub fn estimate(&self, set: &DetectionSet) -> EstimateResult<Outcome> {
        match set {
            DetectionSet::Pair(pair) => self.estimate_pair(pair),
            DetectionSet::Triple(triple) => self.estimate_triple(triple),
        }
    }

    pub fn estimate_pair(&self, pair: &DetectionPair) -> EstimateResult<Outcome> {
        self.solve_pair(pair, pair_initial_guess(pair))
    }

    pub fn estimate_triple(&self, triple: &DetectionTriple) -> EstimateResult<Outcome> {
        self.solve_triple(triple, triple_initial_guess(triple))
    }

    /// Solves from an explicit `[x, y, vx, vy]` start in the pair's ENU frame.
    pub fn solve_pair(&self, pair: &DetectionPair, initial: [f64; 4]) -> EstimateResult<Outcome> {
        let variant = &self.config.pair;
        let origin = pair.enu_origin();
        let model = PairModel::new(pair, &origin);

        let report = LevenbergMarquardt::new(variant.solver.clone()).minimize(&model, &initial)?;
        let measurement = model.measurement_residuals(&report.state);
        let verdict = variant.evaluator().evaluate(&report, &measurement);

        Ok(match verdict {
            Verdict::Accepted { metric } => {
                self.logger.record(&format!(
                    "pair solved in {} evaluations, max range residual {:.3} m",
                    report.nfev, metric
                ));
                let composer = SolutionComposer::new(origin, pair.timestamp());
                Outcome::Solved(composer.compose_pair(&report.state))
            }
            Verdict::Rejected(rejection) => self.reject("pair", rejection),
        })
    }

    /// Solves from an explicit `[x, y, z, vx, vy, vz]` start, read in the
    /// triple's centroid ENU frame.
    pub fn solve_triple(
        &self,
        triple: &DetectionTriple,
        initial: [f64; 6],
    ) -> EstimateResult<Outcome> {
        let variant = &self.config.triple;
        let origin = triple.enu_origin();
        let model = TripleModel::new(triple, &origin);

        let report = LevenbergMarquardt::new(variant.solver.clone()).minimize(&model, &initial)?;
        let measurement = model.measurement_residuals(&report.state);
        let verdict = variant.evaluator().evaluate(&report, &measurement);

        Ok(match verdict {
            Verdict::Accepted { metric } => {
                self.logger.record(&format!(
                    "triple solved in {} evaluations, max range residual {:.3} m",
                    report.nfev, metric
                ));
                let composer = SolutionComposer::new(origin, triple.timestamp());
                Outcome::Solved(composer.compose_triple(&report.state, &measurement, metric))
            }
            Verdict::Rejected(rejection) => self.reject("triple", rejection),
        })
    }

    /// Non-convergence is logged as a warning; a converged fit outside the
    /// threshold is an ordinary negative answer.
    fn reject(&self, variant: &str, rejection: Rejection) -> Outcome {
        let message = format!("{} rejected: {}", variant, rejection);
        match rejection {
            Rejection::SolverFailed(_) => self.logger.warn(&message),
            Rejection::ResidualAboveThreshold { .. } => self.logger.record(&message),
        }
        Outcome::NoSolution(rejection)
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::SetKind;
    use crate::estimation::solver::Termination;

    const PAIR_JSON: &str = r#"{
        "detection1": {"sensor_lat": 40.0, "sensor_lon": -74.0, "ioo_lat": 40.5, "ioo_lon": -73.5,
                       "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 100.0, "doppler_hz": -50.0},
        "detection2": {"sensor_lat": 41.0, "sensor_lon": -73.0, "ioo_lat": 40.5, "ioo_lon": -73.5,
                       "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 110.0, "doppler_hz": 30.0}
    }"#;

    const IMPOSSIBLE_PAIR_JSON: &str = r#"{
        "detection1": {"sensor_lat": 40.0, "sensor_lon": -74.0, "ioo_lat": 40.0, "ioo_lon": -74.0,
                       "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 0.1, "doppler_hz": -10000.0},
        "detection2": {"sensor_lat": 41.0, "sensor_lon": -73.0, "ioo_lat": 41.0, "ioo_lon": -73.0,
                       "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 0.1, "doppler_hz": 10000.0}
    }"#;

    #[test]
    fn pair_fixture_is_solved_at_fixed_altitude() {
        let set = DetectionSet::from_json(PAIR_JSON, SetKind::Auto).unwrap();
        let outcome = Estimator::default().estimate(&set).unwrap();
        let solution = outcome.solution().expect("pair should converge");
        assert_eq!(solution.timestamp, 1234567890);
        assert_eq!(solution.altitude, 5000.0);
        assert_eq!(solution.velocity_up, 0.0);
        assert!(solution.convergence_metric.is_none());
    }

    #[test]
    fn impossible_pair_yields_no_solution() {
        let set = DetectionSet::from_json(IMPOSSIBLE_PAIR_JSON, SetKind::Auto).unwrap();
        let outcome = Estimator::default().estimate(&set).unwrap();
        assert!(!outcome.is_solved());
        assert!(matches!(
            outcome,
            Outcome::NoSolution(Rejection::ResidualAboveThreshold { .. })
                | Outcome::NoSolution(Rejection::SolverFailed(_))
        ));
    }

    #[test]
    fn tightened_threshold_rejects_converged_pair() {
        let mut config = EstimatorConfig::default();
        config.pair.acceptance_threshold_m = -1.0;
        let set = DetectionSet::from_json(PAIR_JSON, SetKind::Pair).unwrap();
        let outcome = Estimator::new(config).estimate(&set).unwrap();
        assert!(!outcome.is_solved());
    }

    #[test]
    fn exhausted_evaluation_budget_reports_solver_failure() {
        let mut config = EstimatorConfig::default();
        config.pair.solver.max_nfev = 1;
        let set = DetectionSet::from_json(PAIR_JSON, SetKind::Pair).unwrap();
        let outcome = Estimator::new(config).estimate(&set).unwrap();
        assert!(matches!(
            outcome,
            Outcome::NoSolution(Rejection::SolverFailed(Termination::EvaluationLimit))
        ));
    }
}
