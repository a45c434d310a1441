use anyhow::Context;
use bistaticcore::detection::SetKind;
use bistaticcore::estimation::SolverConfig;
use bistaticcore::prelude::{EstimatorConfig, VariantConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Solver tolerances, acceptance thresholds and execution settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub mode: SetKind,
    pub ftol: f64,
    pub pair_xtol: f64,
    pub triple_xtol: f64,
    pub gtol: f64,
    pub max_nfev: usize,
    pub fd_relative_step: f64,
    pub pair_threshold_m: f64,
    pub triple_threshold_m: f64,
    /// Concurrent solves in batch mode.
    pub workers: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let pair = VariantConfig::pair();
        let triple = VariantConfig::triple();
        Self {
            mode: SetKind::Auto,
            ftol: pair.solver.ftol,
            pair_xtol: pair.solver.xtol,
            triple_xtol: triple.solver.xtol,
            gtol: pair.solver.gtol,
            max_nfev: pair.solver.max_nfev,
            fd_relative_step: pair.solver.fd_relative_step,
            pair_threshold_m: pair.acceptance_threshold_m,
            triple_threshold_m: triple.acceptance_threshold_m,
            workers: 4,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Applies command-line overrides on top of the loaded values.
    pub fn with_overrides(mut self, mode: Option<SetKind>, workers: Option<usize>) -> Self {
        if let Some(mode) = mode {
            self.mode = mode;
        }
        if let Some(workers) = workers {
            self.workers = workers;
        }
        self
    }

    pub fn to_estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            pair: VariantConfig {
                solver: self.solver_config(SolverConfig::unconstrained(), self.pair_xtol),
                acceptance_threshold_m: self.pair_threshold_m,
            },
            triple: VariantConfig {
                solver: self.solver_config(SolverConfig::bounded(), self.triple_xtol),
                acceptance_threshold_m: self.triple_threshold_m,
            },
        }
    }

    fn solver_config(&self, base: SolverConfig, xtol: f64) -> SolverConfig {
        SolverConfig {
            ftol: self.ftol,
            xtol,
            gtol: self.gtol,
            max_nfev: self.max_nfev,
            fd_relative_step: self.fd_relative_step,
            ..base
        }
    }
}
