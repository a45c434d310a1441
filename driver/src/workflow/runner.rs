use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use bistaticcore::detection::DetectionSet;
use bistaticcore::prelude::Outcome;
use bistaticcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use bistaticcore::Estimator;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Wire message for a set that was solved but not accepted.
pub const NO_SOLUTION: &str = "No Solution";

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    estimator: Arc<Estimator>,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        let estimator = Estimator::new(config.to_estimator_config());
        Self {
            config,
            estimator: Arc::new(estimator),
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    /// Parses, validates and solves one detection-set document.
    pub fn execute(&self, json: &str) -> anyhow::Result<Outcome> {
        let result = DetectionSet::from_json(json, self.config.mode)
            .and_then(|set| {
                log::debug!("estimating {:?} set", set.kind());
                self.estimator.estimate(&set)
            });
        match result {
            Ok(outcome) => {
                self.metrics.record_outcome(&outcome);
                Ok(outcome)
            }
            Err(err) => {
                self.metrics.record_failure();
                Err(err.into())
            }
        }
    }

    pub fn solve_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<Outcome> {
        let path_ref = path.as_ref();
        let contents = match fs::read_to_string(path_ref) {
            Ok(contents) => contents,
            Err(err) => {
                self.metrics.record_failure();
                return Err(err)
                    .with_context(|| format!("reading detection file {}", path_ref.display()));
            }
        };
        self.execute(&contents)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Output object for a completed solve.
pub fn render_outcome(outcome: &Outcome) -> anyhow::Result<Value> {
    match outcome {
        Outcome::Solved(solution) => {
            serde_json::to_value(solution).context("serializing solution")
        }
        Outcome::NoSolution(_) => Ok(json!({ "error": NO_SOLUTION })),
    }
}

/// Output object for a failed request, carrying the full context chain.
pub fn render_error(err: &anyhow::Error) -> Value {
    json!({ "error": format!("{:#}", err) })
}
