pub mod compose;
pub mod convergence;
pub mod geometry;
pub mod guess;
pub mod model;
pub mod pipeline;
pub mod residual;
pub mod solver;

pub use compose::{Solution, SolutionComposer};
pub use convergence::{ConvergenceEvaluator, Rejection, Verdict};
pub use geometry::BistaticGeometry;
pub use model::{PairModel, TripleModel};
pub use pipeline::Estimator;
pub use solver::{LevenbergMarquardt, SolverConfig, SolverReport, StateBounds, Termination};
