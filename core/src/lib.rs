//! Target-state estimation for passive bistatic radar.
//!
//! A snapshot of two or three detections, each a bistatic range-sum and
//! Doppler measurement from one sensor/illuminator pair, is solved for the
//! position and velocity of a single target by damped Gauss-Newton
//! iteration in a local East-North-Up frame.

pub mod detection;
pub mod estimation;
pub mod geodesy;
pub mod math;
pub mod prelude;
pub mod telemetry;

pub use detection::{Detection, DetectionDocument, DetectionSet, SetKind};
pub use estimation::{Estimator, Solution};
pub use prelude::{EstimateError, EstimateResult, EstimatorConfig, MeasurementModel, Outcome};
