use crate::detection::{DetectionPair, DetectionTriple};
use crate::estimation::geometry::BistaticGeometry;
use crate::estimation::residual::{
    altitude_penalties, measurement_residuals, MAX_ALTITUDE_M, MIN_ALTITUDE_M, PAIR_ALTITUDE_M,
};
use crate::estimation::solver::StateBounds;
use crate::geodesy::Geodetic;
use crate::math::vector::Vec3;
use crate::prelude::MeasurementModel;

/// Two-detection model over `(x, y, vx, vy)` with altitude pinned at
/// [`PAIR_ALTITUDE_M`] and no vertical velocity.
#[derive(Debug, Clone)]
pub struct PairModel {
    geometry: [BistaticGeometry; 2],
}

impl PairModel {
    pub const DIMENSION: usize = 4;

    pub fn new(pair: &DetectionPair, origin: &Geodetic) -> Self {
        let [first, second] = pair.detections();
        Self::from_geometry([
            BistaticGeometry::project(first, origin),
            BistaticGeometry::project(second, origin),
        ])
    }

    pub fn from_geometry(geometry: [BistaticGeometry; 2]) -> Self {
        Self { geometry }
    }

    pub fn target_position(state: &[f64]) -> Vec3 {
        [state[0], state[1], PAIR_ALTITUDE_M]
    }

    pub fn target_velocity(state: &[f64]) -> Vec3 {
        [state[2], state[3], 0.0]
    }

    pub fn measurement_residuals(&self, state: &[f64]) -> Vec<f64> {
        measurement_residuals(
            Self::target_position(state),
            Self::target_velocity(state),
            &self.geometry,
        )
    }
}

impl MeasurementModel for PairModel {
    fn dimension(&self) -> usize {
        Self::DIMENSION
    }

    fn residuals(&self, state: &[f64]) -> Vec<f64> {
        self.measurement_residuals(state)
    }
}

/// Three-detection model over `(x, y, z, vx, vy, vz)`, box-bounded, with
/// soft altitude penalties appended outside `[0, 30000]` m.
#[derive(Debug, Clone)]
pub struct TripleModel {
    geometry: [BistaticGeometry; 3],
    bounds: StateBounds,
}

impl TripleModel {
    pub const DIMENSION: usize = 6;

    pub fn new(triple: &DetectionTriple, origin: &Geodetic) -> Self {
        let [first, second, third] = triple.detections();
        Self::from_geometry([
            BistaticGeometry::project(first, origin),
            BistaticGeometry::project(second, origin),
            BistaticGeometry::project(third, origin),
        ])
    }

    pub fn from_geometry(geometry: [BistaticGeometry; 3]) -> Self {
        Self {
            geometry,
            bounds: Self::default_bounds(),
        }
    }

    /// `x, y ∈ [-1e6, 1e6]` m, `z ∈ [0, 30000]` m, `vx, vy ∈ [-1000, 1000]`
    /// m/s, `vz ∈ [-200, 200]` m/s.
    pub fn default_bounds() -> StateBounds {
        StateBounds {
            lower: vec![-1e6, -1e6, MIN_ALTITUDE_M, -1000.0, -1000.0, -200.0],
            upper: vec![1e6, 1e6, MAX_ALTITUDE_M, 1000.0, 1000.0, 200.0],
        }
    }

    pub fn target_position(state: &[f64]) -> Vec3 {
        [state[0], state[1], state[2]]
    }

    pub fn target_velocity(state: &[f64]) -> Vec3 {
        [state[3], state[4], state[5]]
    }

    /// Range and Doppler residuals only, without altitude penalties.
    pub fn measurement_residuals(&self, state: &[f64]) -> Vec<f64> {
        measurement_residuals(
            Self::target_position(state),
            Self::target_velocity(state),
            &self.geometry,
        )
    }
}

impl MeasurementModel for TripleModel {
    fn dimension(&self) -> usize {
        Self::DIMENSION
    }

    fn residuals(&self, state: &[f64]) -> Vec<f64> {
        let mut residuals = self.measurement_residuals(state);
        residuals.extend(altitude_penalties(state[2]));
        residuals
    }

    fn bounds(&self) -> Option<&StateBounds> {
        Some(&self.bounds)
    }
}
