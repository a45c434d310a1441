//! Bistatic range-sum and Doppler measurement model.
//!
//! Residuals are `computed - measured`. Doppler is the direct-path minus
//! reflected-path frequency difference, so an approaching target yields a
//! negative value.

use crate::estimation::geometry::BistaticGeometry;
use crate::math::vector::{dist3d, dot, sub, unit, Vec3};

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
/// Fixed target altitude of the two-detection model.
pub const PAIR_ALTITUDE_M: f64 = 5000.0;
pub const MIN_ALTITUDE_M: f64 = 0.0;
pub const MAX_ALTITUDE_M: f64 = 30_000.0;
pub const ALTITUDE_PENALTY_WEIGHT: f64 = 0.1;
/// Substituted for the Doppler residual when the target coincides with a
/// focus and the line-of-sight direction is undefined.
pub const DEGENERATE_DOPPLER_RESIDUAL: f64 = 1e9;

/// Forward-modelled measurements for one detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub range_m: f64,
    /// `None` when the target coincides with the illuminator or sensor.
    pub doppler_hz: Option<f64>,
}

pub fn bistatic_range(target: Vec3, illuminator: Vec3, sensor: Vec3) -> f64 {
    dist3d(illuminator, target) + dist3d(target, sensor)
}

pub fn bistatic_doppler(
    target: Vec3,
    velocity: Vec3,
    illuminator: Vec3,
    sensor: Vec3,
    freq_hz: f64,
) -> Option<f64> {
    let toward_target = unit(sub(target, illuminator))?;
    let toward_sensor = unit(sub(sensor, target))?;
    let radial = dot(velocity, toward_target) + dot(velocity, toward_sensor);
    Some(freq_hz * (-radial / SPEED_OF_LIGHT))
}

pub fn predict(target: Vec3, velocity: Vec3, geometry: &BistaticGeometry) -> Prediction {
    Prediction {
        range_m: bistatic_range(target, geometry.illuminator, geometry.sensor),
        doppler_hz: bistatic_doppler(
            target,
            velocity,
            geometry.illuminator,
            geometry.sensor,
            geometry.freq_hz,
        ),
    }
}

pub fn range_residual(target: Vec3, geometry: &BistaticGeometry) -> f64 {
    bistatic_range(target, geometry.illuminator, geometry.sensor) - geometry.range_m
}

pub fn doppler_residual(target: Vec3, velocity: Vec3, geometry: &BistaticGeometry) -> f64 {
    match bistatic_doppler(
        target,
        velocity,
        geometry.illuminator,
        geometry.sensor,
        geometry.freq_hz,
    ) {
        Some(doppler) => doppler - geometry.doppler_hz,
        None => DEGENERATE_DOPPLER_RESIDUAL,
    }
}

/// Interleaved `[range₁, doppler₁, range₂, doppler₂, …]` residuals.
pub fn measurement_residuals(
    target: Vec3,
    velocity: Vec3,
    geometries: &[BistaticGeometry],
) -> Vec<f64> {
    let mut residuals = Vec::with_capacity(geometries.len() * 2);
    for geometry in geometries {
        residuals.push(range_residual(target, geometry));
        residuals.push(doppler_residual(target, velocity, geometry));
    }
    residuals
}

/// Soft-constraint entries for an altitude outside the admissible band;
/// empty when `z` is inside it.
pub fn altitude_penalties(z: f64) -> Vec<f64> {
    let mut penalties = Vec::new();
    if z < MIN_ALTITUDE_M {
        penalties.push((MIN_ALTITUDE_M - z) * ALTITUDE_PENALTY_WEIGHT);
    }
    if z > MAX_ALTITUDE_M {
        penalties.push((z - MAX_ALTITUDE_M) * ALTITUDE_PENALTY_WEIGHT);
    }
    penalties
}
