//! Closed-form starting states for the solver.
//!
//! Each bistatic range-sum locus is an ellipsoid with the illuminator and
//! sensor as foci; the midpoint of the foci is used as a position prior.

use crate::detection::{Detection, DetectionPair, DetectionTriple};
use crate::geodesy::{geodetic_to_enu, Geodetic};
use crate::math::vector::{midpoint, Vec3};

/// Lowest altitude used to seed the three-detection solver.
pub const MIN_GUESS_ALTITUDE_M: f64 = 1000.0;

/// Midpoint between the foci of a range-sum ellipse.
pub fn ellipse_center(illuminator: Vec3, sensor: Vec3) -> Vec3 {
    midpoint(illuminator, sensor)
}

fn projected_center(detection: &Detection, origin: &Geodetic) -> Vec3 {
    ellipse_center(
        geodetic_to_enu(&detection.illuminator_position(), origin),
        geodetic_to_enu(&detection.sensor_position(), origin),
    )
}

/// `[x, y, vx, vy]` in the pair's ENU frame with zero velocity.
pub fn pair_initial_guess(pair: &DetectionPair) -> [f64; 4] {
    let origin = pair.enu_origin();
    let [first, second] = pair.detections();
    let a = projected_center(first, &origin);
    let b = projected_center(second, &origin);

    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, 0.0, 0.0]
}

/// `[x, y, z, vx, vy, vz]` with zero velocity and `z` at least
/// [`MIN_GUESS_ALTITUDE_M`].
///
/// Centers are expressed in the frame of [`DetectionTriple::guess_origin`]
/// (the first sensor), not the centroid frame the residual model uses.
pub fn triple_initial_guess(triple: &DetectionTriple) -> [f64; 6] {
    let origin = triple.guess_origin();
    let centers: Vec<Vec3> = triple
        .detections()
        .iter()
        .map(|detection| projected_center(detection, &origin))
        .collect();
    let count = centers.len() as f64;
    let mean = |axis: usize| centers.iter().map(|c| c[axis]).sum::<f64>() / count;

    [
        mean(0),
        mean(1),
        mean(2).max(MIN_GUESS_ALTITUDE_M),
        0.0,
        0.0,
        0.0,
    ]
}
