use crate::detection::Detection;
use crate::geodesy::{geodetic_to_enu, Geodetic};
use crate::math::vector::Vec3;

/// One detection projected into a local ENU frame, with its measurements
/// converted to SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BistaticGeometry {
    pub illuminator: Vec3,
    pub sensor: Vec3,
    pub range_m: f64,
    pub freq_hz: f64,
    pub doppler_hz: f64,
}

impl BistaticGeometry {
    pub fn project(detection: &Detection, origin: &Geodetic) -> Self {
        Self {
            illuminator: geodetic_to_enu(&detection.illuminator_position(), origin),
            sensor: geodetic_to_enu(&detection.sensor_position(), origin),
            range_m: detection.range_m(),
            freq_hz: detection.freq_hz(),
            doppler_hz: detection.doppler_hz,
        }
    }

    /// Same foci and frequency with replaced measurements.
    pub fn with_measurements(self, range_m: f64, doppler_hz: f64) -> Self {
        Self {
            range_m,
            doppler_hz,
            ..self
        }
    }
}
