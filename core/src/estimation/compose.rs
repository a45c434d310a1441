use crate::estimation::residual::PAIR_ALTITUDE_M;
use crate::geodesy::{enu_to_geodetic, Geodetic};
use crate::math::vector::Vec3;
use serde::{Deserialize, Serialize};

/// Accepted target state: geodetic position and ENU velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub velocity_east: f64,
    pub velocity_north: f64,
    pub velocity_up: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence_metric: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residuals: Option<Vec<f64>>,
}

/// Maps solved ENU states back to output form for one detection set.
#[derive(Debug, Clone, Copy)]
pub struct SolutionComposer {
    origin: Geodetic,
    timestamp: i64,
}

impl SolutionComposer {
    pub fn new(origin: Geodetic, timestamp: i64) -> Self {
        Self { origin, timestamp }
    }

    /// `state` is `[x, y, vx, vy]`; altitude is reported as the fixed pair
    /// altitude and vertical velocity as zero.
    pub fn compose_pair(&self, state: &[f64]) -> Solution {
        let position = enu_to_geodetic([state[0], state[1], PAIR_ALTITUDE_M], &self.origin);
        self.build(position, PAIR_ALTITUDE_M, [state[2], state[3], 0.0])
    }

    /// `state` is `[x, y, z, vx, vy, vz]`; `measurement` is the penalty-free
    /// residual vector at `state`.
    pub fn compose_triple(&self, state: &[f64], measurement: &[f64], metric: f64) -> Solution {
        let position = enu_to_geodetic([state[0], state[1], state[2]], &self.origin);
        Solution {
            convergence_metric: Some(metric),
            residuals: Some(measurement.to_vec()),
            ..self.build(position, state[2], [state[3], state[4], state[5]])
        }
    }

    fn build(&self, position: Geodetic, altitude: f64, velocity: Vec3) -> Solution {
        Solution {
            timestamp: self.timestamp,
            latitude: position.lat_deg,
            longitude: position.lon_deg,
            altitude,
            velocity_east: velocity[0],
            velocity_north: velocity[1],
            velocity_up: velocity[2],
            convergence_metric: None,
            residuals: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_reports_fixed_altitude_and_zero_climb() {
        let origin = Geodetic::new(41.0, -73.0, 0.0);
        let solution = SolutionComposer::new(origin, 42).compose_pair(&[0.0, 0.0, 12.0, -3.0]);
        assert_eq!(solution.timestamp, 42);
        assert_eq!(solution.altitude, PAIR_ALTITUDE_M);
        assert_eq!(solution.velocity_up, 0.0);
        assert_eq!((solution.velocity_east, solution.velocity_north), (12.0, -3.0));
        assert!((solution.latitude - 41.0).abs() < 1e-3);
        assert!((solution.longitude + 73.0).abs() < 1e-9);
        assert!(solution.residuals.is_none());
    }

    #[test]
    fn triple_surfaces_residuals_and_metric() {
        let origin = Geodetic::new(40.7, -74.0, 0.0);
        let residuals = [1.5, 0.1, -2.0, 0.2, 0.5, -0.3];
        let solution = SolutionComposer::new(origin, 7).compose_triple(
            &[1000.0, 2000.0, 6000.0, 100.0, 50.0, -4.0],
            &residuals,
            2.0,
        );
        assert_eq!(solution.altitude, 6000.0);
        assert_eq!(solution.velocity_up, -4.0);
        assert_eq!(solution.convergence_metric, Some(2.0));
        assert_eq!(solution.residuals.as_deref(), Some(&residuals[..]));
        assert!(solution.latitude > 40.7 && solution.longitude > -74.0);
    }

    #[test]
    fn pair_json_omits_triple_fields() {
        let solution = SolutionComposer::new(Geodetic::new(0.0, 0.0, 0.0), 1).compose_pair(&[0.0; 4]);
        let value = serde_json::to_value(&solution).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 7);
        assert!(!object.contains_key("residuals"));
        assert!(!object.contains_key("convergence_metric"));
    }
}
