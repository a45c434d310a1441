use crate::geodesy::Geodetic;
use crate::prelude::InvalidField;
use serde::{Deserialize, Serialize};

/// One simultaneous measurement from a single sensor/illuminator pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub sensor_lat: f64,
    pub sensor_lon: f64,
    pub ioo_lat: f64,
    pub ioo_lon: f64,
    pub freq_mhz: f64,
    /// Opaque epoch value, passed through to the output unchanged.
    pub timestamp: i64,
    pub bistatic_range_km: f64,
    pub doppler_hz: f64,
}

impl Detection {
    /// Checks the physical ranges of every field. Bounds are inclusive for
    /// coordinates and exclusive at zero for frequency and range.
    pub fn validate(&self) -> Result<(), InvalidField> {
        if !(-90.0..=90.0).contains(&self.sensor_lat) {
            return Err(InvalidField::SensorLatitude(self.sensor_lat));
        }
        if !(-180.0..=180.0).contains(&self.sensor_lon) {
            return Err(InvalidField::SensorLongitude(self.sensor_lon));
        }
        if !(-90.0..=90.0).contains(&self.ioo_lat) {
            return Err(InvalidField::IlluminatorLatitude(self.ioo_lat));
        }
        if !(-180.0..=180.0).contains(&self.ioo_lon) {
            return Err(InvalidField::IlluminatorLongitude(self.ioo_lon));
        }
        if !(self.freq_mhz > 0.0 && self.freq_mhz.is_finite()) {
            return Err(InvalidField::Frequency(self.freq_mhz));
        }
        if !(self.bistatic_range_km > 0.0 && self.bistatic_range_km.is_finite()) {
            return Err(InvalidField::BistaticRange(self.bistatic_range_km));
        }
        Ok(())
    }

    pub fn sensor_position(&self) -> Geodetic {
        Geodetic::new(self.sensor_lat, self.sensor_lon, 0.0)
    }

    pub fn illuminator_position(&self) -> Geodetic {
        Geodetic::new(self.ioo_lat, self.ioo_lon, 0.0)
    }

    pub fn range_m(&self) -> f64 {
        self.bistatic_range_km * 1000.0
    }

    pub fn freq_hz(&self) -> f64 {
        self.freq_mhz * 1e6
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::detection;
    use super::*;

    #[test]
    fn valid_detection_passes() {
        assert_eq!(detection().validate(), Ok(()));
    }

    #[test]
    fn latitude_bounds_are_inclusive() {
        for lat in [90.0, -90.0] {
            let det = Detection {
                sensor_lat: lat,
                ioo_lat: lat,
                ..detection()
            };
            assert!(det.validate().is_ok());
        }

        let det = Detection {
            sensor_lat: 100.0,
            ..detection()
        };
        assert_eq!(det.validate(), Err(InvalidField::SensorLatitude(100.0)));
    }

    #[test]
    fn longitude_bounds_are_inclusive() {
        let det = Detection {
            sensor_lon: 180.0,
            ioo_lon: -180.0,
            ..detection()
        };
        assert!(det.validate().is_ok());

        let det = Detection {
            ioo_lon: -180.5,
            ..detection()
        };
        assert_eq!(det.validate(), Err(InvalidField::IlluminatorLongitude(-180.5)));
    }

    #[test]
    fn illuminator_latitude_is_checked() {
        let det = Detection {
            ioo_lat: -91.0,
            ..detection()
        };
        assert_eq!(det.validate(), Err(InvalidField::IlluminatorLatitude(-91.0)));
    }

    #[test]
    fn non_positive_range_is_rejected() {
        for range in [-1.0, 0.0] {
            let det = Detection {
                bistatic_range_km: range,
                ..detection()
            };
            assert_eq!(det.validate(), Err(InvalidField::BistaticRange(range)));
        }
    }

    #[test]
    fn non_positive_frequency_is_rejected() {
        let det = Detection {
            freq_mhz: 0.0,
            ..detection()
        };
        assert_eq!(det.validate(), Err(InvalidField::Frequency(0.0)));
    }

    #[test]
    fn nan_coordinate_is_rejected() {
        let det = Detection {
            sensor_lon: f64::NAN,
            ..detection()
        };
        assert!(matches!(
            det.validate(),
            Err(InvalidField::SensorLongitude(_))
        ));
    }

    #[test]
    fn unit_conversions() {
        let det = detection();
        assert_eq!(det.range_m(), 100_000.0);
        assert_eq!(det.freq_hz(), 100_000_000.0);
        assert_eq!(det.sensor_position().alt_m, 0.0);
    }
}
