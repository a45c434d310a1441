use crate::detection::record::Detection;
use crate::geodesy::Geodetic;
use crate::prelude::{EstimateError, EstimateResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// JSON wire schema for one request. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionDocument {
    pub detection1: Detection,
    pub detection2: Detection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection3: Option<Detection>,
}

/// Two-detection schema; a `detection3` key, well-formed or not, is ignored.
#[derive(Deserialize)]
struct PairDocument {
    detection1: Detection,
    detection2: Detection,
}

/// Which detection-set variant a request is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetKind {
    /// Triple when `detection3` is present, otherwise Pair.
    #[default]
    Auto,
    Pair,
    Triple,
}

impl FromStr for SetKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Ok(SetKind::Auto),
            "pair" => Ok(SetKind::Pair),
            "triple" => Ok(SetKind::Triple),
            other => Err(format!(
                "unknown detection set kind `{}` (expected auto, pair or triple)",
                other
            )),
        }
    }
}

impl fmt::Display for SetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetKind::Auto => "auto",
            SetKind::Pair => "pair",
            SetKind::Triple => "triple",
        };
        f.write_str(name)
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(json: &str) -> EstimateResult<T> {
    serde_json::from_str(json).map_err(|err| EstimateError::InvalidInput(err.to_string()))
}

fn validate_all(detections: &[&Detection]) -> EstimateResult<()> {
    for (offset, detection) in detections.iter().enumerate() {
        detection
            .validate()
            .map_err(|field| EstimateError::Validation {
                index: offset + 1,
                field,
            })?;
    }
    Ok(())
}

fn mean_sensor_origin(detections: &[Detection]) -> Geodetic {
    let count = detections.len() as f64;
    let lat = detections.iter().map(|d| d.sensor_lat).sum::<f64>() / count;
    let lon = detections.iter().map(|d| d.sensor_lon).sum::<f64>() / count;
    Geodetic::new(lat, lon, 0.0)
}

/// Two validated, simultaneous detections.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionPair {
    detections: [Detection; 2],
}

impl DetectionPair {
    pub fn new(detection1: Detection, detection2: Detection) -> EstimateResult<Self> {
        validate_all(&[&detection1, &detection2])?;
        Ok(Self {
            detections: [detection1, detection2],
        })
    }

    pub fn from_json(json: &str) -> EstimateResult<Self> {
        let document: PairDocument = parse_json(json)?;
        Self::new(document.detection1, document.detection2)
    }

    pub fn detections(&self) -> &[Detection; 2] {
        &self.detections
    }

    /// Midpoint of the two sensors at sea level.
    pub fn enu_origin(&self) -> Geodetic {
        mean_sensor_origin(&self.detections)
    }

    pub fn timestamp(&self) -> i64 {
        self.detections[0].timestamp
    }
}

/// Three validated, simultaneous detections.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionTriple {
    detections: [Detection; 3],
}

impl DetectionTriple {
    pub fn new(
        detection1: Detection,
        detection2: Detection,
        detection3: Detection,
    ) -> EstimateResult<Self> {
        validate_all(&[&detection1, &detection2, &detection3])?;
        Ok(Self {
            detections: [detection1, detection2, detection3],
        })
    }

    pub fn from_json(json: &str) -> EstimateResult<Self> {
        let document: DetectionDocument = parse_json(json)?;
        Self::from_document(document)
    }

    fn from_document(document: DetectionDocument) -> EstimateResult<Self> {
        let detection3 = document.detection3.ok_or_else(|| {
            EstimateError::InvalidInput("missing field `detection3`".to_string())
        })?;
        Self::new(document.detection1, document.detection2, detection3)
    }

    pub fn detections(&self) -> &[Detection; 3] {
        &self.detections
    }

    /// Centroid of the three sensors at sea level. Frames the residual
    /// model and the reported solution.
    pub fn enu_origin(&self) -> Geodetic {
        mean_sensor_origin(&self.detections)
    }

    /// First sensor at sea level. Frames only the initial guess; this
    /// differs from [`DetectionTriple::enu_origin`] on purpose.
    pub fn guess_origin(&self) -> Geodetic {
        self.detections[0].sensor_position()
    }

    pub fn timestamp(&self) -> i64 {
        self.detections[0].timestamp
    }
}

/// A validated detection set of either variant.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionSet {
    Pair(DetectionPair),
    Triple(DetectionTriple),
}

impl DetectionSet {
    pub fn from_json(json: &str, kind: SetKind) -> EstimateResult<Self> {
        match kind {
            SetKind::Pair => Ok(DetectionSet::Pair(DetectionPair::from_json(json)?)),
            SetKind::Triple | SetKind::Auto => {
                let document: DetectionDocument = parse_json(json)?;
                Self::from_document(document, kind)
            }
        }
    }

    pub fn from_document(document: DetectionDocument, kind: SetKind) -> EstimateResult<Self> {
        let triple = match kind {
            SetKind::Pair => false,
            SetKind::Triple => true,
            SetKind::Auto => document.detection3.is_some(),
        };

        if triple {
            Ok(DetectionSet::Triple(DetectionTriple::from_document(
                document,
            )?))
        } else {
            Ok(DetectionSet::Pair(DetectionPair::new(
                document.detection1,
                document.detection2,
            )?))
        }
    }

    pub fn to_document(&self) -> DetectionDocument {
        match self {
            DetectionSet::Pair(pair) => {
                let [first, second] = pair.detections().clone();
                DetectionDocument {
                    detection1: first,
                    detection2: second,
                    detection3: None,
                }
            }
            DetectionSet::Triple(triple) => {
                let [first, second, third] = triple.detections().clone();
                DetectionDocument {
                    detection1: first,
                    detection2: second,
                    detection3: Some(third),
                }
            }
        }
    }

    pub fn kind(&self) -> SetKind {
        match self {
            DetectionSet::Pair(_) => SetKind::Pair,
            DetectionSet::Triple(_) => SetKind::Triple,
        }
    }

    pub fn enu_origin(&self) -> Geodetic {
        match self {
            DetectionSet::Pair(pair) => pair.enu_origin(),
            DetectionSet::Triple(triple) => triple.enu_origin(),
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            DetectionSet::Pair(pair) => pair.timestamp(),
            DetectionSet::Triple(triple) => triple.timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::record::fixtures::detection;
    use crate::prelude::InvalidField;

    const PAIR_JSON: &str = r#"{
        "detection1": {"sensor_lat": 40.0, "sensor_lon": -74.0, "ioo_lat": 40.5, "ioo_lon": -73.5,
                       "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 100.0, "doppler_hz": -50.0},
        "detection2": {"sensor_lat": 42.0, "sensor_lon": -72.0, "ioo_lat": 40.5, "ioo_lon": -73.5,
                       "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 110.0, "doppler_hz": 30.0}
    }"#;

    fn with_third(json: &str) -> String {
        let third = r#", "detection3": {"sensor_lat": 41.0, "sensor_lon": -73.0, "ioo_lat": 40.5, "ioo_lon": -73.5,
                       "freq_mhz": 100.0, "timestamp": 1234567890, "bistatic_range_km": 90.0, "doppler_hz": 10.0}}"#;
        let trimmed = json.trim_end();
        format!("{}{}", &trimmed[..trimmed.len() - 1], third)
    }

    #[test]
    fn pair_origin_is_sensor_midpoint() {
        let pair = DetectionPair::from_json(PAIR_JSON).unwrap();
        assert_eq!(pair.enu_origin(), Geodetic::new(41.0, -73.0, 0.0));
        assert_eq!(pair.timestamp(), 1_234_567_890);
    }

    #[test]
    fn triple_exposes_both_origins() {
        let triple = DetectionTriple::from_json(&with_third(PAIR_JSON)).unwrap();
        let origin = triple.enu_origin();
        assert!((origin.lat_deg - 41.0).abs() < 1e-12);
        assert!((origin.lon_deg + 73.0).abs() < 1e-12);
        assert_eq!(triple.guess_origin(), Geodetic::new(40.0, -74.0, 0.0));
    }

    #[test]
    fn auto_kind_follows_detection3() {
        let pair = DetectionSet::from_json(PAIR_JSON, SetKind::Auto).unwrap();
        assert_eq!(pair.kind(), SetKind::Pair);

        let triple = DetectionSet::from_json(&with_third(PAIR_JSON), SetKind::Auto).unwrap();
        assert_eq!(triple.kind(), SetKind::Triple);
    }

    #[test]
    fn pair_kind_ignores_detection3() {
        let json = with_third(PAIR_JSON).replace("\"bistatic_range_km\": 90.0", "\"range\": 1");
        let set = DetectionSet::from_json(&json, SetKind::Pair).unwrap();
        assert_eq!(set.kind(), SetKind::Pair);
    }

    #[test]
    fn triple_kind_requires_detection3() {
        let err = DetectionSet::from_json(PAIR_JSON, SetKind::Triple).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidInput(ref msg) if msg.contains("detection3")));
    }

    #[test]
    fn malformed_json_is_input_error() {
        let err = DetectionSet::from_json("{ invalid json", SetKind::Auto).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidInput(_)));
    }

    #[test]
    fn missing_field_is_input_error() {
        let json = PAIR_JSON.replace("\"doppler_hz\": 30.0", "\"doppler\": 30.0");
        let err = DetectionSet::from_json(&json, SetKind::Auto).unwrap_err();
        match err {
            EstimateError::InvalidInput(message) => assert!(message.contains("doppler_hz")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn validation_error_names_detection() {
        let json = PAIR_JSON.replace("\"sensor_lat\": 42.0", "\"sensor_lat\": 100.0");
        let err = DetectionSet::from_json(&json, SetKind::Auto).unwrap_err();
        match err {
            EstimateError::Validation { index, field } => {
                assert_eq!(index, 2);
                assert_eq!(field, InvalidField::SensorLatitude(100.0));
            }
            other => panic!("unexpected error {:?}", other),
        }
        let message = DetectionSet::from_json(&json, SetKind::Auto)
            .unwrap_err()
            .to_string();
        assert!(message.starts_with("Detection 2 validation failed"));
    }

    #[test]
    fn document_round_trip_preserves_detections() {
        let first = detection();
        let second = Detection {
            sensor_lat: 42.0,
            ..detection()
        };
        let set = DetectionSet::Pair(DetectionPair::new(first.clone(), second.clone()).unwrap());
        let document = set.to_document();
        assert_eq!(document.detection1, first);
        assert!(document.detection3.is_none());

        let json = serde_json::to_string(&document).unwrap();
        assert!(!json.contains("detection3"));
        assert_eq!(DetectionSet::from_json(&json, SetKind::Auto).unwrap(), set);
    }

    #[test]
    fn set_kind_parses_case_insensitively() {
        assert_eq!("Triple".parse::<SetKind>().unwrap(), SetKind::Triple);
        assert!("quad".parse::<SetKind>().is_err());
    }
}
