use anyhow::Context;
use bistaticcore::detection::{Detection, DetectionDocument, DetectionSet, SetKind};
use bistaticcore::estimation::geometry::BistaticGeometry;
use bistaticcore::estimation::residual::{predict, PAIR_ALTITUDE_M};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Geodetic site at sea level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub lat: f64,
    pub lon: f64,
}

impl Site {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Configuration for forward-modelling a synthetic detection set.
///
/// `illuminators` and `freq_mhz` hold either one entry shared by every
/// sensor or one entry per sensor. The truth state is in the ENU frame the
/// estimator uses for the resulting set (sensor centroid at sea level).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sensors: Vec<Site>,
    pub illuminators: Vec<Site>,
    pub freq_mhz: Vec<f64>,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub timestamp: i64,
    /// Uniform range noise amplitude in meters.
    pub range_noise_m: f64,
    /// Uniform Doppler noise amplitude in Hz.
    pub doppler_noise_hz: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sensors: vec![
                Site::new(40.7128, -74.0060),
                Site::new(40.6782, -73.9442),
                Site::new(40.7500, -73.9860),
            ],
            illuminators: vec![Site::new(40.7589, -73.9851)],
            freq_mhz: vec![1090.0],
            position: [1500.0, 4000.0, 6000.0],
            velocity: [120.0, -80.0, 10.0],
            timestamp: 1_700_000_000,
            range_noise_m: 0.0,
            doppler_noise_hz: 0.0,
            seed: 0,
        }
    }
}

impl GeneratorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading generator config {}", path_ref.display()))?;
        let config: GeneratorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing generator config {}", path_ref.display()))?;
        Ok(config)
    }
}

fn per_sensor<T: Copy>(values: &[T], count: usize, name: &str) -> anyhow::Result<Vec<T>> {
    match values.len() {
        1 => Ok(vec![values[0]; count]),
        n if n == count => Ok(values.to_vec()),
        n => anyhow::bail!("{} has {} entries, expected 1 or {}", name, n, count),
    }
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

/// Builds the detection document a target at the configured state would
/// produce. Two sensors give a pair with the target pinned at the pair
/// altitude and zero climb rate.
pub fn build_scenario(config: &GeneratorConfig) -> anyhow::Result<DetectionDocument> {
    let count = config.sensors.len();
    anyhow::ensure!(
        count == 2 || count == 3,
        "generator needs 2 or 3 sensors, got {}",
        count
    );
    let illuminators = per_sensor(&config.illuminators, count, "illuminators")?;
    let frequencies = per_sensor(&config.freq_mhz, count, "freq_mhz")?;

    let blanks: Vec<Detection> = (0..count)
        .map(|i| Detection {
            sensor_lat: config.sensors[i].lat,
            sensor_lon: config.sensors[i].lon,
            ioo_lat: illuminators[i].lat,
            ioo_lon: illuminators[i].lon,
            freq_mhz: frequencies[i],
            timestamp: config.timestamp,
            bistatic_range_km: 1.0,
            doppler_hz: 0.0,
        })
        .collect();
    let document = DetectionDocument {
        detection1: blanks[0].clone(),
        detection2: blanks[1].clone(),
        detection3: blanks.get(2).cloned(),
    };
    let origin = DetectionSet::from_document(document, SetKind::Auto)
        .context("validating generator geometry")?
        .enu_origin();

    let (position, velocity) = if count == 2 {
        (
            [config.position[0], config.position[1], PAIR_ALTITUDE_M],
            [config.velocity[0], config.velocity[1], 0.0],
        )
    } else {
        (config.position, config.velocity)
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut observed = Vec::with_capacity(count);
    for (index, blank) in blanks.into_iter().enumerate() {
        let prediction = predict(position, velocity, &BistaticGeometry::project(&blank, &origin));
        let doppler_hz = prediction.doppler_hz.with_context(|| {
            format!("target coincides with a focus of detection {}", index + 1)
        })?;
        let range_m = prediction.range_m + jitter(&mut rng, config.range_noise_m);
        observed.push(Detection {
            bistatic_range_km: range_m / 1000.0,
            doppler_hz: doppler_hz + jitter(&mut rng, config.doppler_noise_hz),
            ..blank
        });
    }

    let mut observed = observed.into_iter();
    let (Some(detection1), Some(detection2)) = (observed.next(), observed.next()) else {
        anyhow::bail!("generator produced fewer than two detections");
    };
    let document = DetectionDocument {
        detection1,
        detection2,
        detection3: observed.next(),
    };
    let set = DetectionSet::from_document(document, SetKind::Auto)
        .context("validating noisy detections")?;
    Ok(set.to_document())
}
