//! WGS-84 conversions between geodetic, ECEF and local East-North-Up frames.
//!
//! All angles are in degrees and all distances in meters. ENU frames are
//! anchored at a geodetic origin; `ecef_to_enu` and `enu_to_ecef` are exact
//! inverses for the same origin.

use crate::math::vector::{add, sub, Vec3};
use serde::{Deserialize, Serialize};

/// WGS-84 semi-major axis in meters
const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS-84 first eccentricity squared
const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);
/// WGS-84 semi-minor axis in meters
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

const LATITUDE_ITERATIONS: usize = 10;
const LATITUDE_TOLERANCE_RAD: f64 = 1e-12;

/// Latitude, longitude and altitude above the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_m: f64,
}

impl Geodetic {
    pub fn new(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self {
            lat_deg,
            lon_deg,
            alt_m,
        }
    }
}

fn prime_vertical_radius(sin_lat: f64) -> f64 {
    WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt()
}

pub fn geodetic_to_ecef(point: &Geodetic) -> Vec3 {
    let (sin_lat, cos_lat) = point.lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = point.lon_deg.to_radians().sin_cos();
    let n = prime_vertical_radius(sin_lat);

    [
        (n + point.alt_m) * cos_lat * cos_lon,
        (n + point.alt_m) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + point.alt_m) * sin_lat,
    ]
}

/// Inverse of [`geodetic_to_ecef`] by fixed-point iteration on latitude.
pub fn ecef_to_geodetic(ecef: Vec3) -> Geodetic {
    let [x, y, z] = ecef;
    let p = x.hypot(y);
    let lon = y.atan2(x);

    if p < 1e-9 {
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return Geodetic::new(lat, lon.to_degrees(), z.abs() - WGS84_B);
    }

    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    for _ in 0..LATITUDE_ITERATIONS {
        let n = prime_vertical_radius(lat.sin());
        let alt = p / lat.cos() - n;
        let next = z.atan2(p * (1.0 - WGS84_E2 * n / (n + alt)));
        let delta = (next - lat).abs();
        lat = next;
        if delta < LATITUDE_TOLERANCE_RAD {
            break;
        }
    }

    let n = prime_vertical_radius(lat.sin());
    let alt = p / lat.cos() - n;
    Geodetic::new(lat.to_degrees(), lon.to_degrees(), alt)
}

pub fn ecef_to_enu(ecef: Vec3, origin: &Geodetic) -> Vec3 {
    let [dx, dy, dz] = sub(ecef, geodetic_to_ecef(origin));
    let (sin_lat, cos_lat) = origin.lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = origin.lon_deg.to_radians().sin_cos();

    [
        -sin_lon * dx + cos_lon * dy,
        -sin_lat * cos_lon * dx - sin_lat * sin_lon * dy + cos_lat * dz,
        cos_lat * cos_lon * dx + cos_lat * sin_lon * dy + sin_lat * dz,
    ]
}

pub fn enu_to_ecef(enu: Vec3, origin: &Geodetic) -> Vec3 {
    let [e, n, u] = enu;
    let (sin_lat, cos_lat) = origin.lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = origin.lon_deg.to_radians().sin_cos();

    let offset = [
        -sin_lon * e - sin_lat * cos_lon * n + cos_lat * cos_lon * u,
        cos_lon * e - sin_lat * sin_lon * n + cos_lat * sin_lon * u,
        cos_lat * n + sin_lat * u,
    ];
    add(geodetic_to_ecef(origin), offset)
}

pub fn geodetic_to_enu(point: &Geodetic, origin: &Geodetic) -> Vec3 {
    ecef_to_enu(geodetic_to_ecef(point), origin)
}

pub fn enu_to_geodetic(enu: Vec3, origin: &Geodetic) -> Geodetic {
    ecef_to_geodetic(enu_to_ecef(enu, origin))
}
