//! Fixed-size 3-vector helpers for ENU and ECEF geometry.

pub type Vec3 = [f64; 3];

pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: Vec3, factor: f64) -> Vec3 {
    [a[0] * factor, a[1] * factor, a[2] * factor]
}

pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// Euclidean distance between two points.
pub fn dist3d(a: Vec3, b: Vec3) -> f64 {
    norm(sub(b, a))
}

/// Componentwise arithmetic mean of two points.
pub fn midpoint(a: Vec3, b: Vec3) -> Vec3 {
    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, (a[2] + b[2]) / 2.0]
}

/// Unit vector along `a`, or `None` when `a` has zero length.
pub fn unit(a: Vec3) -> Option<Vec3> {
    let length = norm(a);
    if length > 0.0 && length.is_finite() {
        Some(scale(a, 1.0 / length))
    } else {
        None
    }
}
