//! Angles between directions on the unit sphere.
//!
//! Fibre orientations are axial: a direction and its antipode describe the
//! same fibre, so the natural distance between two of them lives in
//! `[0°, 90°]`.

use serde::{Deserialize, Serialize};

/// How the angle between two directions is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DirectionAngle {
    /// Antipodes are equivalent; result in `[0°, 90°]`.
    #[default]
    Axial,
    /// Plain great-circle angle; result in `[0°, 180°]`.
    GreatCircle,
}

impl DirectionAngle {
    /// Angle in degrees between `a` and `b` under this measure.
    pub fn between(self, a: [f64; 3], b: [f64; 3]) -> f64 {
        match self {
            DirectionAngle::Axial => axial_angle_deg(a, b),
            DirectionAngle::GreatCircle => angular_distance_deg(a, b),
        }
    }
}

/// Great-circle angle in degrees between two non-zero vectors, in `[0°, 180°]`.
///
/// Returns 0 when either vector has zero length.
pub fn angular_distance_deg(a: [f64; 3], b: [f64; 3]) -> f64 {
    let norm = length(a) * length(b);
    if norm == 0.0 {
        return 0.0;
    }
    let cos_theta = (dot(a, b) / norm).clamp(-1.0, 1.0);
    cos_theta.acos().to_degrees()
}

/// Axial angle in degrees, restricted to `[0°, 90°]`.
pub fn axial_angle_deg(a: [f64; 3], b: [f64; 3]) -> f64 {
    let angle = angular_distance_deg(a, b);
    if angle > 90.0 {
        180.0 - angle
    } else {
        angle
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn length(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
