//! ODF Peaks Shared Library
//!
//! Shared vocabulary for the ODF peak workspace.
//!
//! This library provides:
//! - Spherical-harmonic index arithmetic (order ↔ coefficient count, band ranges)
//! - Axial angle helpers for comparing fibre directions

pub mod angles;
pub mod sh_index;

// Re-export commonly used helpers
pub use angles::{angular_distance_deg, axial_angle_deg, DirectionAngle};
pub use sh_index::{band_orders, order_from_ncoef, order_to_jrange, order_to_ncoef};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
