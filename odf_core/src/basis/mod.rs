//! Spherical-harmonic basis evaluation and projection onto direction sets.

pub mod harmonics;
pub mod projector;

pub use harmonics::{real_sh_descoteaux, sh_index_list};
pub use projector::{sh_to_sf, BasisMatrixCache, SphericalBasisProjector};
