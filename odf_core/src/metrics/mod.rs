//! Scalar metrics derived from SH fields.
//!
//! - [`gfa`]: generalized fractional anisotropy of a sampled spherical function
//! - [`sh_power`]: sum of squared coefficients per even SH order

mod anisotropy;
mod power;

pub use anisotropy::{gfa, gfa_field};
pub use power::{sh_power, sh_power_field};
