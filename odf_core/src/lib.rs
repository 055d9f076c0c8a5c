//! # ODF Peaks Core
//!
//! Peak extraction from spherical-harmonic (SH) orientation distribution
//! fields. Every voxel's SH coefficient vector is sampled over a discrete
//! direction set; local maxima of the sampled function become peaks, and the
//! peak amplitudes are normalized by a volume-wide maximum into quantitative
//! anisotropy (QA).
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::{ArrayD, IxDyn};
//! use odf_peaks_core::field::VoxelMask;
//! use odf_peaks_core::{PeakConfig, PeakSweep, SphericalDirectionSet};
//!
//! let sweep = PeakSweep::new(PeakConfig::default(), SphericalDirectionSet::icosphere(2))?;
//!
//! // A 2×2 volume of order-2 coefficients, each with a lobe along z.
//! let mut coefficients = ArrayD::<f64>::zeros(IxDyn(&[2, 2, 6]));
//! coefficients.slice_mut(ndarray::s![.., .., 0]).fill(1.0);
//! coefficients.slice_mut(ndarray::s![.., .., 3]).fill(0.5);
//!
//! let output = sweep.run(coefficients.view(), VoxelMask::full(&[2, 2]))?;
//! let dense = output.peaks.into_dense();
//! assert_eq!(dense.arrays().directions().shape(), &[2, 2, 5, 3]);
//! # Ok::<(), odf_peaks_core::PeakError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`sphere`] - Direction catalogs and their neighbor relation
//! - [`basis`] - Real SH basis and projection onto a catalog
//! - [`metrics`] - GFA and SH band power
//! - [`peaks`] - Per-voxel extraction and the global maximum
//! - [`field`] - Compact/dense layouts and the peak field
//! - [`sweep`] - Parallel volume sweeps
//! - [`compare`] - Voxel-wise comparison of two reconstructions
//! - [`config`] - Sweep configuration via TOML
//! - [`logging`] - JSON line-delimited sweep ledger

pub mod basis;
pub mod compare;
pub mod config;
pub mod error;
pub mod field;
pub mod logging;
pub mod metrics;
pub mod peaks;
pub mod sphere;
pub mod sweep;

pub use basis::{sh_to_sf, BasisMatrixCache, SphericalBasisProjector};
pub use config::{ConfigError, PeakConfig, SphereConfig, SweepConfig};
pub use error::{PeakError, PeakResult};
pub use field::{PeakCountComparison, PeakField, VoxelMask};
pub use metrics::{gfa, gfa_field, sh_power, sh_power_field};
pub use peaks::{GlobalMax, GlobalMaxTracker, Peak, PeakExtractor, PeakRecord};
pub use sphere::SphericalDirectionSet;
pub use sweep::{PeakSweep, SweepOutput, SweepSummary};
