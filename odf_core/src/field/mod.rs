//! Compact and dense volumetric layouts.
//!
//! Compact arrays hold one row per selected voxel of a [`VoxelMask`]; dense
//! arrays carry the mask's full spatial shape. [`flatten`] and [`unflatten`]
//! convert single arrays, [`PeakField`] converts a whole result at once.

pub mod mapper;
pub mod mask;
pub mod peak_field;

pub use mapper::{flatten, unflatten, unflatten_with_fill};
pub use mask::VoxelMask;
pub use peak_field::{PeakArrays, PeakCountComparison, PeakField};
