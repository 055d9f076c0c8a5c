//! Peak records, per-voxel extraction and the sweep-wide maximum.

pub mod extractor;
pub mod record;
pub mod tracker;

pub use extractor::{PeakExtractor, VoxelOutcome};
pub use record::{Peak, PeakRecord};
pub use tracker::{GlobalMax, GlobalMaxTracker};
