use rayon::prelude::*;

use crate::error::{PeakError, PeakResult};

/// Per-voxel storage for the sweep-wide maximum.
///
/// Each voxel owns one slot, written during the parallel extraction phase.
/// [`finalize`](Self::finalize) consumes the tracker and reduces the slots,
/// so no maximum can be read while contributions are still arriving.
#[derive(Debug, Clone)]
pub struct GlobalMaxTracker {
    slots: Vec<Option<f64>>,
}

impl GlobalMaxTracker {
    /// Storage for `voxels` contributions, all initially absent.
    pub fn new(voxels: usize) -> Self {
        Self {
            slots: vec![None; voxels],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Record the contribution of one voxel, replacing any earlier one.
    pub fn record(&mut self, voxel: usize, contribution: Option<f64>) -> PeakResult<()> {
        let voxels = self.slots.len();
        let slot = self.slots.get_mut(voxel).ok_or_else(|| {
            PeakError::shape_mismatch(format!("voxel < {voxels}"), voxel, "global max slot")
        })?;
        *slot = contribution;
        Ok(())
    }

    /// Mutable per-voxel slots for parallel writers.
    pub fn slots_mut(&mut self) -> &mut [Option<f64>] {
        &mut self.slots
    }

    /// Reduce all contributions.
    ///
    /// Fails with [`PeakError::AllZeroVolume`] when the maximum is not a
    /// positive finite number, which includes a sweep with no voxels.
    pub fn finalize(self) -> PeakResult<GlobalMax> {
        let max = self
            .slots
            .par_iter()
            .filter_map(|slot| *slot)
            .reduce(|| f64::NEG_INFINITY, f64::max);
        GlobalMax::new(max)
    }
}

impl FromIterator<Option<f64>> for GlobalMaxTracker {
    fn from_iter<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

/// Finalized sweep-wide maximum, strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalMax(f64);

impl GlobalMax {
    pub fn new(value: f64) -> PeakResult<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(PeakError::AllZeroVolume)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Quantitative anisotropy of a raw peak value.
    pub fn qa(self, raw: f64) -> f64 {
        raw / self.0
    }
}
