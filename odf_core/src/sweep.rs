//! Volume-wide peak extraction.
//!
//! A sweep runs in three phases:
//!
//! 1. Parallel per-voxel work: projection, GFA, peak search. Each voxel writes
//!    only its own pre-sized slot, including its global-maximum contribution.
//! 2. Reduction of the contributions into a [`GlobalMax`].
//! 3. Parallel QA pass dividing every retained raw peak value by that maximum.
//!
//! Cancellation is checked per voxel. A cancelled sweep returns
//! [`PeakError::Cancelled`] and drops everything it computed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ndarray::{ArrayView2, ArrayViewD, Ix2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::basis::SphericalBasisProjector;
use crate::config::{PeakConfig, SweepConfig};
use crate::error::{PeakError, PeakResult};
use crate::field::{flatten, PeakField, VoxelMask};
use crate::metrics::gfa;
use crate::peaks::{GlobalMax, GlobalMaxTracker, PeakExtractor, PeakRecord, VoxelOutcome};
use crate::sphere::SphericalDirectionSet;

/// Counters describing one finished sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub total_voxels: usize,
    /// Voxels skipped by the GFA gate
    pub gated_voxels: usize,
    pub voxels_with_peaks: usize,
    /// Searched voxels that produced no peak
    pub empty_voxels: usize,
    pub retained_peaks: usize,
    pub global_max: f64,
    pub elapsed_ms: u64,
}

/// Compact peak field plus the sweep counters.
#[derive(Debug, Clone)]
pub struct SweepOutput {
    pub peaks: PeakField,
    pub summary: SweepSummary,
}

/// Runs peak extraction over masked SH coefficient volumes.
///
/// # Examples
///
/// ```
/// use ndarray::{ArrayD, IxDyn};
/// use odf_peaks_core::field::VoxelMask;
/// use odf_peaks_core::{PeakConfig, PeakSweep, SphericalDirectionSet};
///
/// let sweep = PeakSweep::new(PeakConfig::default(), SphericalDirectionSet::icosphere(2)).unwrap();
///
/// // Two voxels of an order-2 field, both with an axially symmetric lobe on z.
/// let mut coefficients = ArrayD::<f64>::zeros(IxDyn(&[2, 6]));
/// for voxel in 0..2 {
///     coefficients[[voxel, 0]] = 1.0;
///     coefficients[[voxel, 3]] = 0.8;
/// }
/// let output = sweep.run(coefficients.view(), VoxelMask::full(&[2])).unwrap();
/// assert_eq!(output.summary.voxels_with_peaks, 2);
/// ```
#[derive(Debug, Clone)]
pub struct PeakSweep {
    extractor: PeakExtractor,
}

impl PeakSweep {
    pub fn new(config: PeakConfig, sphere: SphericalDirectionSet) -> PeakResult<Self> {
        Ok(Self {
            extractor: PeakExtractor::new(config, sphere)?,
        })
    }

    /// Build a sweep over the icosphere named by `config.sphere`.
    pub fn from_config(config: &SweepConfig) -> PeakResult<Self> {
        config.validate()?;
        let sphere = SphericalDirectionSet::icosphere(config.sphere.subdivisions);
        Self::new(config.peaks.clone(), sphere)
    }

    pub fn config(&self) -> &PeakConfig {
        self.extractor.config()
    }

    pub fn sphere(&self) -> &SphericalDirectionSet {
        self.extractor.sphere()
    }

    /// Sweep a dense coefficient volume of shape `mask.shape + [ncoef]`.
    pub fn run(
        &self,
        coefficients: ArrayViewD<f64>,
        mask: impl Into<Arc<VoxelMask>>,
    ) -> PeakResult<SweepOutput> {
        self.run_dense(coefficients, mask.into(), None)
    }

    /// Like [`run`](Self::run), aborting once `cancel` is set.
    pub fn run_cancellable(
        &self,
        coefficients: ArrayViewD<f64>,
        mask: impl Into<Arc<VoxelMask>>,
        cancel: &AtomicBool,
    ) -> PeakResult<SweepOutput> {
        self.run_dense(coefficients, mask.into(), Some(cancel as &dyn CancelSignal))
    }

    /// Sweep coefficients already in compact `[mask.count() × ncoef]` form.
    pub fn run_compact(
        &self,
        coefficients: ArrayView2<f64>,
        mask: impl Into<Arc<VoxelMask>>,
    ) -> PeakResult<SweepOutput> {
        self.sweep(coefficients, mask.into(), None)
    }

    fn run_dense(
        &self,
        coefficients: ArrayViewD<f64>,
        mask: Arc<VoxelMask>,
        cancel: Option<&dyn CancelSignal>,
    ) -> PeakResult<SweepOutput> {
        if coefficients.ndim() != mask.ndim() + 1 {
            return Err(PeakError::shape_mismatch(
                format!("{:?} + [ncoef]", mask.shape()),
                coefficients.shape(),
                "SH coefficient volume",
            ));
        }
        let compact = flatten(coefficients, &mask)?
            .into_dimensionality::<Ix2>()
            .map_err(|err| {
                PeakError::shape_mismatch("2 axes", err.to_string(), "compact coefficients")
            })?;
        self.sweep(compact.view(), mask, cancel)
    }

    fn sweep(
        &self,
        coefficients: ArrayView2<f64>,
        mask: Arc<VoxelMask>,
        cancel: Option<&dyn CancelSignal>,
    ) -> PeakResult<SweepOutput> {
        let started = Instant::now();
        let voxels = mask.count();
        if coefficients.nrows() != voxels {
            return Err(PeakError::shape_mismatch(
                voxels,
                coefficients.nrows(),
                "compact coefficient rows",
            ));
        }
        if voxels == 0 {
            warn!("sweep mask selects no voxels");
        }

        let projector = SphericalBasisProjector::new(coefficients.ncols(), self.sphere())?;
        let sampled = projector.project_rows(coefficients)?;
        check(cancel)?;
        debug!(
            voxels,
            order = projector.order(),
            directions = self.sphere().len(),
            "projected SH coefficients"
        );

        let anisotropy: Vec<f64> = (0..voxels)
            .into_par_iter()
            .map(|i| gfa(sampled.row(i)))
            .collect();

        // Phase 1
        let mut tracker = GlobalMaxTracker::new(voxels);
        let mut outcomes: Vec<Option<VoxelOutcome>> = vec![None; voxels];
        outcomes
            .par_iter_mut()
            .zip(tracker.slots_mut().par_iter_mut())
            .enumerate()
            .try_for_each(|(i, (outcome, contribution))| {
                check(cancel)?;
                let found = self.extractor.evaluate(sampled.row(i), anisotropy[i]);
                *contribution = found.contribution;
                *outcome = Some(found);
                Ok::<(), PeakError>(())
            })?;
        let outcomes: Vec<VoxelOutcome> = outcomes
            .into_iter()
            .collect::<Option<_>>()
            .ok_or(PeakError::Cancelled)?;
        debug!(voxels, "extracted per-voxel peaks");

        // Phase 2
        let global_max = tracker.finalize()?;
        debug!(global_max = global_max.value(), "reduced global maximum");

        // Phase 3
        let qa = normalize(&outcomes, global_max, cancel)?;

        let summary = summarize(&outcomes, global_max, started);
        if summary.voxels_with_peaks == 0 {
            warn!(gated = summary.gated_voxels, "no voxel produced a peak");
        }
        info!(
            total = summary.total_voxels,
            gated = summary.gated_voxels,
            with_peaks = summary.voxels_with_peaks,
            retained = summary.retained_peaks,
            global_max = summary.global_max,
            elapsed_ms = summary.elapsed_ms,
            "peak sweep complete"
        );

        let records: Vec<PeakRecord> = outcomes.into_iter().map(|o| o.record).collect();
        let peaks =
            PeakField::from_records(mask, self.sphere().clone(), &records, &anisotropy, &qa)?;
        Ok(SweepOutput { peaks, summary })
    }
}

/// Stop request polled once per voxel in each parallel phase.
pub(crate) trait CancelSignal: Sync {
    fn is_cancelled(&self) -> bool;
}

impl CancelSignal for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

fn check(cancel: Option<&dyn CancelSignal>) -> PeakResult<()> {
    match cancel {
        Some(signal) if signal.is_cancelled() => Err(PeakError::Cancelled),
        _ => Ok(()),
    }
}

fn normalize(
    outcomes: &[VoxelOutcome],
    global_max: GlobalMax,
    cancel: Option<&dyn CancelSignal>,
) -> PeakResult<Vec<Vec<f64>>> {
    outcomes
        .par_iter()
        .map(|outcome| -> PeakResult<Vec<f64>> {
            check(cancel)?;
            Ok(outcome
                .raw_values
                .iter()
                .map(|&raw| global_max.qa(raw))
                .collect())
        })
        .collect()
}

fn summarize(outcomes: &[VoxelOutcome], global_max: GlobalMax, started: Instant) -> SweepSummary {
    let gated_voxels = outcomes.iter().filter(|o| o.gated).count();
    let voxels_with_peaks = outcomes.iter().filter(|o| !o.record.is_empty()).count();
    SweepSummary {
        total_voxels: outcomes.len(),
        gated_voxels,
        voxels_with_peaks,
        empty_voxels: outcomes.len() - gated_voxels - voxels_with_peaks,
        retained_peaks: outcomes.iter().map(|o| o.record.len()).sum(),
        global_max: global_max.value(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, ArrayD, IxDyn};
    use std::sync::atomic::AtomicUsize;

    /// Cancels from the `after`-th poll onward.
    struct CancelAfter {
        polls: AtomicUsize,
        after: usize,
    }

    impl CancelAfter {
        fn new(after: usize) -> Self {
            Self {
                polls: AtomicUsize::new(0),
                after,
            }
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    impl CancelSignal for CancelAfter {
        fn is_cancelled(&self) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst) >= self.after
        }
    }

    fn z_lobe(rows: usize) -> Array2<f64> {
        let mut coefficients = Array2::zeros((rows, 6));
        for mut row in coefficients.rows_mut() {
            row[0] = 1.0;
            row[3] = 0.8;
        }
        coefficients
    }

    fn sweep() -> PeakSweep {
        PeakSweep::new(PeakConfig::default(), SphericalDirectionSet::icosphere(2)).unwrap()
    }

    #[test]
    fn zonal_lobe_peaks_on_the_pole() {
        let output = sweep().run_compact(z_lobe(1).view(), VoxelMask::full(&[1])).unwrap();
        let record = output.peaks.record(0).unwrap();
        assert_eq!(record.len(), 1);
        assert!(record.direction(0).z.abs() > 0.999);
        assert_eq!(output.summary.retained_peaks, 1);
        assert_eq!(output.peaks.arrays().qa()[[0, 0]], 1.0);
    }

    #[test]
    fn dense_input_must_match_mask() {
        let coefficients = ArrayD::<f64>::zeros(IxDyn(&[3, 6]));
        let err = sweep()
            .run(coefficients.view(), VoxelMask::full(&[2]))
            .unwrap_err();
        assert!(matches!(err, PeakError::ShapeMismatch { .. }));

        let err = sweep()
            .run(coefficients.view(), VoxelMask::full(&[3, 6]))
            .unwrap_err();
        assert!(matches!(err, PeakError::ShapeMismatch { .. }));
    }

    #[test]
    fn zero_volume_is_an_error() {
        let coefficients = Array2::<f64>::zeros((4, 6));
        let err = sweep()
            .run_compact(coefficients.view(), VoxelMask::full(&[4]))
            .unwrap_err();
        assert_eq!(err, PeakError::AllZeroVolume);
    }

    #[test]
    fn empty_mask_is_an_error() {
        let coefficients = Array2::<f64>::zeros((0, 6));
        let mask = VoxelMask::new(ndarray::arr1(&[false, false]));
        let err = sweep().run_compact(coefficients.view(), mask).unwrap_err();
        assert_eq!(err, PeakError::AllZeroVolume);
    }

    #[test]
    fn cancelled_sweep_discards_output() {
        let coefficients = z_lobe(8).into_dyn();
        let cancel = AtomicBool::new(true);
        let err = sweep()
            .run_cancellable(coefficients.view(), VoxelMask::full(&[8]), &cancel)
            .unwrap_err();
        assert_eq!(err, PeakError::Cancelled);
    }

    // One poll after projection, then one per voxel in extraction and in QA.
    const VOXELS: usize = 64;

    #[test]
    fn cancellation_during_extraction_stops_before_qa() {
        let signal = CancelAfter::new(1 + 10);
        let err = sweep()
            .sweep(
                z_lobe(VOXELS).view(),
                Arc::new(VoxelMask::full(&[VOXELS])),
                Some(&signal as &dyn CancelSignal),
            )
            .unwrap_err();
        assert_eq!(err, PeakError::Cancelled);
        assert!(signal.polls() > 1 + 10);
        assert!(signal.polls() <= 1 + VOXELS);
    }

    #[test]
    fn cancellation_during_qa_discards_output() {
        let signal = CancelAfter::new(1 + VOXELS + 5);
        let err = sweep()
            .sweep(
                z_lobe(VOXELS).view(),
                Arc::new(VoxelMask::full(&[VOXELS])),
                Some(&signal as &dyn CancelSignal),
            )
            .unwrap_err();
        assert_eq!(err, PeakError::Cancelled);
        assert!(signal.polls() > 1 + VOXELS);
    }

    #[test]
    fn uncancelled_signal_completes() {
        let signal = CancelAfter::new(usize::MAX);
        let output = sweep()
            .sweep(
                z_lobe(VOXELS).view(),
                Arc::new(VoxelMask::full(&[VOXELS])),
                Some(&signal as &dyn CancelSignal),
            )
            .unwrap();
        assert_eq!(output.summary.voxels_with_peaks, VOXELS);
        assert_eq!(signal.polls(), 1 + 2 * VOXELS);
    }

    #[test]
    fn repeated_config_sweeps_share_catalog_and_basis() {
        let config = SweepConfig {
            sphere: crate::config::SphereConfig { subdivisions: 2 },
            ..SweepConfig::default()
        };
        let first = PeakSweep::from_config(&config).unwrap();
        first.run_compact(z_lobe(2).view(), VoxelMask::full(&[2])).unwrap();
        for _ in 0..5 {
            let again = PeakSweep::from_config(&config).unwrap();
            assert_eq!(again.sphere(), first.sphere());
            again.run_compact(z_lobe(2).view(), VoxelMask::full(&[2])).unwrap();
        }
        assert!(crate::basis::BasisMatrixCache::global().contains(2, first.sphere()));
    }

    #[test]
    fn invalid_coefficient_count_is_reported() {
        let coefficients = Array2::<f64>::zeros((2, 7));
        let err = sweep()
            .run_compact(coefficients.view(), VoxelMask::full(&[2]))
            .unwrap_err();
        assert_eq!(err, PeakError::InvalidCoefficientCount { ncoef: 7 });
    }

    #[test]
    fn from_config_uses_standard_catalog() {
        let sweep = PeakSweep::from_config(&SweepConfig::default()).unwrap();
        assert_eq!(sweep.sphere(), &SphericalDirectionSet::standard());
    }
}
