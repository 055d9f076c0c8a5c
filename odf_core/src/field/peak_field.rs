//! Peak extraction results over a volume.
//!
//! A [`PeakField`] is either compact (one row per selected voxel, in scan
//! order) or dense (the mask's spatial shape). The sibling arrays always move
//! between layouts together:
//!
//! | array        | trailing shape | dense fill |
//! |--------------|----------------|------------|
//! | `directions` | `[K, 3]`       | `0.0`      |
//! | `values`     | `[K]`          | `0.0`      |
//! | `indices`    | `[K]`          | `-1`       |
//! | `gfa`        | `[]`           | `0.0`      |
//! | `qa`         | `[K]`          | `0.0`      |

use std::sync::Arc;

use glam::DVec3;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

use super::mapper::{gather, scatter};
use super::mask::VoxelMask;
use crate::error::{PeakError, PeakResult};
use crate::peaks::{Peak, PeakRecord};
use crate::sphere::SphericalDirectionSet;

/// How [`PeakField::peak_mask`] compares a voxel's peak count to the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PeakCountComparison {
    /// `count >= threshold`
    #[default]
    AtLeast,
    /// `count <= threshold`
    AtMost,
    /// `count == threshold`
    Exactly,
}

impl PeakCountComparison {
    pub fn holds(self, count: usize, threshold: usize) -> bool {
        match self {
            PeakCountComparison::AtLeast => count >= threshold,
            PeakCountComparison::AtMost => count <= threshold,
            PeakCountComparison::Exactly => count == threshold,
        }
    }
}

/// Sibling arrays of a [`PeakField`] in one layout.
#[derive(Debug, Clone)]
pub struct PeakArrays {
    mask: Arc<VoxelMask>,
    sphere: SphericalDirectionSet,
    directions: ArrayD<f64>,
    values: ArrayD<f64>,
    indices: ArrayD<i64>,
    gfa: ArrayD<f64>,
    qa: ArrayD<f64>,
}

impl PeakArrays {
    pub fn mask(&self) -> &VoxelMask {
        &self.mask
    }

    pub fn sphere(&self) -> &SphericalDirectionSet {
        &self.sphere
    }

    pub fn directions(&self) -> ArrayViewD<'_, f64> {
        self.directions.view()
    }

    pub fn values(&self) -> ArrayViewD<'_, f64> {
        self.values.view()
    }

    pub fn indices(&self) -> ArrayViewD<'_, i64> {
        self.indices.view()
    }

    pub fn gfa(&self) -> ArrayViewD<'_, f64> {
        self.gfa.view()
    }

    pub fn qa(&self) -> ArrayViewD<'_, f64> {
        self.qa.view()
    }

    fn capacity(&self) -> usize {
        self.values.shape().last().copied().unwrap_or(0)
    }

    fn scatter_all(self) -> Self {
        let mask = &self.mask;
        Self {
            directions: scatter(&self.directions.view(), mask, 0.0),
            values: scatter(&self.values.view(), mask, 0.0),
            indices: scatter(&self.indices.view(), mask, -1),
            gfa: scatter(&self.gfa.view(), mask, 0.0),
            qa: scatter(&self.qa.view(), mask, 0.0),
            mask: Arc::clone(&self.mask),
            sphere: self.sphere,
        }
    }

    fn gather_all(self) -> Self {
        let mask = &self.mask;
        Self {
            directions: gather(&self.directions.view(), mask),
            values: gather(&self.values.view(), mask),
            indices: gather(&self.indices.view(), mask),
            gfa: gather(&self.gfa.view(), mask),
            qa: gather(&self.qa.view(), mask),
            mask: Arc::clone(&self.mask),
            sphere: self.sphere,
        }
    }
}

/// Peaks, GFA and QA over a masked volume.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use odf_peaks_core::field::{PeakField, VoxelMask};
/// use odf_peaks_core::peaks::PeakRecord;
/// use odf_peaks_core::SphericalDirectionSet;
///
/// let mask = Arc::new(VoxelMask::full(&[2, 2]));
/// let records = vec![PeakRecord::empty(3); 4];
/// let field = PeakField::from_records(
///     mask,
///     SphericalDirectionSet::icosphere(1),
///     &records,
///     &[0.0; 4],
///     &vec![Vec::new(); 4],
/// )
/// .unwrap();
///
/// let dense = field.into_dense();
/// assert_eq!(dense.arrays().values().shape(), &[2, 2, 3]);
/// ```
#[derive(Debug, Clone)]
pub enum PeakField {
    /// Leading axis runs over selected voxels in scan order
    Compact(PeakArrays),
    /// Leading axes match the mask; unselected voxels hold empty records
    Dense(PeakArrays),
}

impl PeakField {
    /// Assemble a compact field from per-voxel results.
    ///
    /// `records`, `gfa` and `qa` are aligned with the selected voxels of
    /// `mask`. Each `qa` entry covers the occupied slots of its record; missing
    /// entries read as zero, and entries past the record's peaks are ignored.
    pub fn from_records(
        mask: Arc<VoxelMask>,
        sphere: SphericalDirectionSet,
        records: &[PeakRecord],
        gfa: &[f64],
        qa: &[Vec<f64>],
    ) -> PeakResult<Self> {
        let voxels = mask.count();
        for (len, context) in [
            (records.len(), "peak records"),
            (gfa.len(), "GFA values"),
            (qa.len(), "QA values"),
        ] {
            if len != voxels {
                return Err(PeakError::shape_mismatch(voxels, len, context));
            }
        }
        let capacity = records.first().map_or(0, PeakRecord::capacity);
        if let Some(bad) = records.iter().find(|r| r.capacity() != capacity) {
            return Err(PeakError::shape_mismatch(
                capacity,
                bad.capacity(),
                "peak record capacity",
            ));
        }

        let arrays = PeakArrays {
            directions: ArrayD::from_shape_fn(IxDyn(&[voxels, capacity, 3]), |ix| {
                records[ix[0]].direction(ix[1])[ix[2]]
            }),
            values: ArrayD::from_shape_fn(IxDyn(&[voxels, capacity]), |ix| {
                records[ix[0]].value(ix[1])
            }),
            indices: ArrayD::from_shape_fn(IxDyn(&[voxels, capacity]), |ix| {
                records[ix[0]].index(ix[1])
            }),
            gfa: ArrayD::from_shape_fn(IxDyn(&[voxels]), |ix| gfa[ix[0]]),
            qa: ArrayD::from_shape_fn(IxDyn(&[voxels, capacity]), |ix| {
                let (row, k) = (ix[0], ix[1]);
                if records[row].slot(k).is_some() {
                    qa[row].get(k).copied().unwrap_or(0.0)
                } else {
                    0.0
                }
            }),
            mask,
            sphere,
        };
        Ok(PeakField::Compact(arrays))
    }

    pub fn arrays(&self) -> &PeakArrays {
        match self {
            PeakField::Compact(arrays) | PeakField::Dense(arrays) => arrays,
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, PeakField::Dense(_))
    }

    pub fn mask(&self) -> &VoxelMask {
        self.arrays().mask()
    }

    pub fn sphere(&self) -> &SphericalDirectionSet {
        self.arrays().sphere()
    }

    /// Peak slots per voxel (K).
    pub fn capacity(&self) -> usize {
        self.arrays().capacity()
    }

    /// Expand every sibling array to the mask's spatial shape.
    pub fn into_dense(self) -> Self {
        match self {
            PeakField::Compact(arrays) => PeakField::Dense(arrays.scatter_all()),
            dense @ PeakField::Dense(_) => dense,
        }
    }

    /// Collapse every sibling array to the selected voxels.
    pub fn into_compact(self) -> Self {
        match self {
            PeakField::Dense(arrays) => PeakField::Compact(arrays.gather_all()),
            compact @ PeakField::Compact(_) => compact,
        }
    }

    /// Occupied slots per voxel, in the field's current layout.
    pub fn num_peaks(&self) -> ArrayD<usize> {
        let values = self.arrays().values();
        let last = Axis(values.ndim() - 1);
        values.map_axis(last, |slots| slots.iter().filter(|&&v| v != 0.0).count())
    }

    /// Voxels whose peak count satisfies `comparison` against `threshold`.
    pub fn peak_mask(&self, threshold: usize, comparison: PeakCountComparison) -> ArrayD<bool> {
        self.num_peaks()
            .mapv(|count| comparison.holds(count, threshold))
    }

    /// Rebuild the record of selected voxel `row`, in scan order.
    pub fn record(&self, row: usize) -> Option<PeakRecord> {
        let arrays = self.arrays();
        let base = match self {
            PeakField::Compact(_) if row < arrays.mask.count() => vec![row],
            PeakField::Compact(_) => return None,
            PeakField::Dense(_) => arrays.mask.spatial_index(row)?,
        };

        let slot_index = |k: usize| {
            let mut ix = base.clone();
            ix.push(k);
            ix
        };
        let peaks = (0..arrays.capacity()).map_while(|k| {
            let ix = slot_index(k);
            let value = arrays.values[IxDyn(&ix)];
            let index = usize::try_from(arrays.indices[IxDyn(&ix)]).ok()?;
            if value == 0.0 {
                return None;
            }
            let component = |c: usize| {
                let mut d = ix.clone();
                d.push(c);
                arrays.directions[IxDyn(&d)]
            };
            Some(Peak {
                direction: DVec3::new(component(0), component(1), component(2)),
                value,
                index,
            })
        });
        Some(PeakRecord::from_peaks(arrays.capacity(), peaks))
    }
}
