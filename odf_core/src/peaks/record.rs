use glam::DVec3;
use serde::{Deserialize, Serialize};

/// One retained maximum of a sampled spherical function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Catalog direction, scaled by the normalized value when normalization is on
    pub direction: DVec3,
    /// Strictly positive amplitude
    pub value: f64,
    /// Index of the direction in its catalog
    pub index: usize,
}

/// Fixed-capacity list of peaks for one voxel.
///
/// Occupied slots form a prefix ordered by descending value. Empty slots read
/// back as value `0.0`, index `-1` and the zero direction, which is also how
/// they appear in dense arrays.
///
/// # Examples
///
/// ```
/// use odf_peaks_core::peaks::PeakRecord;
///
/// let record = PeakRecord::empty(3);
/// assert_eq!(record.capacity(), 3);
/// assert_eq!(record.len(), 0);
/// assert_eq!(record.index(0), -1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    slots: Vec<Option<Peak>>,
}

impl PeakRecord {
    pub fn empty(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Fill the leading slots with `peaks`, dropping any beyond `capacity`.
    pub fn from_peaks(capacity: usize, peaks: impl IntoIterator<Item = Peak>) -> Self {
        let mut record = Self::empty(capacity);
        for (slot, peak) in record.slots.iter_mut().zip(peaks) {
            *slot = Some(peak);
        }
        record
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().take_while(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.first().map_or(true, Option::is_none)
    }

    pub fn slot(&self, k: usize) -> Option<&Peak> {
        self.slots.get(k).and_then(Option::as_ref)
    }

    pub fn peaks(&self) -> impl Iterator<Item = &Peak> + '_ {
        self.slots.iter().map_while(Option::as_ref)
    }

    pub fn top(&self) -> Option<&Peak> {
        self.slot(0)
    }

    pub fn value(&self, k: usize) -> f64 {
        self.slot(k).map_or(0.0, |p| p.value)
    }

    pub fn index(&self, k: usize) -> i64 {
        self.slot(k).map_or(-1, |p| p.index as i64)
    }

    pub fn direction(&self, k: usize) -> DVec3 {
        self.slot(k).map_or(DVec3::ZERO, |p| p.direction)
    }
}
