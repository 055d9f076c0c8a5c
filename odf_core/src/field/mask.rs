use ndarray::{ArrayD, ArrayViewD, Dimension, IxDyn};

/// Boolean selection of voxels over a spatial grid.
///
/// The logical row-major scan of the mask fixes the order of compact arrays:
/// compact row `r` is the `r`-th selected voxel in that scan.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelMask {
    mask: ArrayD<bool>,
    /// Scan offsets of the selected voxels
    positions: Vec<usize>,
    /// Compact row of every scan offset, `None` outside the mask
    ranks: Vec<Option<usize>>,
}

impl VoxelMask {
    pub fn new<D: Dimension>(mask: ndarray::Array<bool, D>) -> Self {
        let mask = mask.into_dyn();
        let mut positions = Vec::new();
        let ranks = mask
            .iter()
            .enumerate()
            .map(|(offset, &selected)| {
                selected.then(|| {
                    positions.push(offset);
                    positions.len() - 1
                })
            })
            .collect();
        Self {
            mask,
            positions,
            ranks,
        }
    }

    /// Mask selecting every voxel of `shape`.
    pub fn full(shape: &[usize]) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(shape), true))
    }

    pub fn shape(&self) -> &[usize] {
        self.mask.shape()
    }

    pub fn ndim(&self) -> usize {
        self.mask.ndim()
    }

    /// Number of selected voxels.
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    /// Number of voxels in the grid.
    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn view(&self) -> ArrayViewD<'_, bool> {
        self.mask.view()
    }

    /// Scan offset of compact row `row`.
    pub fn position(&self, row: usize) -> Option<usize> {
        self.positions.get(row).copied()
    }

    /// Compact row of the voxel at scan offset `offset`.
    pub fn rank(&self, offset: usize) -> Option<usize> {
        self.ranks.get(offset).copied().flatten()
    }

    /// Spatial index of compact row `row`.
    pub fn spatial_index(&self, row: usize) -> Option<Vec<usize>> {
        let mut offset = self.position(row)?;
        let mut index = vec![0; self.ndim()];
        for (slot, &extent) in index.iter_mut().zip(self.shape()).rev() {
            *slot = offset % extent;
            offset /= extent;
        }
        Some(index)
    }
}

impl<D: Dimension> From<ndarray::Array<bool, D>> for VoxelMask {
    fn from(mask: ndarray::Array<bool, D>) -> Self {
        Self::new(mask)
    }
}
