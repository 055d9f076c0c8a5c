//! Conversion between dense volumes and compact masked arrays.
//!
//! A dense array has shape `mask.shape + trailing`; its compact form has shape
//! `[mask.count()] + trailing`. Both directions preserve the trailing axes and
//! `flatten(unflatten(x)) == x` for every compact `x`.

use ndarray::{ArrayD, ArrayViewD, Dimension, IxDyn};

use super::mask::VoxelMask;
use crate::error::{PeakError, PeakResult};

/// Gather the selected voxels of `dense` in scan order.
pub fn flatten<T: Clone>(dense: ArrayViewD<T>, mask: &VoxelMask) -> PeakResult<ArrayD<T>> {
    let spatial = mask.ndim();
    if dense.ndim() < spatial || &dense.shape()[..spatial] != mask.shape() {
        return Err(PeakError::shape_mismatch(
            mask.shape(),
            dense.shape(),
            "flatten: leading axes must match the mask",
        ));
    }
    Ok(gather(&dense, mask))
}

/// Scatter compact rows into a dense volume filled with `T::default()`.
pub fn unflatten<T: Clone + Default>(
    compact: ArrayViewD<T>,
    mask: &VoxelMask,
) -> PeakResult<ArrayD<T>> {
    unflatten_with_fill(compact, mask, T::default())
}

/// Scatter compact rows into a dense volume filled with `fill`.
pub fn unflatten_with_fill<T: Clone>(
    compact: ArrayViewD<T>,
    mask: &VoxelMask,
    fill: T,
) -> PeakResult<ArrayD<T>> {
    match compact.shape().first() {
        Some(&rows) if rows == mask.count() => Ok(scatter(&compact, mask, fill)),
        _ => Err(PeakError::shape_mismatch(
            mask.count(),
            compact.shape(),
            "unflatten: compact length must equal the selected voxel count",
        )),
    }
}

/// Shapes must already agree with the mask.
pub(crate) fn gather<T: Clone>(dense: &ArrayViewD<T>, mask: &VoxelMask) -> ArrayD<T> {
    let trailing = &dense.shape()[mask.ndim()..];
    let width: usize = trailing.iter().product();
    let cells: Vec<&T> = dense.iter().collect();

    let mut shape = Vec::with_capacity(trailing.len() + 1);
    shape.push(mask.count());
    shape.extend_from_slice(trailing);

    ArrayD::from_shape_fn(IxDyn(&shape), |index| {
        let index = index.slice();
        let position = mask.position(index[0]).unwrap_or_default();
        cells[position * width + row_major_offset(&index[1..], trailing)].clone()
    })
}

/// The compact row count must already equal `mask.count()`.
pub(crate) fn scatter<T: Clone>(compact: &ArrayViewD<T>, mask: &VoxelMask, fill: T) -> ArrayD<T> {
    let spatial = mask.ndim();
    let trailing = &compact.shape()[1..];
    let width: usize = trailing.iter().product();
    let cells: Vec<&T> = compact.iter().collect();

    let mut shape = mask.shape().to_vec();
    shape.extend_from_slice(trailing);

    ArrayD::from_shape_fn(IxDyn(&shape), |index| {
        let index = index.slice();
        let offset = row_major_offset(&index[..spatial], mask.shape());
        match mask.rank(offset) {
            Some(row) => cells[row * width + row_major_offset(&index[spatial..], trailing)].clone(),
            None => fill.clone(),
        }
    })
}

fn row_major_offset(index: &[usize], shape: &[usize]) -> usize {
    index
        .iter()
        .zip(shape)
        .fold(0, |acc, (&i, &extent)| acc * extent + i)
}
