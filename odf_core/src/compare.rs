//! Voxel-wise comparison of two reconstructions of the same volume.
//!
//! Every function takes the field under study first and the reference second.
//! Both must share a layout and shape.

use ndarray::{ArrayD, ArrayViewD, Axis, Dimension, Zip};
use odf_peaks_shared::axial_angle_deg;

use crate::error::{PeakError, PeakResult};
use crate::field::PeakField;

/// `(candidate − reference) / reference · 100`, element-wise.
///
/// A zero reference yields an infinite or NaN entry; callers mask those out.
pub fn percent_difference(
    candidate: ArrayViewD<f64>,
    reference: ArrayViewD<f64>,
) -> PeakResult<ArrayD<f64>> {
    if candidate.shape() != reference.shape() {
        return Err(PeakError::shape_mismatch(
            reference.shape(),
            candidate.shape(),
            "percent difference",
        ));
    }
    let mut out = ArrayD::zeros(candidate.raw_dim());
    Zip::from(&mut out)
        .and(&candidate)
        .and(&reference)
        .par_for_each(|d, &c, &r| *d = (c - r) / r * 100.0);
    Ok(out)
}

/// Per-voxel `candidate − reference` peak count.
pub fn peak_count_difference(
    candidate: &PeakField,
    reference: &PeakField,
) -> PeakResult<ArrayD<i64>> {
    check_compatible(candidate, reference)?;
    let (c, r) = (candidate.num_peaks(), reference.num_peaks());
    Ok(Zip::from(&c)
        .and(&r)
        .map_collect(|&c, &r| c as i64 - r as i64))
}

/// Largest peak value per voxel, 0 for voxels without peaks.
pub fn greatest_peak(field: &PeakField) -> ArrayD<f64> {
    let values = field.arrays().values();
    let last = Axis(values.ndim() - 1);
    values.map_axis(last, |slots| slots.iter().copied().fold(0.0, f64::max))
}

/// Axial angle (degrees, `[0, 90]`) between matching slots of the first `n`
/// peaks, over voxels where both fields hold exactly `n` peaks.
///
/// Entries are grouped per voxel in scan order: `n` angles for the first
/// qualifying voxel, then the next.
pub fn first_peaks_angular_difference(
    candidate: &PeakField,
    reference: &PeakField,
    n: usize,
) -> PeakResult<Vec<f64>> {
    check_compatible(candidate, reference)?;
    let (counts_c, counts_r) = (candidate.num_peaks(), reference.num_peaks());
    let (dirs_c, dirs_r) = (candidate.arrays().directions(), reference.arrays().directions());

    let mut angles = Vec::new();
    for ((ix, &nc), &nr) in counts_c.indexed_iter().zip(counts_r.iter()) {
        if nc != n || nr != n {
            continue;
        }
        let voxel = ix.slice();
        for k in 0..n {
            let a = direction_at(&dirs_c, voxel, k);
            let b = direction_at(&dirs_r, voxel, k);
            angles.push(axial_angle_deg(a, b));
        }
    }
    Ok(angles)
}

fn direction_at(directions: &ArrayViewD<f64>, voxel: &[usize], slot: usize) -> [f64; 3] {
    let mut ix = voxel.to_vec();
    ix.push(slot);
    ix.push(0);
    let base = ix.len() - 1;
    std::array::from_fn(|c| {
        let mut at = ix.clone();
        at[base] = c;
        directions[at.as_slice()]
    })
}

fn check_compatible(candidate: &PeakField, reference: &PeakField) -> PeakResult<()> {
    if candidate.is_dense() != reference.is_dense() {
        return Err(PeakError::shape_mismatch(
            layout_name(reference),
            layout_name(candidate),
            "peak field layout",
        ));
    }
    let (c, r) = (candidate.arrays().gfa(), reference.arrays().gfa());
    if c.shape() != r.shape() {
        return Err(PeakError::shape_mismatch(r.shape(), c.shape(), "peak field voxels"));
    }
    Ok(())
}

fn layout_name(field: &PeakField) -> &'static str {
    match field {
        PeakField::Compact(_) => "compact",
        PeakField::Dense(_) => "dense",
    }
}
