use ndarray::{ArrayD, ArrayView1, ArrayViewD, Axis, IxDyn, Zip};

use crate::basis::projector::split_trailing;
use crate::error::PeakResult;

/// Generalized fractional anisotropy of one sampled function.
///
/// `sqrt(N·Σ(yᵢ−ȳ)² / ((N−1)·Σyᵢ²))`, clamped to `[0, 1]`. A function with
/// `Σyᵢ² = 0`, fewer than two samples, or non-finite samples has GFA 0.
pub fn gfa(values: ArrayView1<f64>) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| v * v).sum();
    if sum_sq == 0.0 || !sum_sq.is_finite() {
        return 0.0;
    }
    let mean = values.sum() / n as f64;
    let spread: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();

    let ratio = (n as f64 * spread) / ((n - 1) as f64 * sum_sq);
    // Negative lobes push the ratio above 1.
    ratio.sqrt().clamp(0.0, 1.0)
}

/// GFA of every function in a sampled field; the trailing axis is consumed.
pub fn gfa_field(sampled: ArrayViewD<f64>) -> PeakResult<ArrayD<f64>> {
    let (leading, _) = split_trailing(&sampled)?;
    let last = Axis(sampled.ndim() - 1);
    let mut out = ArrayD::zeros(IxDyn(leading));
    Zip::from(&mut out)
        .and(sampled.lanes(last))
        .par_for_each(|g, lane| *g = gfa(lane));
    Ok(out)
}
