use ndarray::{s, Array1, ArrayD, ArrayView1, ArrayViewD, Axis, IxDyn, Zip};
use odf_peaks_shared::{band_orders, order_from_ncoef, order_to_jrange};

use crate::basis::projector::split_trailing;
use crate::error::{PeakError, PeakResult};

/// Band power of one coefficient vector, ascending by even order.
///
/// Order `l` covers the `2l+1` coefficients `j0..=jf` with `j0 = l(l−1)/2` and
/// `jf = j0 + 2l`; its power is the sum of their squares.
///
/// # Examples
///
/// ```
/// use ndarray::Array1;
/// use odf_peaks_core::metrics::sh_power;
///
/// let coefficients = Array1::from(vec![2.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
/// let power = sh_power(coefficients.view()).unwrap();
/// assert_eq!(power.to_vec(), vec![4.0, 2.0]);
/// ```
pub fn sh_power(coefficients: ArrayView1<f64>) -> PeakResult<Array1<f64>> {
    let ncoef = coefficients.len();
    let order = order_from_ncoef(ncoef).ok_or(PeakError::InvalidCoefficientCount { ncoef })?;
    Ok(band_power(coefficients, order))
}

fn band_power(coefficients: ArrayView1<f64>, order: usize) -> Array1<f64> {
    band_orders(order)
        .map(|l| {
            let (j0, jf) = order_to_jrange(l);
            coefficients
                .slice(s![j0..=jf])
                .iter()
                .map(|c| c * c)
                .sum()
        })
        .collect()
}

/// Band power of every voxel; the trailing coefficient axis becomes `L/2+1`
/// band powers.
pub fn sh_power_field(field: ArrayViewD<f64>) -> PeakResult<ArrayD<f64>> {
    let (leading, ncoef) = split_trailing(&field)?;
    let order = order_from_ncoef(ncoef).ok_or(PeakError::InvalidCoefficientCount { ncoef })?;

    let mut out_shape = leading.to_vec();
    out_shape.push(order / 2 + 1);
    let mut out = ArrayD::zeros(IxDyn(&out_shape));

    let last = Axis(field.ndim() - 1);
    Zip::from(out.lanes_mut(last))
        .and(field.lanes(last))
        .par_for_each(|mut bands, coefficients| {
            bands.assign(&band_power(coefficients, order));
        });
    Ok(out)
}
