//! Index arithmetic for symmetric (even-order) real spherical-harmonic bases.
//!
//! Coefficients are laid out by ascending even order `0, 2, 4, …, L`; order `l`
//! occupies a contiguous block of `2l + 1` coefficients. A basis truncated at
//! order `L` therefore has `(L + 1)(L + 2) / 2` coefficients.

/// Number of coefficients of an even-order basis truncated at `order`.
///
/// ```
/// use odf_peaks_shared::order_to_ncoef;
///
/// assert_eq!(order_to_ncoef(4), 15);
/// assert_eq!(order_to_ncoef(8), 45);
/// ```
pub const fn order_to_ncoef(order: usize) -> usize {
    (order + 1) * (order + 2) / 2
}

/// Inverse of [`order_to_ncoef`].
///
/// Returns `None` when `ncoef` does not correspond exactly to an even order.
pub fn order_from_ncoef(ncoef: usize) -> Option<usize> {
    if ncoef == 0 {
        return None;
    }
    // L = (-3 + sqrt(1 + 8 n)) / 2
    let disc = 1 + 8 * ncoef;
    let root = integer_sqrt(disc);
    if root * root != disc || root < 3 {
        return None;
    }
    let order = (root - 3) / 2;
    if order % 2 != 0 || order_to_ncoef(order) != ncoef {
        return None;
    }
    Some(order)
}

/// Inclusive coefficient index range `[j0, jf]` occupied by the band of `order`.
///
/// `order` must be even.
pub const fn order_to_jrange(order: usize) -> (usize, usize) {
    let j0 = if order == 0 { 0 } else { order * (order - 1) / 2 };
    (j0, j0 + 2 * order)
}

/// Even orders `0, 2, …, max_order`.
pub fn band_orders(max_order: usize) -> impl Iterator<Item = usize> {
    (0..=max_order).step_by(2)
}

fn integer_sqrt(value: usize) -> usize {
    let mut root = (value as f64).sqrt() as usize;
    while root * root > value {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= value {
        root += 1;
    }
    root
}
