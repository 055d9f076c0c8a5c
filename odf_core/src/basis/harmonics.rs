//! Real, symmetric spherical harmonics.
//!
//! Index `j` runs over even orders `l = 0, 2, …, L` and, within each order,
//! degrees `m = −l, …, l`. The real basis function for `(l, m)` is
//!
//! ```text
//!   m < 0 : √2 · K(l,|m|) · P_l^|m|(cos θ) · cos(|m| φ)
//!   m = 0 :      K(l, 0)  · P_l^0(cos θ)
//!   m > 0 : √2 · K(l, m)  · P_l^m(cos θ)  · sin(m φ)
//! ```
//!
//! with `K(l,m) = sqrt((2l+1)/(4π) · (l−m)!/(l+m)!)` and `P_l^m` the associated
//! Legendre function including the Condon–Shortley phase.

use std::f64::consts::{PI, SQRT_2};

use odf_peaks_shared::band_orders;

/// `(l, m)` pairs in coefficient order for a basis truncated at `max_order`.
pub fn sh_index_list(max_order: usize) -> Vec<(usize, i64)> {
    band_orders(max_order)
        .flat_map(|l| (-(l as i64)..=l as i64).map(move |m| (l, m)))
        .collect()
}

/// Evaluate the real basis function `(l, m)` at polar angle `theta`, azimuth `phi`.
pub fn real_sh_descoteaux(l: usize, m: i64, theta: f64, phi: f64) -> f64 {
    let am = m.unsigned_abs() as usize;
    let legendre = associated_legendre(l, am, theta.cos());
    let k = normalization(l, am);
    match m {
        0 => k * legendre,
        m if m < 0 => SQRT_2 * k * legendre * (am as f64 * phi).cos(),
        _ => SQRT_2 * k * legendre * (am as f64 * phi).sin(),
    }
}

/// `sqrt((2l+1)/(4π) · (l−m)!/(l+m)!)`, with the factorial ratio taken as a
/// running product to stay finite for high orders.
fn normalization(l: usize, m: usize) -> f64 {
    let ratio: f64 = ((l - m + 1)..=(l + m)).map(|k| 1.0 / k as f64).product();
    ((2 * l + 1) as f64 / (4.0 * PI) * ratio).sqrt()
}

/// `P_l^m(x)` for `0 <= m <= l`, Condon–Shortley phase included.
fn associated_legendre(l: usize, m: usize, x: f64) -> f64 {
    debug_assert!(m <= l);
    // P_m^m = (-1)^m (2m-1)!! (1-x²)^{m/2}
    let somx2 = ((1.0 - x) * (1.0 + x)).max(0.0).sqrt();
    let mut pmm = 1.0;
    let mut fact = 1.0;
    for _ in 0..m {
        pmm *= -fact * somx2;
        fact += 2.0;
    }
    if l == m {
        return pmm;
    }

    let mut pmmp1 = x * (2 * m + 1) as f64 * pmm;
    if l == m + 1 {
        return pmmp1;
    }

    let mut pll = 0.0;
    for ll in (m + 2)..=l {
        pll = ((2 * ll - 1) as f64 * x * pmmp1 - (ll + m - 1) as f64 * pmm) / (ll - m) as f64;
        pmm = pmmp1;
        pmmp1 = pll;
    }
    pll
}
