//! Projection of SH coefficient vectors onto a direction set.
//!
//! The projection matrix `B` has shape `[ncoef × N]` so that a row vector of
//! coefficients maps to sampled values through `coefficients · B`. Matrices are
//! built once per `(order, direction-set identity)` and shared process-wide
//! for as long as the direction set is alive.

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, ArrayViewD, IxDyn, Zip};
use odf_peaks_shared::{order_from_ncoef, order_to_ncoef};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::harmonics::{real_sh_descoteaux, sh_index_list};
use crate::error::{PeakError, PeakResult};
use crate::sphere::direction_set::DirectionSetHandle;
use crate::sphere::SphericalDirectionSet;

static GLOBAL_CACHE: Lazy<BasisMatrixCache> = Lazy::new(BasisMatrixCache::new);

/// Process-wide store of projection matrices keyed by `(order, set id)`.
///
/// Entries are immutable once inserted; concurrent readers never block each
/// other. Matrices of dropped direction sets are released on the next
/// insertion.
#[derive(Debug, Default)]
pub struct BasisMatrixCache {
    matrices: RwLock<HashMap<(usize, u64), CachedMatrix>>,
}

#[derive(Debug)]
struct CachedMatrix {
    owner: DirectionSetHandle,
    matrix: Arc<Array2<f64>>,
}

impl BasisMatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static BasisMatrixCache {
        &GLOBAL_CACHE
    }

    /// Fetch the matrix for `order` on `sphere`, building it on first use.
    pub fn get_or_build(&self, order: usize, sphere: &SphericalDirectionSet) -> Arc<Array2<f64>> {
        let key = (order, sphere.id());
        if let Some(entry) = self.matrices.read().get(&key) {
            return Arc::clone(&entry.matrix);
        }

        // Built outside the lock; a concurrent builder for the same key loses
        // the race and adopts the stored matrix.
        let built = Arc::new(build_matrix(order, sphere));
        let mut guard = self.matrices.write();
        let before = guard.len();
        guard.retain(|_, entry| entry.owner.is_live());
        if guard.len() < before {
            tracing::debug!(
                released = before - guard.len(),
                "released matrices of dropped direction sets"
            );
        }
        let stored = guard.entry(key).or_insert_with(|| {
            tracing::debug!(
                order,
                set_id = sphere.id(),
                directions = sphere.len(),
                "built SH projection matrix"
            );
            CachedMatrix {
                owner: sphere.downgrade(),
                matrix: built,
            }
        });
        Arc::clone(&stored.matrix)
    }

    pub fn contains(&self, order: usize, sphere: &SphericalDirectionSet) -> bool {
        self.matrices.read().contains_key(&(order, sphere.id()))
    }

    pub fn len(&self) -> usize {
        self.matrices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.read().is_empty()
    }
}

fn build_matrix(order: usize, sphere: &SphericalDirectionSet) -> Array2<f64> {
    let indices = sh_index_list(order);
    let angles: Vec<(f64, f64)> = (0..sphere.len())
        .map(|i| sphere.polar_coordinates(i))
        .collect();

    let mut matrix = Array2::zeros((indices.len(), sphere.len()));
    Zip::indexed(&mut matrix).par_for_each(|(j, i), out| {
        let (l, m) = indices[j];
        let (theta, phi) = angles[i];
        *out = real_sh_descoteaux(l, m, theta, phi);
    });
    matrix
}

/// Maps SH coefficient vectors of one order onto a direction set.
///
/// # Examples
///
/// ```
/// use ndarray::Array1;
/// use odf_peaks_core::{SphericalBasisProjector, SphericalDirectionSet};
///
/// let sphere = SphericalDirectionSet::icosphere(2);
/// let projector = SphericalBasisProjector::new(15, &sphere).unwrap();
/// assert_eq!(projector.order(), 4);
///
/// let mut coefficients = Array1::zeros(15);
/// coefficients[0] = 1.0;
/// let sampled = projector.project(coefficients.view()).unwrap();
/// assert_eq!(sampled.len(), sphere.len());
/// ```
#[derive(Debug, Clone)]
pub struct SphericalBasisProjector {
    sphere: SphericalDirectionSet,
    order: usize,
    matrix: Arc<Array2<f64>>,
}

impl SphericalBasisProjector {
    /// Create a projector for coefficient vectors of length `ncoef`.
    ///
    /// Fails with [`PeakError::InvalidCoefficientCount`] when `ncoef` is not
    /// `(L+1)(L+2)/2` for an even `L`.
    pub fn new(ncoef: usize, sphere: &SphericalDirectionSet) -> PeakResult<Self> {
        let order = order_from_ncoef(ncoef).ok_or(PeakError::InvalidCoefficientCount { ncoef })?;
        Ok(Self::with_order(order, sphere))
    }

    /// Create a projector for an explicit even order, using the global cache.
    pub fn with_order(order: usize, sphere: &SphericalDirectionSet) -> Self {
        Self::with_cache(order, sphere, BasisMatrixCache::global())
    }

    pub fn with_cache(order: usize, sphere: &SphericalDirectionSet, cache: &BasisMatrixCache) -> Self {
        Self {
            sphere: sphere.clone(),
            order,
            matrix: cache.get_or_build(order, sphere),
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn ncoef(&self) -> usize {
        order_to_ncoef(self.order)
    }

    pub fn sphere(&self) -> &SphericalDirectionSet {
        &self.sphere
    }

    /// The `[ncoef × N]` projection matrix.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Sample a single coefficient vector over every direction.
    pub fn project(&self, coefficients: ArrayView1<f64>) -> PeakResult<Array1<f64>> {
        if coefficients.len() != self.ncoef() {
            return Err(PeakError::shape_mismatch(
                self.ncoef(),
                coefficients.len(),
                "SH coefficient vector",
            ));
        }
        Ok(coefficients.dot(self.matrix.as_ref()))
    }

    /// Sample a `[voxels × ncoef]` block, producing `[voxels × N]`.
    pub fn project_rows(&self, coefficients: ArrayView2<f64>) -> PeakResult<Array2<f64>> {
        if coefficients.ncols() != self.ncoef() {
            return Err(PeakError::shape_mismatch(
                self.ncoef(),
                coefficients.ncols(),
                "SH coefficient rows",
            ));
        }
        Ok(coefficients.dot(self.matrix.as_ref()))
    }

    /// Sample a field whose trailing axis holds coefficients.
    ///
    /// The output keeps the leading axes and replaces the trailing axis with
    /// one value per direction.
    pub fn project_field(&self, field: ArrayViewD<f64>) -> PeakResult<ArrayD<f64>> {
        let (leading, ncoef) = split_trailing(&field)?;
        if ncoef != self.ncoef() {
            return Err(PeakError::shape_mismatch(
                self.ncoef(),
                ncoef,
                "SH coefficient field trailing axis",
            ));
        }
        let voxels: usize = leading.iter().product();
        let rows = field
            .to_shape((voxels, ncoef))
            .map_err(|_| PeakError::shape_mismatch(field.shape(), (voxels, ncoef), "SH field reshape"))?;
        let sampled = self.project_rows(rows.view())?;

        let mut out_shape = leading.to_vec();
        out_shape.push(self.sphere.len());
        sampled
            .into_shape(IxDyn(&out_shape))
            .map_err(|_| PeakError::shape_mismatch(&out_shape, voxels, "sampled field reshape"))
    }
}

/// Sample every voxel of an SH field over `sphere`.
///
/// Equivalent to building a [`SphericalBasisProjector`] from the field's
/// trailing axis and calling [`SphericalBasisProjector::project_field`].
pub fn sh_to_sf(field: ArrayViewD<f64>, sphere: &SphericalDirectionSet) -> PeakResult<ArrayD<f64>> {
    let (_, ncoef) = split_trailing(&field)?;
    SphericalBasisProjector::new(ncoef, sphere)?.project_field(field)
}

pub(crate) fn split_trailing<'a>(field: &'a ArrayViewD<f64>) -> PeakResult<(&'a [usize], usize)> {
    match field.shape().split_last() {
        Some((&last, leading)) => Ok((leading, last)),
        None => Err(PeakError::shape_mismatch(
            "at least one axis",
            field.shape(),
            "SH coefficient field",
        )),
    }
}
