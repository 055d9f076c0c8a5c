use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use glam::DVec3;
use odf_peaks_shared::DirectionAngle;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rayon::prelude::*;

use super::icosphere::{build_icosphere, STANDARD_SUBDIVISIONS};
use crate::error::{PeakError, PeakResult};

/// Two directions closer than this (radians) are considered coincident.
const COINCIDENT_EPS: f64 = 1e-9;

/// Derived adjacency links a vertex to every direction within this multiple of
/// its nearest-neighbor angle.
pub const NEIGHBOR_SLACK: f64 = 1.35;

static NEXT_SET_ID: AtomicU64 = AtomicU64::new(1);

/// One catalog per icosphere depth, shared by every caller.
static ICOSPHERES: Lazy<Mutex<HashMap<u32, SphericalDirectionSet>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug)]
struct DirectionSetInner {
    id: u64,
    vertices: Vec<DVec3>,
    neighbors: Vec<Vec<usize>>,
}

/// Immutable catalog of unit directions with a neighbor relation.
///
/// Cloning is cheap and preserves identity: clones share the same catalog and
/// the same [`id`](Self::id), which keys the basis-matrix cache.
///
/// # Examples
///
/// ```
/// use odf_peaks_core::SphericalDirectionSet;
///
/// let sphere = SphericalDirectionSet::icosphere(2);
/// assert_eq!(sphere.len(), 162);
/// assert!(sphere.neighbors(0).len() >= 5);
/// ```
#[derive(Debug, Clone)]
pub struct SphericalDirectionSet {
    inner: Arc<DirectionSetInner>,
}

impl SphericalDirectionSet {
    /// Build a set from directions and an explicit undirected edge list.
    ///
    /// Directions are normalized; zero-length or non-finite directions and
    /// out-of-range or self-referencing edges are rejected.
    pub fn new(vertices: Vec<DVec3>, edges: &[(usize, usize)]) -> PeakResult<Self> {
        let vertices = normalize_vertices(vertices)?;
        let n = vertices.len();
        let mut neighbors = vec![Vec::new(); n];
        for &(a, b) in edges {
            if a >= n || b >= n {
                return Err(PeakError::invalid_direction_set(format!(
                    "edge ({a}, {b}) references a direction outside 0..{n}"
                )));
            }
            if a == b {
                return Err(PeakError::invalid_direction_set(format!(
                    "edge ({a}, {b}) is a self loop"
                )));
            }
            neighbors[a].push(b);
            neighbors[b].push(a);
        }
        Ok(Self::from_parts(vertices, neighbors))
    }

    /// Build a set from a triangulation of the directions.
    pub fn from_faces(vertices: Vec<DVec3>, faces: &[[usize; 3]]) -> PeakResult<Self> {
        let edges: Vec<(usize, usize)> = faces
            .iter()
            .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
            .collect();
        Self::new(vertices, &edges)
    }

    /// Build a set from bare directions, deriving adjacency from spacing.
    ///
    /// Direction `j` neighbors `i` when their great-circle angle is at most
    /// [`NEIGHBOR_SLACK`] times the angle from `i` to its nearest direction;
    /// the relation is then made symmetric.
    pub fn from_vertices(vertices: Vec<DVec3>) -> PeakResult<Self> {
        let vertices = normalize_vertices(vertices)?;
        let n = vertices.len();

        let nearest: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .filter(|&j| j != i)
                    .map(|j| great_circle(vertices[i], vertices[j]))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        if let Some(i) = nearest.iter().position(|&d| d < COINCIDENT_EPS) {
            return Err(PeakError::invalid_direction_set(format!(
                "direction {i} coincides with another direction"
            )));
        }

        let directed: Vec<Vec<usize>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let reach = nearest[i] * NEIGHBOR_SLACK;
                (0..n)
                    .filter(|&j| j != i && great_circle(vertices[i], vertices[j]) <= reach)
                    .collect()
            })
            .collect();

        let mut neighbors = vec![Vec::new(); n];
        for (i, list) in directed.into_iter().enumerate() {
            for j in list {
                neighbors[i].push(j);
                neighbors[j].push(i);
            }
        }
        Ok(Self::from_parts(vertices, neighbors))
    }

    /// Subdivided icosahedron with neighbors taken from its triangles.
    ///
    /// Built once per depth; later calls return the same catalog, so they
    /// share its identity and its cached basis matrices.
    pub fn icosphere(subdivisions: u32) -> Self {
        ICOSPHERES
            .lock()
            .entry(subdivisions)
            .or_insert_with(|| Self::triangulated_icosphere(subdivisions))
            .clone()
    }

    fn triangulated_icosphere(subdivisions: u32) -> Self {
        let (vertices, faces) = build_icosphere(subdivisions);
        let mut neighbors = vec![Vec::new(); vertices.len()];
        for &[a, b, c] in &faces {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                neighbors[u].push(v);
                neighbors[v].push(u);
            }
        }
        Self::from_parts(vertices, neighbors)
    }

    /// The process-wide standard catalog (642-direction icosphere).
    pub fn standard() -> Self {
        Self::icosphere(STANDARD_SUBDIVISIONS)
    }

    fn from_parts(vertices: Vec<DVec3>, mut neighbors: Vec<Vec<usize>>) -> Self {
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }
        Self {
            inner: Arc::new(DirectionSetInner {
                id: NEXT_SET_ID.fetch_add(1, Ordering::Relaxed),
                vertices,
                neighbors,
            }),
        }
    }

    /// Identity of this catalog; shared by clones, unique across constructions.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub(crate) fn downgrade(&self) -> DirectionSetHandle {
        DirectionSetHandle(Arc::downgrade(&self.inner))
    }

    pub fn len(&self) -> usize {
        self.inner.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.inner.vertices
    }

    pub fn vertex(&self, index: usize) -> DVec3 {
        self.inner.vertices[index]
    }

    /// Sorted indices of the directions adjacent to `index`.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.inner.neighbors[index]
    }

    /// Undirected edges `(a, b)` with `a < b`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.inner
            .neighbors
            .iter()
            .enumerate()
            .flat_map(|(a, list)| list.iter().filter(move |&&b| a < b).map(move |&b| (a, b)))
    }

    /// Angle in degrees between two catalog directions.
    pub fn angle_deg(&self, a: usize, b: usize, measure: DirectionAngle) -> f64 {
        measure.between(self.vertex(a).to_array(), self.vertex(b).to_array())
    }

    /// Polar angle θ ∈ [0, π] and azimuth φ ∈ (−π, π] of a direction.
    pub fn polar_coordinates(&self, index: usize) -> (f64, f64) {
        let v = self.vertex(index);
        (v.z.clamp(-1.0, 1.0).acos(), v.y.atan2(v.x))
    }
}

/// Non-owning reference to a catalog, used to release derived data once the
/// catalog itself is gone.
#[derive(Debug, Clone)]
pub(crate) struct DirectionSetHandle(Weak<DirectionSetInner>);

impl DirectionSetHandle {
    pub(crate) fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl PartialEq for SphericalDirectionSet {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

fn normalize_vertices(vertices: Vec<DVec3>) -> PeakResult<Vec<DVec3>> {
    if vertices.is_empty() {
        return Err(PeakError::invalid_direction_set("no directions supplied"));
    }
    vertices
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let length = v.length();
            if !v.is_finite() || length == 0.0 {
                Err(PeakError::invalid_direction_set(format!(
                    "direction {i} ({v:?}) cannot be normalized"
                )))
            } else {
                Ok(v / length)
            }
        })
        .collect()
}

fn great_circle(a: DVec3, b: DVec3) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn great_circle_four() -> Vec<DVec3> {
        vec![
            DVec3::X,
            DVec3::Y,
            DVec3::NEG_X,
            DVec3::NEG_Y,
        ]
    }

    #[test]
    fn explicit_edges_are_symmetric() {
        let set = SphericalDirectionSet::new(great_circle_four(), &[(0, 1), (1, 2)]).unwrap();
        assert_eq!(set.neighbors(0), &[1]);
        assert_eq!(set.neighbors(1), &[0, 2]);
        assert_eq!(set.neighbors(3), &[] as &[usize]);
        assert_eq!(set.edges().count(), 2);
    }

    #[test]
    fn rejects_bad_edges_and_vertices() {
        assert!(SphericalDirectionSet::new(great_circle_four(), &[(0, 4)]).is_err());
        assert!(SphericalDirectionSet::new(great_circle_four(), &[(2, 2)]).is_err());
        assert!(SphericalDirectionSet::new(vec![DVec3::ZERO], &[]).is_err());
        assert!(SphericalDirectionSet::new(Vec::new(), &[]).is_err());
    }

    #[test]
    fn derived_adjacency_on_great_circle_is_a_ring() {
        let set = SphericalDirectionSet::from_vertices(great_circle_four()).unwrap();
        assert_eq!(set.neighbors(0), &[1, 3]);
        assert_eq!(set.neighbors(1), &[0, 2]);
        assert_eq!(set.neighbors(2), &[1, 3]);
        assert_eq!(set.neighbors(3), &[0, 2]);
    }

    #[test]
    fn derived_adjacency_rejects_duplicates() {
        let err = SphericalDirectionSet::from_vertices(vec![DVec3::X, DVec3::X * 2.0]);
        assert!(matches!(err, Err(PeakError::InvalidDirectionSet { .. })));
    }

    #[test]
    fn vertices_are_normalized() {
        let set =
            SphericalDirectionSet::new(vec![DVec3::new(3.0, 0.0, 4.0), DVec3::Z * 0.5], &[]).unwrap();
        assert!((set.vertex(0).length() - 1.0).abs() < 1e-12);
        assert!((set.vertex(1) - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn icosphere_vertices_have_five_or_six_neighbors() {
        let set = SphericalDirectionSet::icosphere(2);
        for i in 0..set.len() {
            let degree = set.neighbors(i).len();
            assert!(degree == 5 || degree == 6, "vertex {i} has degree {degree}");
        }
    }

    #[test]
    fn clones_share_identity() {
        let a = SphericalDirectionSet::from_vertices(great_circle_four()).unwrap();
        let b = a.clone();
        let c = SphericalDirectionSet::from_vertices(great_circle_four()).unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn icospheres_are_shared_per_depth() {
        let a = SphericalDirectionSet::icosphere(1);
        let b = SphericalDirectionSet::icosphere(1);
        assert_eq!(a, b);
        assert_ne!(a, SphericalDirectionSet::icosphere(0));
        assert_eq!(
            SphericalDirectionSet::standard(),
            SphericalDirectionSet::icosphere(STANDARD_SUBDIVISIONS)
        );
    }

    #[test]
    fn handle_tracks_catalog_lifetime() {
        let set = SphericalDirectionSet::from_vertices(great_circle_four()).unwrap();
        let handle = set.downgrade();
        let clone = set.clone();
        drop(set);
        assert!(handle.is_live());
        drop(clone);
        assert!(!handle.is_live());
    }

    #[test]
    fn standard_catalog_is_stable() {
        let a = SphericalDirectionSet::standard();
        let b = SphericalDirectionSet::standard();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.len(), 642);
    }

    #[test]
    fn polar_coordinates_of_axes() {
        let set = SphericalDirectionSet::new(vec![DVec3::Z, DVec3::Y], &[]).unwrap();
        let (theta, _) = set.polar_coordinates(0);
        assert!(theta.abs() < 1e-12);
        let (theta, phi) = set.polar_coordinates(1);
        assert!((theta - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((phi - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn angle_measures() {
        let set = SphericalDirectionSet::new(great_circle_four(), &[]).unwrap();
        assert!((set.angle_deg(0, 2, DirectionAngle::GreatCircle) - 180.0).abs() < 1e-9);
        assert!(set.angle_deg(0, 2, DirectionAngle::Axial).abs() < 1e-9);
        assert!((set.angle_deg(0, 1, DirectionAngle::Axial) - 90.0).abs() < 1e-9);
    }
}
