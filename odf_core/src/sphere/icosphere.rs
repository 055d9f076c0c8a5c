//! Icosahedron subdivision meshes.
//!
//! Every subdivision splits each triangle into four through its edge
//! midpoints (projected back onto the sphere), so a mesh of depth `n` has
//! `10·4ⁿ + 2` vertices. The mesh is centrally symmetric: each vertex has its
//! antipode in the set.

use std::collections::HashMap;

use glam::DVec3;

/// Subdivision depth of the standard catalog (642 directions).
pub const STANDARD_SUBDIVISIONS: u32 = 3;

/// Deepest subdivision accepted by configuration (40 962 directions).
pub const MAX_SUBDIVISIONS: u32 = 6;

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Number of vertices of an icosphere with `subdivisions` levels.
pub const fn icosphere_vertex_count(subdivisions: u32) -> usize {
    10 * 4usize.pow(subdivisions) + 2
}

fn icosahedron_vertices() -> Vec<DVec3> {
    let phi = (1.0 + 5f64.sqrt()) / 2.0;
    [
        (-1.0, phi, 0.0),
        (1.0, phi, 0.0),
        (-1.0, -phi, 0.0),
        (1.0, -phi, 0.0),
        (0.0, -1.0, phi),
        (0.0, 1.0, phi),
        (0.0, -1.0, -phi),
        (0.0, 1.0, -phi),
        (phi, 0.0, -1.0),
        (phi, 0.0, 1.0),
        (-phi, 0.0, -1.0),
        (-phi, 0.0, 1.0),
    ]
    .into_iter()
    .map(|(x, y, z)| DVec3::new(x, y, z).normalize())
    .collect()
}

/// Build the vertices and triangular faces of a subdivided icosahedron.
pub(crate) fn build_icosphere(subdivisions: u32) -> (Vec<DVec3>, Vec<[usize; 3]>) {
    let mut vertices = icosahedron_vertices();
    let mut faces: Vec<[usize; 3]> = ICOSAHEDRON_FACES.to_vec();

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut next_faces = Vec::with_capacity(faces.len() * 4);

        for &[a, b, c] in &faces {
            let ab = midpoint(&mut vertices, &mut midpoints, a, b);
            let bc = midpoint(&mut vertices, &mut midpoints, b, c);
            let ca = midpoint(&mut vertices, &mut midpoints, c, a);
            next_faces.push([a, ab, ca]);
            next_faces.push([b, bc, ab]);
            next_faces.push([c, ca, bc]);
            next_faces.push([ab, bc, ca]);
        }
        faces = next_faces;
    }

    (vertices, faces)
}

fn midpoint(
    vertices: &mut Vec<DVec3>,
    cache: &mut HashMap<(usize, usize), usize>,
    a: usize,
    b: usize,
) -> usize {
    let key = if a < b { (a, b) } else { (b, a) };
    *cache.entry(key).or_insert_with(|| {
        vertices.push((vertices[a] + vertices[b]).normalize());
        vertices.len() - 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_counts_follow_subdivision_formula() {
        for level in 0..=3 {
            let (vertices, faces) = build_icosphere(level);
            assert_eq!(vertices.len(), icosphere_vertex_count(level));
            assert_eq!(faces.len(), 20 * 4usize.pow(level));
        }
    }

    #[test]
    fn vertices_lie_on_unit_sphere() {
        let (vertices, _) = build_icosphere(2);
        for v in &vertices {
            assert!((v.length() - 1.0).abs() < 1e-12, "|v| = {}", v.length());
        }
    }

    #[test]
    fn mesh_is_centrally_symmetric() {
        let (vertices, _) = build_icosphere(2);
        for v in &vertices {
            let has_antipode = vertices.iter().any(|w| (*w + *v).length() < 1e-9);
            assert!(has_antipode, "no antipode for {v:?}");
        }
    }
}
