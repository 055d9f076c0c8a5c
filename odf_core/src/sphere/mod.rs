//! Discretizations of the unit sphere used to sample ODFs.
//!
//! A [`SphericalDirectionSet`] is an immutable catalog of unit directions
//! plus a neighbor relation. Peaks are local maxima with respect to that
//! relation, so every constructor either receives the adjacency explicitly or
//! derives it from the geometry.

pub mod direction_set;
pub mod icosphere;

pub use direction_set::{SphericalDirectionSet, NEIGHBOR_SLACK};
pub use icosphere::{icosphere_vertex_count, MAX_SUBDIVISIONS, STANDARD_SUBDIVISIONS};
