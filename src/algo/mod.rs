//! Mesh algorithms.
//!
//! - **Primitives**: deterministic cube and sphere builders
//! - **Transform**: affine maps applied to all or part of a mesh
//! - **Volume**: signed enclosed volume, whole or region-restricted
//! - **Projection**: closest point on the surface, backed by an AABB tree

pub mod aabb_tree;
pub mod primitives;
pub mod projection;
pub mod transform;
pub mod volume;

pub use aabb_tree::{Aabb, AabbTree, AabbTreeOptions, AabbTreeStats};
pub use primitives::{make_cube, make_sphere, SphereParams};
pub use projection::{
    closest_point_on_triangle, find_projection, find_projections, MeshPart, MeshProjection,
    MeshTriPoint, PointOnFace, ProjectionOptions, TriBary,
};
pub use transform::{transform, AffineXf};
pub use volume::{volume, volume_of_points};
