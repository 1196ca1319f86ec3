//! # Halfmesh
//!
//! A half-edge triangle mesh kernel with region-aware geometry queries.
//!
//! Halfmesh stores a surface as a point array plus a flat arena of paired
//! half-edges, and provides construction, affine transformation, signed
//! volume and closest-point projection on top of it.
//!
//! ## Features
//!
//! - **Half-edge topology**: flat arena, `E(2k)` and `E(2k+1)` opposite, typed ids
//! - **Regions**: bitsets over vertex, edge and face ids scope every operation
//! - **Primitives**: deterministic cube and sphere builders
//! - **Projection**: lazily built AABB tree, cached on the mesh until it changes
//!
//! ## Quick Start
//!
//! ```
//! use halfmesh::prelude::*;
//! use nalgebra::{Point3, Vector3};
//!
//! let mut cube = make_cube(&Vector3::repeat(1.0), &Point3::new(-0.5, -0.5, -0.5)).unwrap();
//! assert!((volume(&cube, None).unwrap() - 1.0).abs() < 1e-12);
//!
//! // Move half of the corners.
//! let region = VertBitSet::from_ids(8, [0, 2, 4, 6].map(VertId::new));
//! transform(&mut cube, &AffineXf::translation(Vector3::repeat(1.0)), Some(&region)).unwrap();
//! assert_eq!(*cube.point(VertId::new(0)), Point3::new(0.5, 0.5, 0.5));
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use halfmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//!
//! let faces = vec![
//!     [0, 2, 1], // bottom
//!     [0, 1, 3], // front
//!     [1, 2, 3], // right
//!     [2, 0, 3], // left
//! ];
//!
//! let mesh = from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_valid_points(), 4);
//! assert_eq!(mesh.num_valid_faces(), 4);
//! assert!(mesh.topology().is_closed());
//! ```
//!
//! ## Closest Points
//!
//! ```
//! use halfmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let sphere = make_sphere(&SphereParams::new(1.0, 1000)).unwrap();
//! let hit = find_projection(
//!     &Point3::new(1.0, 2.0, 3.0),
//!     &MeshPart::new(&sphere),
//!     &ProjectionOptions::default(),
//! )
//! .unwrap()
//! .unwrap();
//! let [v0, v1, v2] = sphere.get_left_tri_verts(hit.mtp.e).unwrap();
//! println!("closest point {} on face {:?} ({:?}, {:?}, {:?})", hit.proj.point, hit.proj.face, v0, v1, v2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use halfmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{
        find_projection, make_cube, make_sphere, transform, volume, volume_of_points, AffineXf,
        MeshPart, MeshProjection, MeshTriPoint, PointOnFace, ProjectionOptions, SphereParams,
        TriBary,
    };
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        from_triangles, to_triangles, EdgeBitSet, EdgeId, FaceBitSet, FaceId, Mesh, MeshId,
        MeshTopology, UndirectedEdgeId, VertBitSet, VertId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
