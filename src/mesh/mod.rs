//! Core mesh data structures.
//!
//! This module provides the half-edge mesh representation and related types
//! for representing and manipulating triangle meshes.
//!
//! # Overview
//!
//! The primary type is [`Mesh`], which owns a point store (one coordinate per
//! vertex id) and a [`MeshTopology`] holding half-edge connectivity. Meshes
//! also carry a lazily built bounding-volume tree used by projection queries;
//! every mutating method drops it so the next query rebuilds it.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertId`] - Identifies a vertex
//! - [`EdgeId`] - Identifies a half-edge (`E(2k)` and `E(2k+1)` are opposite)
//! - [`UndirectedEdgeId`] - Identifies a pair of half-edges
//! - [`FaceId`] - Identifies a face
//!
//! Subsets of each identifier space are [`TypedBitSet`]s.
//!
//! # Construction
//!
//! ```
//! use halfmesh::mesh::from_triangles;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mesh = from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
//! assert_eq!(mesh.num_valid_faces(), 1);
//! ```

mod bitset;
mod builder;
mod index;
mod topology;

use std::sync::{Arc, OnceLock};

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::algo::aabb_tree::{AabbTree, AabbTreeOptions};
use crate::error::Result;

pub use bitset::{EdgeBitSet, FaceBitSet, Iter as BitSetIter, TypedBitSet, VertBitSet};
pub use builder::{from_triangles, to_triangles};
pub use index::{EdgeId, FaceId, MeshId, UndirectedEdgeId, VertId};
pub use topology::{HalfEdgeRecord, MeshTopology, OutEdgeIter};

/// A triangle mesh: points plus half-edge connectivity.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    points: Vec<Point3<f64>>,
    topology: MeshTopology,
    /// Whole-mesh face tree; empty until the first query after a mutation.
    tree: OnceLock<Arc<AabbTree>>,
}

impl Mesh {
    pub(crate) fn from_parts(points: Vec<Point3<f64>>, topology: MeshTopology) -> Self {
        Self {
            points,
            topology,
            tree: OnceLock::new(),
        }
    }

    // ==================== Accessors ====================

    /// All stored points, indexed by vertex id.
    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// The position of a vertex.
    #[inline]
    pub fn point(&self, v: VertId) -> &Point3<f64> {
        &self.points[v.index()]
    }

    /// The connectivity of this mesh.
    #[inline]
    pub fn topology(&self) -> &MeshTopology {
        &self.topology
    }

    /// Number of valid vertices.
    #[inline]
    pub fn num_valid_points(&self) -> usize {
        self.topology.num_valid_verts()
    }

    /// Number of valid faces.
    #[inline]
    pub fn num_valid_faces(&self) -> usize {
        self.topology.num_valid_faces()
    }

    /// The set of valid vertices.
    #[inline]
    pub fn valid_points(&self) -> &VertBitSet {
        self.topology.valid_verts()
    }

    /// The set of valid faces.
    #[inline]
    pub fn valid_faces(&self) -> &FaceBitSet {
        self.topology.valid_faces()
    }

    /// See [`MeshTopology::get_left_tri_verts`].
    pub fn get_left_tri_verts(&self, e: EdgeId) -> Result<[VertId; 3]> {
        self.topology.get_left_tri_verts(e)
    }

    // ==================== Mutation ====================

    /// Move a vertex.
    pub fn set_point(&mut self, v: VertId, pos: Point3<f64>) {
        self.points_mut()[v.index()] = pos;
    }

    /// Mutable access to the point store. Drops the cached face tree.
    pub(crate) fn points_mut(&mut self) -> &mut [Point3<f64>] {
        self.invalidate_caches();
        &mut self.points
    }

    /// Delete faces, together with edges and vertices no face uses any more.
    ///
    /// Deleted ids are never handed out again; their points stay in the
    /// point store but are no longer valid.
    pub fn delete_faces(&mut self, region: &FaceBitSet) {
        self.invalidate_caches();
        self.topology.delete_faces(region);
    }

    /// Drop everything derived from points or topology.
    pub fn invalidate_caches(&mut self) {
        if self.tree.take().is_some() {
            debug!("face tree invalidated");
        }
    }

    // ==================== Queries ====================

    /// The tree over all valid faces, built on first use.
    pub(crate) fn aabb_tree(&self, options: &AabbTreeOptions) -> Arc<AabbTree> {
        self.tree
            .get_or_init(|| {
                Arc::new(AabbTree::build(
                    &self.points,
                    &self.topology,
                    self.topology.valid_faces(),
                    options,
                ))
            })
            .clone()
    }

    /// True if the face tree is currently cached.
    pub fn has_cached_tree(&self) -> bool {
        self.tree.get().is_some()
    }

    // ==================== Geometry ====================

    /// Positions of the three vertices of a face, in winding order.
    pub fn triangle_points(&self, f: FaceId) -> [Point3<f64>; 3] {
        self.topology.face_verts(f).map(|v| self.points[v.index()])
    }

    /// Unit normal of a face.
    pub fn face_normal(&self, f: FaceId) -> Vector3<f64> {
        let [p0, p1, p2] = self.triangle_points(f);
        (p1 - p0).cross(&(p2 - p0)).normalize()
    }

    /// Area of a face.
    pub fn face_area(&self, f: FaceId) -> f64 {
        let [p0, p1, p2] = self.triangle_points(f);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    /// Total area of all valid faces.
    pub fn surface_area(&self) -> f64 {
        self.topology.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Bounding box of the valid points.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut verts = self.topology.vert_ids();
        let first = self.points[verts.next()?.index()];
        let (mut min, mut max) = (first, first);

        for v in verts {
            let p = &self.points[v.index()];
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        Some((min, max))
    }
}
