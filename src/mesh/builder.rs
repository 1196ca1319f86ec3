//! Mesh construction utilities.
//!
//! This module builds meshes from triangle soups (a point list plus index
//! triples) as commonly found in mesh file formats, and converts meshes back
//! to that form.

use std::collections::HashMap;

use nalgebra::Point3;
use tracing::debug;

use super::index::{EdgeId, VertId};
use super::topology::MeshTopology;
use super::Mesh;
use crate::error::{MeshError, Result};

/// Build a mesh from points and triangle faces.
///
/// Triangles are processed in order. Each directed edge `(a, b)` of a
/// triangle either reuses the free half of an edge created earlier as
/// `(b, a)`, or allocates a new half-edge pair whose first half is `(a, b)`.
/// The first half-edge of face `i` is the one from `triangles[i][0]` to
/// `triangles[i][1]`.
///
/// # Errors
///
/// - [`MeshError::EmptyMesh`] if `triangles` is empty
/// - [`MeshError::InvalidVertexIndex`] if an index is out of range
/// - [`MeshError::DegenerateFace`] if a triple repeats a vertex
/// - [`MeshError::NonManifoldInput`] if two triangles share a directed edge
///
/// # Example
/// ```
/// use halfmesh::mesh::{from_triangles, EdgeId, VertId};
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let mesh = from_triangles(&points, &[[0, 1, 2]]).unwrap();
/// assert_eq!(mesh.num_valid_points(), 3);
/// assert_eq!(mesh.num_valid_faces(), 1);
/// assert_eq!(
///     mesh.topology().get_left_tri_verts(EdgeId::new(0)).unwrap(),
///     [VertId::new(0), VertId::new(1), VertId::new(2)]
/// );
/// ```
pub fn from_triangles(points: &[Point3<f64>], triangles: &[[usize; 3]]) -> Result<Mesh> {
    if triangles.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, tri) in triangles.iter().enumerate() {
        for &vi in tri {
            if vi >= points.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let mut topology = MeshTopology::with_capacity(points.len(), triangles.len());
    topology.resize_verts(points.len());

    // Directed vertex pair -> the half-edge that runs along it.
    let mut directed: HashMap<(usize, usize), EdgeId> = HashMap::with_capacity(triangles.len() * 3);

    for tri in triangles {
        let mut cycle = [EdgeId::invalid(); 3];
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            let e = match directed.get(&(a, b)) {
                Some(&e) if topology.left(e).is_valid() => {
                    return Err(MeshError::NonManifoldInput {
                        v0: VertId::new(a),
                        v1: VertId::new(b),
                    });
                }
                Some(&e) => e,
                None => {
                    let e = topology.make_edge(VertId::new(a), VertId::new(b));
                    directed.insert((a, b), e);
                    directed.insert((b, a), e.sym());
                    e
                }
            };
            cycle[k] = e;
        }
        topology.add_triangle(cycle);
    }

    topology.rebuild_vertex_edges();
    topology.link_boundary_loops();

    debug!(
        points = points.len(),
        faces = topology.num_valid_faces(),
        edges = topology.edge_size() / 2,
        "built mesh from triangles"
    );

    Ok(Mesh::from_parts(points.to_vec(), topology))
}

/// Convert a mesh back to a point list and index triples.
///
/// Every stored point is emitted (so vertex ids are preserved) followed by
/// every valid face in id order, starting at each face's first half-edge.
/// Feeding the result to [`from_triangles`] reproduces the mesh, with face
/// ids compacted if any faces were deleted.
pub fn to_triangles(mesh: &Mesh) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let topology = mesh.topology();
    let faces = topology
        .face_ids()
        .map(|f| topology.face_verts(f).map(VertId::index))
        .collect();
    (mesh.points().to_vec(), faces)
}
