//! Signed volume.
//!
//! The volume enclosed by a closed, outward-oriented triangle surface is
//! `(1/6)·Σ V0·(V1×V2)` over its faces (divergence theorem). Restricted
//! variants sum only part of the faces, which for an open surface gives the
//! volume of the cone from the origin over that part.

use nalgebra::Point3;
use rayon::prelude::*;

use crate::error::{MeshError, Result};
use crate::mesh::{FaceBitSet, FaceId, Mesh, VertBitSet};

/// Six times the signed volume of the tetrahedron (origin, p0, p1, p2).
#[inline]
fn triple_product([p0, p1, p2]: [Point3<f64>; 3]) -> f64 {
    p0.coords.dot(&p1.coords.cross(&p2.coords))
}

fn sum_faces(mesh: &Mesh, include: impl Fn(FaceId) -> bool + Sync) -> f64 {
    // Terms are summed in face order regardless of thread count.
    let faces: Vec<FaceId> = mesh.topology().face_ids().filter(|&f| include(f)).collect();
    let terms: Vec<f64> = faces
        .par_iter()
        .map(|&f| triple_product(mesh.triangle_points(f)))
        .collect();
    terms.iter().sum::<f64>() / 6.0
}

/// Signed volume of the mesh, or of the faces in `region`.
///
/// Positive for a closed surface whose faces wind counter-clockwise seen
/// from outside.
///
/// # Errors
///
/// [`MeshError::EmptyMesh`] if the mesh has no valid vertices.
///
/// # Example
///
/// ```
/// use halfmesh::prelude::*;
/// use nalgebra::{Point3, Vector3};
///
/// let cube = make_cube(&Vector3::repeat(2.0), &Point3::origin()).unwrap();
/// assert!((volume(&cube, None).unwrap() - 8.0).abs() < 1e-12);
/// ```
pub fn volume(mesh: &Mesh, region: Option<&FaceBitSet>) -> Result<f64> {
    if mesh.num_valid_points() == 0 {
        return Err(MeshError::EmptyMesh);
    }
    Ok(match region {
        Some(region) => sum_faces(mesh, |f| region.contains(f)),
        None => sum_faces(mesh, |_| true),
    })
}

/// Signed volume of the faces whose three vertices all lie in `points`.
///
/// # Errors
///
/// [`MeshError::EmptyMesh`] if the mesh has no valid vertices.
pub fn volume_of_points(mesh: &Mesh, points: &VertBitSet) -> Result<f64> {
    if mesh.num_valid_points() == 0 {
        return Err(MeshError::EmptyMesh);
    }
    let topology = mesh.topology();
    Ok(sum_faces(mesh, |f| {
        topology.face_verts(f).iter().all(|&v| points.contains(v))
    }))
}
