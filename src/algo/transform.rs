//! Affine transformations of meshes.
//!
//! [`AffineXf`] is a linear map followed by a translation. [`transform`]
//! applies one to the points of a mesh, optionally restricted to a vertex
//! region; connectivity is never touched.
//!
//! # Example
//!
//! ```
//! use halfmesh::prelude::*;
//! use nalgebra::{Point3, Vector3};
//!
//! let mut cube = make_cube(&Vector3::repeat(1.0), &Point3::new(-0.5, -0.5, -0.5)).unwrap();
//! let xf = AffineXf::translation(Vector3::repeat(1.0));
//! transform(&mut cube, &xf, None).unwrap();
//! assert_eq!(*cube.point(VertId::new(0)), Point3::new(0.5, 0.5, 0.5));
//! ```

use std::ops::Mul;

use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};
use rayon::prelude::*;

use crate::error::{MeshError, Result};
use crate::mesh::{Mesh, VertBitSet, VertId};

/// An affine map `p -> A·p + b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineXf {
    /// The linear part `A`.
    pub linear: Matrix3<f64>,
    /// The translation `b`.
    pub translation: Vector3<f64>,
}

impl Default for AffineXf {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineXf {
    /// Create a transform from its linear part and translation.
    pub fn new(linear: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self { linear, translation }
    }

    /// The identity transformation.
    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    /// A pure translation.
    pub fn translation(b: Vector3<f64>) -> Self {
        Self::new(Matrix3::identity(), b)
    }

    /// A pure linear map.
    pub fn linear(a: Matrix3<f64>) -> Self {
        Self::new(a, Vector3::zeros())
    }

    /// Uniform scaling about the origin.
    pub fn uniform_scale(factor: f64) -> Self {
        Self::linear(Matrix3::from_diagonal_element(factor))
    }

    /// Per-axis scaling about the origin.
    pub fn scale(factors: Vector3<f64>) -> Self {
        Self::linear(Matrix3::from_diagonal(&factors))
    }

    /// Rotation by `angle` radians about `axis` through the origin.
    pub fn rotation(axis: Vector3<f64>, angle: f64) -> Self {
        let rot = Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle);
        Self::linear(*rot.matrix())
    }

    /// True if this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        self.linear == Matrix3::identity() && self.translation == Vector3::zeros()
    }

    /// Map a point.
    #[inline]
    pub fn apply(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.linear * p.coords + self.translation)
    }

    /// Map a direction (translation is ignored).
    #[inline]
    pub fn apply_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.linear * v
    }

    /// The transform applying `self` first, then `other`.
    pub fn then(&self, other: &Self) -> Self {
        *other * *self
    }

    /// The inverse transform.
    ///
    /// Fails with [`MeshError::NotInvertible`] if the linear part is singular.
    pub fn inverse(&self) -> Result<Self> {
        let inv = self.linear.try_inverse().ok_or(MeshError::NotInvertible)?;
        Ok(Self::new(inv, -(inv * self.translation)))
    }
}

/// Composition: `(a * b).apply(p) == a.apply(&b.apply(p))`.
impl Mul for AffineXf {
    type Output = AffineXf;

    fn mul(self, rhs: AffineXf) -> AffineXf {
        AffineXf::new(
            self.linear * rhs.linear,
            self.linear * rhs.translation + self.translation,
        )
    }
}

/// Apply `xf` to the points of a mesh.
///
/// With `region`, only the points of vertices in the region move (ids beyond
/// the point store are ignored); otherwise all valid vertices move. Every
/// other point is left exactly as it was. The mesh's cached face tree is
/// dropped.
///
/// # Errors
///
/// [`MeshError::EmptyMesh`] if the mesh has no valid vertices; the mesh is
/// not modified.
pub fn transform(mesh: &mut Mesh, xf: &AffineXf, region: Option<&VertBitSet>) -> Result<()> {
    if mesh.num_valid_points() == 0 {
        return Err(MeshError::EmptyMesh);
    }

    let selected = match region {
        Some(region) => region.clone(),
        None => mesh.valid_points().clone(),
    };

    mesh.points_mut()
        .par_iter_mut()
        .enumerate()
        .filter(|(i, _)| selected.contains(VertId::new(*i)))
        .for_each(|(_, p)| *p = xf.apply(p));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::primitives::make_cube;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn cube() -> Mesh {
        make_cube(&Vector3::repeat(1.0), &Point3::new(-0.5, -0.5, -0.5)).unwrap()
    }

    #[test]
    fn test_compose_and_invert() {
        let a = AffineXf::rotation(Vector3::z(), FRAC_PI_2);
        let b = AffineXf::translation(Vector3::new(1.0, 2.0, 3.0));
        let p = Point3::new(1.0, 0.0, 0.0);

        let ab = a.then(&b);
        assert_relative_eq!(ab.apply(&p), b.apply(&a.apply(&p)), epsilon = 1e-12);
        assert_relative_eq!(ab.apply(&p), Point3::new(1.0, 3.0, 3.0), epsilon = 1e-12);

        let inv = ab.inverse().unwrap();
        assert_relative_eq!(inv.apply(&ab.apply(&p)), p, epsilon = 1e-12);
        assert!((ab * inv).linear.is_identity(1e-12));
    }

    #[test]
    fn test_singular_inverse() {
        let flat = AffineXf::scale(Vector3::new(1.0, 1.0, 0.0));
        assert_eq!(flat.inverse().unwrap_err(), MeshError::NotInvertible);
    }

    #[test]
    fn test_transform_whole_mesh() {
        let mut mesh = cube();
        transform(&mut mesh, &AffineXf::translation(Vector3::repeat(1.0)), None).unwrap();

        let expected = [
            (0.5, 0.5, 0.5),
            (0.5, 1.5, 0.5),
            (1.5, 1.5, 0.5),
            (1.5, 0.5, 0.5),
            (0.5, 0.5, 1.5),
            (0.5, 1.5, 1.5),
            (1.5, 1.5, 1.5),
            (1.5, 0.5, 1.5),
        ];
        for (i, (x, y, z)) in expected.into_iter().enumerate() {
            assert_eq!(*mesh.point(VertId::new(i)), Point3::new(x, y, z));
        }
    }

    #[test]
    fn test_transform_region() {
        let mut mesh = cube();
        let before = mesh.points().to_vec();
        let region = VertBitSet::from_ids(8, [0, 2, 4, 6].map(VertId::new));

        transform(&mut mesh, &AffineXf::translation(Vector3::repeat(1.0)), Some(&region)).unwrap();

        assert_eq!(*mesh.point(VertId::new(0)), Point3::new(0.5, 0.5, 0.5));
        assert_eq!(*mesh.point(VertId::new(1)), Point3::new(-0.5, 0.5, -0.5));
        assert_eq!(*mesh.point(VertId::new(2)), Point3::new(1.5, 1.5, 0.5));
        assert_eq!(*mesh.point(VertId::new(3)), Point3::new(0.5, -0.5, -0.5));
        assert_eq!(*mesh.point(VertId::new(6)), Point3::new(1.5, 1.5, 1.5));
        assert_eq!(*mesh.point(VertId::new(7)), Point3::new(0.5, -0.5, 0.5));

        // Points outside the region are bit-identical.
        for i in [1, 3, 5, 7] {
            assert_eq!(mesh.points()[i], before[i]);
        }
    }

    #[test]
    fn test_region_beyond_points_is_ignored() {
        let mut mesh = cube();
        let region = VertBitSet::from_ids(8, [VertId::new(1), VertId::new(500)]);
        transform(&mut mesh, &AffineXf::uniform_scale(2.0), Some(&region)).unwrap();
        assert_eq!(*mesh.point(VertId::new(1)), Point3::new(-1.0, 1.0, -1.0));
    }

    #[test]
    fn test_transform_empty_mesh() {
        let mut mesh = Mesh::default();
        let result = transform(&mut mesh, &AffineXf::identity(), None);
        assert_eq!(result.unwrap_err(), MeshError::EmptyMesh);
    }
}
