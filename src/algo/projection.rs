//! Closest-point queries against a mesh surface.
//!
//! [`find_projection`] descends an [`AabbTree`] branch-and-bound style:
//! children are visited nearest box first, and any node whose box is
//! farther than the best candidate so far is skipped. The search radius
//! starts at [`ProjectionOptions::max_distance_sq`].
//!
//! Without a face region the mesh's cached tree is used (and built on the
//! first query after a mutation). With a region, a tree over just those
//! faces is built for the call, so excluded faces are never visited.
//!
//! Results are deterministic: of two faces at the same squared distance, the
//! one with the lower id wins.

use std::sync::Arc;

use nalgebra::Point3;
use rayon::prelude::*;

use super::aabb_tree::{AabbNode, AabbTree, AabbTreeOptions};
use super::transform::AffineXf;
use crate::error::{MeshError, Result};
use crate::mesh::{EdgeId, FaceBitSet, FaceId, Mesh};

/// A mesh, optionally restricted to a face region.
#[derive(Debug, Clone, Copy)]
pub struct MeshPart<'a> {
    /// The mesh.
    pub mesh: &'a Mesh,
    /// Faces to consider; all valid faces when `None`.
    pub region: Option<&'a FaceBitSet>,
}

impl<'a> MeshPart<'a> {
    /// The whole mesh.
    pub fn new(mesh: &'a Mesh) -> Self {
        Self { mesh, region: None }
    }

    /// Only the valid faces of `mesh` that are in `region`.
    pub fn with_region(mesh: &'a Mesh, region: &'a FaceBitSet) -> Self {
        Self {
            mesh,
            region: Some(region),
        }
    }

    /// Number of valid faces in the part.
    pub fn num_faces(&self) -> usize {
        match self.region {
            Some(region) => region.intersection(self.mesh.valid_faces()).count(),
            None => self.mesh.num_valid_faces(),
        }
    }
}

impl<'a> From<&'a Mesh> for MeshPart<'a> {
    fn from(mesh: &'a Mesh) -> Self {
        Self::new(mesh)
    }
}

/// Options for [`find_projection`].
#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    /// Faces farther than this (squared) are ignored (default: infinity).
    pub max_distance_sq: f64,

    /// Placement of the mesh in the frame of the query point. The query
    /// runs against the mesh as if every point were mapped by it, and the
    /// returned point is in that frame.
    pub to_mesh_space: Option<AffineXf>,

    /// Options for building the face tree.
    pub tree: AabbTreeOptions,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            max_distance_sq: f64::INFINITY,
            to_mesh_space: None,
            tree: AabbTreeOptions::default(),
        }
    }
}

impl ProjectionOptions {
    /// Set the search radius, squared.
    pub fn with_max_distance_sq(mut self, max_distance_sq: f64) -> Self {
        self.max_distance_sq = max_distance_sq;
        self
    }

    /// Set the mesh placement.
    pub fn with_transform(mut self, xf: AffineXf) -> Self {
        self.to_mesh_space = Some(xf);
        self
    }

    /// Set the tree build options.
    pub fn with_tree_options(mut self, tree: AabbTreeOptions) -> Self {
        self.tree = tree;
        self
    }
}

/// A point together with the face it lies on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointOnFace {
    /// The face.
    pub face: FaceId,
    /// The point.
    pub point: Point3<f64>,
}

/// Barycentric coordinates in a triangle `(V0, V1, V2)`: the point is
/// `(1 - a - b)·V0 + a·V1 + b·V2`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TriBary {
    /// Weight of `V1`.
    pub a: f64,
    /// Weight of `V2`.
    pub b: f64,
}

impl TriBary {
    /// Create barycentric coordinates.
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// The three vertex weights.
    pub fn weights(&self) -> [f64; 3] {
        [1.0 - self.a - self.b, self.a, self.b]
    }

    /// The point these coordinates denote in triangle `tri`.
    pub fn interpolate(&self, [v0, v1, v2]: &[Point3<f64>; 3]) -> Point3<f64> {
        v0 + (v1 - v0) * self.a + (v2 - v0) * self.b
    }
}

/// A point on a mesh as a half-edge plus barycentric coordinates in the
/// triangle to its left, whose vertices are taken starting at the edge's
/// origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshTriPoint {
    /// First half-edge of the triangle.
    pub e: EdgeId,
    /// Coordinates within the triangle.
    pub bary: TriBary,
}

impl MeshTriPoint {
    /// Position of this point on `mesh` (in mesh space).
    ///
    /// Fails with [`MeshError::InvalidTopology`] if the edge has no left
    /// triangle.
    pub fn to_point(&self, mesh: &Mesh) -> Result<Point3<f64>> {
        let verts = mesh.get_left_tri_verts(self.e)?;
        Ok(self.bary.interpolate(&verts.map(|v| *mesh.point(v))))
    }
}

/// The result of a closest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshProjection {
    /// The closest point and its face.
    pub proj: PointOnFace,
    /// The same point as edge and barycentric coordinates.
    pub mtp: MeshTriPoint,
    /// Squared distance from the query point.
    pub distance_sq: f64,
}

/// Closest point to `p` on triangle `(a, b, c)`, with its barycentric
/// coordinates relative to `a`.
///
/// Uses the Voronoi region classification from Ericson, *Real-Time
/// Collision Detection*, 5.1.5.
pub fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> (Point3<f64>, TriBary) {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (*a, TriBary::new(0.0, 0.0));
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (*b, TriBary::new(1.0, 0.0));
    }

    let vc = d1.mul_add(d4, -(d3 * d2));
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, TriBary::new(v, 0.0));
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (*c, TriBary::new(0.0, 1.0));
    }

    let vb = d5.mul_add(d2, -(d1 * d6));
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, TriBary::new(0.0, w));
    }

    let va = d3.mul_add(d6, -(d5 * d4));
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, TriBary::new(1.0 - w, w));
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (a + ab * v + ac * w, TriBary::new(v, w))
}

/// Find the point of `part` closest to `point`.
///
/// Returns `Ok(None)` if no face lies within
/// [`max_distance_sq`](ProjectionOptions::max_distance_sq) (inclusive).
///
/// # Errors
///
/// [`MeshError::EmptyTarget`] if the part has no valid faces.
///
/// # Example
///
/// ```
/// use halfmesh::prelude::*;
/// use nalgebra::Point3;
///
/// let sphere = make_sphere(&SphereParams::new(1.0, 500)).unwrap();
/// let hit = find_projection(
///     &Point3::new(0.0, 0.0, 3.0),
///     &MeshPart::new(&sphere),
///     &ProjectionOptions::default(),
/// )
/// .unwrap()
/// .unwrap();
/// assert!((hit.distance_sq - 4.0).abs() < 1e-9);
/// ```
pub fn find_projection(
    point: &Point3<f64>,
    part: &MeshPart<'_>,
    options: &ProjectionOptions,
) -> Result<Option<MeshProjection>> {
    let tree = part_tree(part, options)?;
    Ok(Search::new(part.mesh, options).run(&tree, point))
}

/// [`find_projection`] for many points, answered in parallel against one
/// tree.
///
/// # Errors
///
/// [`MeshError::EmptyTarget`] if the part has no valid faces.
pub fn find_projections(
    points: &[Point3<f64>],
    part: &MeshPart<'_>,
    options: &ProjectionOptions,
) -> Result<Vec<Option<MeshProjection>>> {
    let tree = part_tree(part, options)?;
    let search = Search::new(part.mesh, options);
    Ok(points.par_iter().map(|p| search.run(&tree, p)).collect())
}

fn part_tree(part: &MeshPart<'_>, options: &ProjectionOptions) -> Result<Arc<AabbTree>> {
    let mesh = part.mesh;
    let tree = match part.region {
        Some(region) => {
            let faces = region.intersection(mesh.valid_faces());
            Arc::new(AabbTree::build(
                mesh.points(),
                mesh.topology(),
                &faces,
                &options.tree,
            ))
        }
        None => mesh.aabb_tree(&options.tree),
    };
    if tree.is_empty() {
        return Err(MeshError::EmptyTarget);
    }
    Ok(tree)
}

struct Search<'a> {
    mesh: &'a Mesh,
    xf: Option<&'a AffineXf>,
    max_distance_sq: f64,
}

struct Candidate {
    face: FaceId,
    point: Point3<f64>,
    bary: TriBary,
    distance_sq: f64,
}

impl<'a> Search<'a> {
    fn new(mesh: &'a Mesh, options: &'a ProjectionOptions) -> Self {
        Self {
            mesh,
            xf: options.to_mesh_space.as_ref(),
            max_distance_sq: options.max_distance_sq,
        }
    }

    fn box_distance_sq(&self, node: &AabbNode, p: &Point3<f64>) -> f64 {
        match self.xf {
            Some(xf) => node.bbox().transformed(xf).distance_sq(p),
            None => node.bbox().distance_sq(p),
        }
    }

    fn run(&self, tree: &AabbTree, p: &Point3<f64>) -> Option<MeshProjection> {
        let root = tree.root()?;
        let mut best: Option<Candidate> = None;
        let mut best_dist = self.max_distance_sq;

        let mut stack = vec![(root, self.box_distance_sq(root, p))];
        while let Some((node, dist)) = stack.pop() {
            if dist > best_dist {
                continue;
            }
            match node {
                AabbNode::Leaf { faces, .. } => {
                    for &f in faces {
                        let [v0, v1, v2] = self.placed_triangle(f);
                        let (q, bary) = closest_point_on_triangle(p, &v0, &v1, &v2);
                        let d = (q - p).norm_squared();
                        let wins = match &best {
                            Some(b) => d < best_dist || (d == best_dist && f < b.face),
                            None => d <= best_dist,
                        };
                        if wins {
                            best_dist = d;
                            best = Some(Candidate {
                                face: f,
                                point: q,
                                bary,
                                distance_sq: d,
                            });
                        }
                    }
                }
                AabbNode::Internal { left, right, .. } => {
                    let (left, right) = (left.as_ref(), right.as_ref());
                    let dl = self.box_distance_sq(left, p);
                    let dr = self.box_distance_sq(right, p);
                    // Nearer child on top.
                    if dl <= dr {
                        stack.push((right, dr));
                        stack.push((left, dl));
                    } else {
                        stack.push((left, dl));
                        stack.push((right, dr));
                    }
                }
            }
        }

        best.map(|c| MeshProjection {
            proj: PointOnFace {
                face: c.face,
                point: c.point,
            },
            mtp: MeshTriPoint {
                e: self.mesh.topology().edge_with_left(c.face),
                bary: c.bary,
            },
            distance_sq: c.distance_sq,
        })
    }

    fn placed_triangle(&self, f: FaceId) -> [Point3<f64>; 3] {
        let tri = self.mesh.triangle_points(f);
        match self.xf {
            Some(xf) => tri.map(|v| xf.apply(&v)),
            None => tri,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::primitives::{make_cube, make_sphere, SphereParams};
    use crate::algo::transform::transform;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn cube() -> Mesh {
        make_cube(&Vector3::repeat(1.0), &Point3::new(-0.5, -0.5, -0.5)).unwrap()
    }

    fn project(p: Point3<f64>, part: &MeshPart<'_>, options: &ProjectionOptions) -> MeshProjection {
        find_projection(&p, part, options).unwrap().unwrap()
    }

    /// Lowest-id face at minimal distance, by checking every face.
    fn brute_force(mesh: &Mesh, p: &Point3<f64>) -> (FaceId, f64) {
        let mut best = (FaceId::invalid(), f64::INFINITY);
        for f in mesh.topology().face_ids() {
            let [a, b, c] = mesh.triangle_points(f);
            let (q, _) = closest_point_on_triangle(p, &a, &b, &c);
            let d = (q - p).norm_squared();
            if d < best.1 {
                best = (f, d);
            }
        }
        best
    }

    #[test]
    fn test_closest_point_regions() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);

        let (q, bary) = closest_point_on_triangle(&Point3::new(-1.0, -1.0, 0.0), &a, &b, &c);
        assert_eq!(q, a);
        assert_eq!(bary, TriBary::new(0.0, 0.0));

        let (q, bary) = closest_point_on_triangle(&Point3::new(2.0, -0.5, 0.0), &a, &b, &c);
        assert_eq!(q, b);
        assert_eq!(bary, TriBary::new(1.0, 0.0));

        let (q, bary) = closest_point_on_triangle(&Point3::new(0.5, -1.0, 0.0), &a, &b, &c);
        assert_relative_eq!(q, Point3::new(0.5, 0.0, 0.0));
        assert_relative_eq!(bary.a, 0.5);

        let (q, bary) = closest_point_on_triangle(&Point3::new(1.0, 1.0, 0.0), &a, &b, &c);
        assert_relative_eq!(q, Point3::new(0.5, 0.5, 0.0));
        assert_relative_eq!(bary.a, 0.5);
        assert_relative_eq!(bary.b, 0.5);

        let p = Point3::new(0.25, 0.25, 2.0);
        let (q, bary) = closest_point_on_triangle(&p, &a, &b, &c);
        assert_relative_eq!(q, Point3::new(0.25, 0.25, 0.0), epsilon = 1e-12);
        assert_relative_eq!(bary.interpolate(&[a, b, c]), q, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_projection() {
        let sphere = make_sphere(&SphereParams::new(1.0, 1000)).unwrap();
        let p = Point3::new(1.0, 2.0, 3.0);
        let hit = project(p, &MeshPart::new(&sphere), &ProjectionOptions::default());

        let exact = (14f64.sqrt() - 1.0).powi(2);
        assert!(hit.distance_sq >= exact - 1e-9, "{} below {}", hit.distance_sq, exact);
        assert!(hit.distance_sq - exact < 0.05, "{} far from {}", hit.distance_sq, exact);
        assert_relative_eq!(hit.distance_sq, (hit.proj.point - p).norm_squared(), epsilon = 1e-12);

        // The point sits on the inscribed polyhedron, towards p.
        assert!((hit.proj.point.coords.norm() - 1.0).abs() < 0.01);
        assert!(hit.proj.point.coords.normalize().dot(&p.coords.normalize()) > 0.99);

        // Both forms name the same location.
        assert_eq!(sphere.topology().left(hit.mtp.e), hit.proj.face);
        assert_relative_eq!(hit.mtp.to_point(&sphere).unwrap(), hit.proj.point, epsilon = 1e-12);

        assert_eq!(brute_force(&sphere, &p), (hit.proj.face, hit.distance_sq));
    }

    #[test]
    fn test_projection_with_placement() {
        let sphere = make_sphere(&SphereParams::new(1.0, 1000)).unwrap();
        let p = Point3::new(1.0, 2.0, 3.0);
        let options = ProjectionOptions::default()
            .with_transform(AffineXf::translation(Vector3::new(1.0, 1.0, 1.0)));
        let hit = project(p, &MeshPart::new(&sphere), &options);

        let exact = (5f64.sqrt() - 1.0).powi(2);
        assert!(hit.distance_sq >= exact - 1e-9);
        assert!(hit.distance_sq - exact < 0.05);

        // Returned in the placed frame; barycentrics refer to mesh space.
        let center = Point3::new(1.0, 1.0, 1.0);
        assert!(((hit.proj.point - center).norm() - 1.0).abs() < 0.01);
        let local = hit.mtp.to_point(&sphere).unwrap();
        assert_relative_eq!(local + Vector3::repeat(1.0), hit.proj.point, epsilon = 1e-12);
    }

    #[test]
    fn test_matches_brute_force() {
        let sphere = make_sphere(&SphereParams::new(2.0, 300)).unwrap();
        let options = ProjectionOptions::default()
            .with_tree_options(AabbTreeOptions::default().with_max_leaf_size(2));
        let part = MeshPart::new(&sphere);

        for i in 0..40 {
            let t = i as f64 * 0.37;
            let p = Point3::new(3.0 * t.cos(), 2.5 * (1.3 * t).sin(), 4.0 * (0.7 * t).cos() - 1.0);
            let hit = project(p, &part, &options);
            assert_eq!(brute_force(&sphere, &p), (hit.proj.face, hit.distance_sq), "point {}", p);
        }
    }

    #[test]
    fn test_region_restricts_faces() {
        let cube = cube();
        let p = Point3::new(0.0, 0.0, -3.0);

        let hit = project(p, &MeshPart::new(&cube), &ProjectionOptions::default());
        assert_relative_eq!(hit.distance_sq, 6.25);
        assert!(hit.proj.face == FaceId::new(0) || hit.proj.face == FaceId::new(1));

        // Only the top side (z = +0.5).
        let top = FaceBitSet::from_ids(12, [FaceId::new(6), FaceId::new(7)]);
        let hit = project(p, &MeshPart::with_region(&cube, &top), &ProjectionOptions::default());
        assert_relative_eq!(hit.distance_sq, 12.25);
        assert!(top.contains(hit.proj.face));
    }

    #[test]
    fn test_max_distance() {
        let cube = cube();
        let part = MeshPart::new(&cube);
        let p = Point3::new(0.0, 0.0, 5.0);

        let none = find_projection(&p, &part, &ProjectionOptions::default().with_max_distance_sq(1.0));
        assert_eq!(none.unwrap(), None);

        // The radius is inclusive.
        let hit = find_projection(&p, &part, &ProjectionOptions::default().with_max_distance_sq(20.25))
            .unwrap()
            .unwrap();
        assert_eq!(hit.distance_sq, 20.25);
    }

    #[test]
    fn test_equal_distance_prefers_lower_face() {
        let cube = cube();
        // Every face is exactly 0.5 away from the centre.
        let hit = project(Point3::origin(), &MeshPart::new(&cube), &ProjectionOptions::default());
        assert_eq!(hit.proj.face, FaceId::new(0));
        assert_eq!(hit.mtp.e, EdgeId::new(0));
        assert_eq!(hit.distance_sq, 0.25);

        let mut region = FaceBitSet::full(12);
        region.remove(FaceId::new(0));
        let hit = project(
            Point3::origin(),
            &MeshPart::with_region(&cube, &region),
            &ProjectionOptions::default(),
        );
        assert_eq!(hit.proj.face, FaceId::new(1));
    }

    #[test]
    fn test_tree_cache_follows_mutation() {
        let mut cube = cube();
        assert!(!cube.has_cached_tree());

        let p = Point3::new(0.0, 0.0, 3.0);
        let before = project(p, &MeshPart::new(&cube), &ProjectionOptions::default());
        assert!(cube.has_cached_tree());
        assert_relative_eq!(before.distance_sq, 6.25);

        transform(&mut cube, &AffineXf::translation(Vector3::new(0.0, 0.0, 1.0)), None).unwrap();
        assert!(!cube.has_cached_tree());

        let after = project(p, &MeshPart::new(&cube), &ProjectionOptions::default());
        assert!(cube.has_cached_tree());
        assert_relative_eq!(after.distance_sq, 2.25);
    }

    #[test]
    fn test_region_query_leaves_cache_alone() {
        let cube = cube();
        let region = FaceBitSet::full(12);
        project(Point3::origin(), &MeshPart::with_region(&cube, &region), &ProjectionOptions::default());
        assert!(!cube.has_cached_tree());
    }

    #[test]
    fn test_empty_target() {
        let cube = cube();
        let empty = FaceBitSet::new(12);
        let part = MeshPart::with_region(&cube, &empty);
        assert_eq!(part.num_faces(), 0);
        assert_eq!(
            find_projection(&Point3::origin(), &part, &ProjectionOptions::default()).unwrap_err(),
            MeshError::EmptyTarget
        );

        let mut gone = cube.clone();
        gone.delete_faces(&FaceBitSet::full(12));
        let result = find_projection(&Point3::origin(), &MeshPart::new(&gone), &ProjectionOptions::default());
        assert_eq!(result.unwrap_err(), MeshError::EmptyTarget);
    }

    #[test]
    fn test_batch_matches_single() {
        let sphere = make_sphere(&SphereParams::default()).unwrap();
        let part = MeshPart::new(&sphere);
        let options = ProjectionOptions::default().with_max_distance_sq(9.0);
        let points: Vec<Point3<f64>> = (0..20)
            .map(|i| Point3::new(i as f64 * 0.25 - 2.0, 0.5, 1.0))
            .collect();

        let batch = find_projections(&points, &part, &options).unwrap();
        for (p, hit) in points.iter().zip(&batch) {
            assert_eq!(*hit, find_projection(p, &part, &options).unwrap());
        }
    }
}
