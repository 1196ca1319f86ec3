//! Primitive shape builders.
//!
//! Both builders are deterministic: the same parameters always produce the
//! same points, in the same order, with the same triangulation.
//!
//! # Sphere Triangulation
//!
//! [`make_sphere`] places one vertex at each pole and spreads the rest over
//! `k` latitude rings at polar angles `π·i/(k+1)`. The ring count is chosen
//! so that ring spacing matches the mean edge length of a uniform
//! triangulation with the requested vertex count. Every ring gets at least
//! three vertices; the remainder is shared out in proportion to the ring
//! circumference (largest remainder first, ties to the northern ring).
//! Odd rings are rotated by half a step. Poles are fanned to their nearest
//! ring and neighbouring rings are zipped together by always advancing along
//! whichever ring has the next vertex at the smaller azimuth.
//!
//! The result is a closed genus-0 surface with exactly `n` vertices and
//! `2n − 4` triangles, wound counter-clockwise seen from outside.

use std::f64::consts::{PI, TAU};

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::mesh::{from_triangles, Mesh};

/// Corner order of [`make_cube`], as multiples of the size vector.
const CUBE_CORNERS: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 0.0, 1.0],
];

/// Triangles of [`make_cube`], two per side.
const CUBE_TRIANGLES: [[usize; 3]; 12] = [
    [0, 1, 2],
    [2, 3, 0],
    [0, 4, 5],
    [5, 1, 0],
    [0, 3, 7],
    [7, 4, 0],
    [6, 5, 4],
    [4, 7, 6],
    [1, 5, 6],
    [6, 2, 1],
    [6, 7, 3],
    [3, 2, 6],
];

/// Build an axis-aligned box with one corner at `base` and extent `size`.
///
/// Vertex `i` is `base + size ⊙ CORNER[i]` with corners ordered
/// `(0,0,0) (0,1,0) (1,1,0) (1,0,0) (0,0,1) (0,1,1) (1,1,1) (1,0,1)`.
/// The twelve triangles start `(0,1,2) (2,3,0) ...`, so the left triangle
/// of `E(0)` is `(0,1,2)` and that of `E(6)` is `(2,3,0)`.
///
/// # Example
///
/// ```
/// use halfmesh::prelude::*;
/// use nalgebra::{Point3, Vector3};
///
/// let cube = make_cube(&Vector3::repeat(1.0), &Point3::new(-0.5, -0.5, -0.5)).unwrap();
/// assert_eq!(cube.num_valid_points(), 8);
/// assert_eq!(cube.num_valid_faces(), 12);
/// ```
pub fn make_cube(size: &Vector3<f64>, base: &Point3<f64>) -> Result<Mesh> {
    let points: Vec<Point3<f64>> = CUBE_CORNERS
        .iter()
        .map(|c| base + size.component_mul(&Vector3::from(*c)))
        .collect();
    from_triangles(&points, &CUBE_TRIANGLES)
}

/// Parameters for [`make_sphere`].
#[derive(Debug, Clone)]
pub struct SphereParams {
    /// Sphere radius.
    pub radius: f64,

    /// Exact number of vertices of the result (at least 5).
    pub num_mesh_vertices: usize,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            num_mesh_vertices: 100,
        }
    }
}

impl SphereParams {
    /// Create parameters for a sphere.
    pub fn new(radius: f64, num_mesh_vertices: usize) -> Self {
        Self {
            radius,
            num_mesh_vertices,
        }
    }

    /// Set the radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Set the vertex count.
    pub fn with_num_vertices(mut self, num_mesh_vertices: usize) -> Self {
        self.num_mesh_vertices = num_mesh_vertices;
        self
    }
}

/// A latitude ring: its first vertex index, vertex count and azimuth offset
/// in fractions of a step.
#[derive(Debug, Clone, Copy)]
struct Ring {
    start: usize,
    count: usize,
    offset: f64,
}

impl Ring {
    #[inline]
    fn vertex(&self, i: usize) -> usize {
        self.start + i % self.count
    }

    /// Azimuth of vertex `i` in turns, without wrapping.
    #[inline]
    fn turns(&self, i: usize) -> f64 {
        (i as f64 + self.offset) / self.count as f64
    }
}

/// Build a triangulated sphere centred at the origin.
///
/// # Errors
///
/// [`MeshError::InvalidParameter`] if the radius is not a positive finite
/// number or fewer than 5 vertices are requested.
///
/// # Example
///
/// ```
/// use halfmesh::prelude::*;
///
/// let sphere = make_sphere(&SphereParams::new(1.0, 100)).unwrap();
/// assert_eq!(sphere.num_valid_points(), 100);
/// assert_eq!(sphere.num_valid_faces(), 196);
/// ```
pub fn make_sphere(params: &SphereParams) -> Result<Mesh> {
    let r = params.radius;
    if !(r.is_finite() && r > 0.0) {
        return Err(MeshError::invalid_param("radius", r, "must be positive and finite"));
    }
    let n = params.num_mesh_vertices;
    if n < 5 {
        return Err(MeshError::invalid_param(
            "num_mesh_vertices",
            n,
            "a sphere needs at least 5 vertices",
        ));
    }

    let sizes = ring_sizes(n);
    let k = sizes.len();

    let mut points = Vec::with_capacity(n);
    let mut rings = Vec::with_capacity(k);
    points.push(Point3::new(0.0, 0.0, r));
    for (i, &count) in sizes.iter().enumerate() {
        let ring = Ring {
            start: points.len(),
            count,
            offset: if i % 2 == 1 { 0.5 } else { 0.0 },
        };
        let theta = PI * (i + 1) as f64 / (k + 1) as f64;
        let (sin_t, cos_t) = theta.sin_cos();
        for j in 0..count {
            let (sin_p, cos_p) = (TAU * ring.turns(j)).sin_cos();
            points.push(Point3::new(r * sin_t * cos_p, r * sin_t * sin_p, r * cos_t));
        }
        rings.push(ring);
    }
    let south = points.len();
    points.push(Point3::new(0.0, 0.0, -r));

    let mut triangles = Vec::with_capacity(2 * n - 4);
    let first = rings[0];
    for j in 0..first.count {
        triangles.push([0, first.vertex(j), first.vertex(j + 1)]);
    }
    for pair in rings.windows(2) {
        stitch(&pair[0], &pair[1], &mut triangles);
    }
    let last = rings[k - 1];
    for j in 0..last.count {
        triangles.push([south, last.vertex(j + 1), last.vertex(j)]);
    }

    from_triangles(&points, &triangles)
}

/// Vertex counts of the latitude rings for a sphere with `n` vertices.
fn ring_sizes(n: usize) -> Vec<usize> {
    let m = n - 2;
    // Ring spacing π/(k+1) should match the edge length of n evenly spread
    // vertices, sqrt(8π / (√3·n)).
    let ideal = (3f64.sqrt() * PI * n as f64 / 8.0).sqrt() - 1.0;
    let k = (ideal.round() as usize).clamp(1, m / 3);

    let weights: Vec<f64> = (1..=k).map(|i| (PI * i as f64 / (k + 1) as f64).sin()).collect();
    let total: f64 = weights.iter().sum();
    let spare = m - 3 * k;

    let quotas: Vec<f64> = weights.iter().map(|w| spare as f64 * w / total).collect();
    let mut sizes: Vec<usize> = quotas.iter().map(|q| 3 + q.floor() as usize).collect();

    let assigned: usize = sizes.iter().sum::<usize>() - 3 * k;
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| {
        let fa = quotas[a] - quotas[a].floor();
        let fb = quotas[b] - quotas[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    for &i in order.iter().cycle().take(spare.saturating_sub(assigned)) {
        sizes[i] += 1;
    }
    sizes
}

/// Zip two neighbouring rings into a band of triangles, `upper` being the
/// ring nearer the north pole.
fn stitch(upper: &Ring, lower: &Ring, triangles: &mut Vec<[usize; 3]>) {
    let (mut i, mut j) = (0, 0);
    while i < upper.count || j < lower.count {
        let u = upper.vertex(i);
        let l = lower.vertex(j);
        let advance_lower = if i == upper.count {
            true
        } else if j == lower.count {
            false
        } else {
            lower.turns(j + 1) <= upper.turns(i + 1)
        };

        if advance_lower {
            triangles.push([u, l, lower.vertex(j + 1)]);
            j += 1;
        } else {
            triangles.push([u, l, upper.vertex(i + 1)]);
            i += 1;
        }
    }
}
