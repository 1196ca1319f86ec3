//! Bounding volume hierarchy over mesh faces.
//!
//! [`AabbTree`] is a binary tree of axis-aligned boxes. Each leaf holds a
//! handful of faces; each internal node bounds its two children. Trees are
//! built top-down by splitting the face set at the median of the face-box
//! centres along the longest axis of the node box.
//!
//! Large subtrees are built in parallel with `rayon::join`. The split is a
//! stable sort with ties broken by face id, so the parallel and sequential
//! builds produce the same tree.

use std::cmp::Ordering;

use nalgebra::Point3;
use smallvec::SmallVec;
use tracing::debug;

use super::transform::AffineXf;
use crate::mesh::{FaceBitSet, FaceId, MeshTopology};

/// Options for building an [`AabbTree`].
#[derive(Debug, Clone)]
pub struct AabbTreeOptions {
    /// Maximum number of faces stored in a leaf.
    pub max_leaf_size: usize,

    /// Whether to build large subtrees in parallel (default: true).
    pub parallel: bool,

    /// Subtrees with at least this many faces are split in parallel.
    pub parallel_threshold: usize,
}

impl Default for AabbTreeOptions {
    fn default() -> Self {
        Self {
            max_leaf_size: 4,
            parallel: true,
            parallel_threshold: 1024,
        }
    }
}

impl AabbTreeOptions {
    /// Set the maximum leaf size (at least 1).
    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size.max(1);
        self
    }

    /// Set whether to use parallel construction.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded construction.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3<f64>,
    /// Maximum corner of the bounding box.
    pub max: Point3<f64>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Create an empty (inverted) bounding box.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// Create a bounding box from points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_point(p);
        }
        bbox
    }

    /// Expand this bounding box to include another.
    pub fn expand(&mut self, other: &Self) {
        self.expand_point(&other.min);
        self.expand_point(&other.max);
    }

    /// Expand this bounding box to include a point.
    pub fn expand_point(&mut self, point: &Point3<f64>) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(point[i]);
            self.max[i] = self.max[i].max(point[i]);
        }
    }

    /// Get the center of this bounding box.
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Get the index of the longest axis (0=X, 1=Y, 2=Z).
    pub fn longest_axis(&self) -> usize {
        let d = self.max - self.min;
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Check if this bounding box is valid (non-empty).
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Squared distance from a point to the nearest point of the box
    /// (zero inside).
    pub fn distance_sq(&self, p: &Point3<f64>) -> f64 {
        (0..3)
            .map(|i| {
                let d = (self.min[i] - p[i]).max(p[i] - self.max[i]).max(0.0);
                d * d
            })
            .sum()
    }

    /// The box bounding this box after an affine map.
    pub fn transformed(&self, xf: &AffineXf) -> Self {
        let mut out = Self::empty();
        for corner in 0..8 {
            let p = Point3::new(
                if corner & 1 == 0 { self.min.x } else { self.max.x },
                if corner & 2 == 0 { self.min.y } else { self.max.y },
                if corner & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand_point(&xf.apply(&p));
        }
        out
    }
}

/// Tree node containing either leaf faces or child nodes.
#[derive(Debug)]
pub enum AabbNode {
    /// Leaf node containing face ids.
    Leaf {
        /// Bounding box of all faces in this leaf.
        bbox: Aabb,
        /// Faces stored in this leaf, in ascending id order.
        faces: SmallVec<[FaceId; 4]>,
    },
    /// Internal node with two children.
    Internal {
        /// Bounding box of all faces in this subtree.
        bbox: Aabb,
        /// Left child node.
        left: Box<Self>,
        /// Right child node.
        right: Box<Self>,
    },
}

impl AabbNode {
    /// Get the bounding box of this node.
    pub fn bbox(&self) -> &Aabb {
        match self {
            Self::Leaf { bbox, .. } | Self::Internal { bbox, .. } => bbox,
        }
    }
}

/// Shape statistics of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AabbTreeStats {
    /// Total number of nodes.
    pub nodes: usize,
    /// Number of leaves.
    pub leaves: usize,
    /// Length of the longest root-to-leaf path (a single leaf has depth 1).
    pub depth: usize,
}

/// Bounding volume hierarchy over a set of mesh faces.
#[derive(Debug)]
pub struct AabbTree {
    root: Option<AabbNode>,
    face_count: usize,
}

/// A face together with its bounding box, as used during construction.
type FaceBox = (FaceId, Aabb);

impl AabbTree {
    /// Build a tree over the faces in `faces` that are valid in `topology`.
    pub fn build(
        points: &[Point3<f64>],
        topology: &MeshTopology,
        faces: &FaceBitSet,
        options: &AabbTreeOptions,
    ) -> Self {
        let boxes: Vec<FaceBox> = faces
            .iter()
            .filter(|&f| topology.has_face(f))
            .map(|f| {
                let verts = topology.face_verts(f);
                (f, Aabb::from_points(verts.iter().map(|v| &points[v.index()])))
            })
            .collect();

        if boxes.is_empty() {
            return Self {
                root: None,
                face_count: 0,
            };
        }

        let face_count = boxes.len();
        let max_leaf = options.max_leaf_size.max(1);
        let root = if options.parallel && face_count >= options.parallel_threshold {
            build_parallel(boxes, max_leaf, options.parallel_threshold)
        } else {
            build_sequential(boxes, max_leaf)
        };

        let tree = Self {
            root: Some(root),
            face_count,
        };
        debug!(
            faces = face_count,
            nodes = tree.stats().nodes,
            "built face tree"
        );
        tree
    }

    /// The root node, if the tree is not empty.
    pub fn root(&self) -> Option<&AabbNode> {
        self.root.as_ref()
    }

    /// Number of faces in the tree.
    pub fn face_count(&self) -> usize {
        self.face_count
    }

    /// Check if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Bounding box of all faces in the tree.
    pub fn root_bbox(&self) -> Option<&Aabb> {
        self.root.as_ref().map(AabbNode::bbox)
    }

    /// Get statistics about the tree structure.
    pub fn stats(&self) -> AabbTreeStats {
        fn visit(node: &AabbNode, depth: usize, stats: &mut AabbTreeStats) {
            stats.nodes += 1;
            stats.depth = stats.depth.max(depth);
            match node {
                AabbNode::Leaf { .. } => stats.leaves += 1,
                AabbNode::Internal { left, right, .. } => {
                    visit(left, depth + 1, stats);
                    visit(right, depth + 1, stats);
                }
            }
        }

        let mut stats = AabbTreeStats::default();
        if let Some(root) = &self.root {
            visit(root, 1, &mut stats);
        }
        stats
    }
}

fn bounds_of(boxes: &[FaceBox]) -> Aabb {
    let mut bbox = Aabb::empty();
    for (_, b) in boxes {
        bbox.expand(b);
    }
    bbox
}

fn make_leaf(bbox: Aabb, boxes: &[FaceBox]) -> AabbNode {
    let mut faces: SmallVec<[FaceId; 4]> = boxes.iter().map(|(f, _)| *f).collect();
    faces.sort_unstable();
    AabbNode::Leaf { bbox, faces }
}

/// Sort by box centre along `axis`, ties by face id, and cut in half.
fn split(mut boxes: Vec<FaceBox>, axis: usize) -> (Vec<FaceBox>, Vec<FaceBox>) {
    boxes.sort_by(|(fa, a), (fb, b)| {
        a.center()[axis]
            .partial_cmp(&b.center()[axis])
            .unwrap_or(Ordering::Equal)
            .then(fa.cmp(fb))
    });
    let right = boxes.split_off(boxes.len() / 2);
    (boxes, right)
}

fn build_sequential(boxes: Vec<FaceBox>, max_leaf_size: usize) -> AabbNode {
    let bbox = bounds_of(&boxes);
    if boxes.len() <= max_leaf_size {
        return make_leaf(bbox, &boxes);
    }

    let (left, right) = split(boxes, bbox.longest_axis());
    AabbNode::Internal {
        bbox,
        left: Box::new(build_sequential(left, max_leaf_size)),
        right: Box::new(build_sequential(right, max_leaf_size)),
    }
}

fn build_parallel(boxes: Vec<FaceBox>, max_leaf_size: usize, parallel_threshold: usize) -> AabbNode {
    if boxes.len() < parallel_threshold {
        return build_sequential(boxes, max_leaf_size);
    }

    let bbox = bounds_of(&boxes);
    if boxes.len() <= max_leaf_size {
        return make_leaf(bbox, &boxes);
    }

    let (left, right) = split(boxes, bbox.longest_axis());
    let (left, right) = rayon::join(
        || build_parallel(left, max_leaf_size, parallel_threshold),
        || build_parallel(right, max_leaf_size, parallel_threshold),
    );
    AabbNode::Internal {
        bbox,
        left: Box::new(left),
        right: Box::new(right),
    }
}
