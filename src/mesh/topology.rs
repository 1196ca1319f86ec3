//! Half-edge connectivity.
//!
//! [`MeshTopology`] stores the connectivity of a triangle mesh as a flat
//! arena of half-edge records. All references between records are plain
//! identifiers, so the structure is freely clonable and has no ownership
//! cycles.
//!
//! # Structure
//!
//! - Half-edges come in pairs: `E(2k)` and `E(2k + 1)` are opposite, so the
//!   opposite of any half-edge is found by [`EdgeId::sym`] without storage.
//! - Each half-edge records its **origin** vertex, the **next** half-edge
//!   around its left face, and that **left** face.
//! - Each vertex stores one outgoing half-edge, each face one bounding
//!   half-edge (the one built from its first two vertices).
//!
//! # Boundary Handling
//!
//! A half-edge without a left face lies on a boundary. Its `next` pointer
//! links it to the following boundary half-edge of the same hole, so walking
//! `next` around a hole returns to the start.

use super::bitset::{EdgeBitSet, FaceBitSet, VertBitSet};
use super::index::{EdgeId, FaceId, UndirectedEdgeId, VertId};
use crate::error::{MeshError, Result};

/// One directed half of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdgeRecord {
    /// The vertex this half-edge originates from. Invalid for deleted edges.
    pub org: VertId,

    /// The next half-edge around the left face (or around the hole).
    pub next: EdgeId,

    /// The face to the left of this half-edge. Invalid on a boundary.
    pub left: FaceId,
}

impl Default for HalfEdgeRecord {
    fn default() -> Self {
        Self {
            org: VertId::invalid(),
            next: EdgeId::invalid(),
            left: FaceId::invalid(),
        }
    }
}

/// Connectivity of a triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshTopology {
    edges: Vec<HalfEdgeRecord>,
    edge_per_vertex: Vec<EdgeId>,
    edge_per_face: Vec<EdgeId>,
    valid_verts: VertBitSet,
    valid_faces: FaceBitSet,
    num_valid_verts: usize,
    num_valid_faces: usize,
}

impl MeshTopology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a topology with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // 3F half-edges when closed, plus room for open borders.
        let num_halfedges = num_faces * 3 + num_faces / 2;
        Self {
            edges: Vec::with_capacity(num_halfedges),
            edge_per_vertex: Vec::with_capacity(num_vertices),
            edge_per_face: Vec::with_capacity(num_faces),
            valid_verts: VertBitSet::new(num_vertices),
            valid_faces: FaceBitSet::new(num_faces),
            num_valid_verts: 0,
            num_valid_faces: 0,
        }
    }

    // ==================== Sizes ====================

    /// Size of the vertex id space (including deleted and unused ids).
    #[inline]
    pub fn vert_size(&self) -> usize {
        self.edge_per_vertex.len()
    }

    /// Size of the half-edge id space (including deleted ids).
    #[inline]
    pub fn edge_size(&self) -> usize {
        self.edges.len()
    }

    /// Size of the face id space (including deleted ids).
    #[inline]
    pub fn face_size(&self) -> usize {
        self.edge_per_face.len()
    }

    /// Number of valid vertices.
    #[inline]
    pub fn num_valid_verts(&self) -> usize {
        self.num_valid_verts
    }

    /// Number of valid faces.
    #[inline]
    pub fn num_valid_faces(&self) -> usize {
        self.num_valid_faces
    }

    /// Number of valid undirected edges.
    pub fn num_undirected_edges(&self) -> usize {
        self.undirected_edges().count()
    }

    /// The set of valid vertices.
    #[inline]
    pub fn valid_verts(&self) -> &VertBitSet {
        &self.valid_verts
    }

    /// The set of valid faces.
    #[inline]
    pub fn valid_faces(&self) -> &FaceBitSet {
        &self.valid_faces
    }

    // ==================== Validity ====================

    /// Check whether a vertex id is alive.
    #[inline]
    pub fn has_vert(&self, v: VertId) -> bool {
        self.valid_verts.contains(v)
    }

    /// Check whether a face id is alive.
    #[inline]
    pub fn has_face(&self, f: FaceId) -> bool {
        self.valid_faces.contains(f)
    }

    /// Check whether a half-edge id is alive.
    #[inline]
    pub fn has_edge(&self, e: EdgeId) -> bool {
        e.is_valid() && e.index() < self.edges.len() && self.edges[e.index()].org.is_valid()
    }

    // ==================== Topology Queries ====================

    /// Get a half-edge record.
    #[inline]
    pub fn record(&self, e: EdgeId) -> &HalfEdgeRecord {
        &self.edges[e.index()]
    }

    /// Origin vertex of a half-edge.
    #[inline]
    pub fn org(&self, e: EdgeId) -> VertId {
        self.record(e).org
    }

    /// Destination vertex of a half-edge.
    #[inline]
    pub fn dest(&self, e: EdgeId) -> VertId {
        self.org(e.sym())
    }

    /// Next half-edge around the left face.
    #[inline]
    pub fn next(&self, e: EdgeId) -> EdgeId {
        self.record(e).next
    }

    /// Previous half-edge around the left face (or hole).
    pub fn prev(&self, e: EdgeId) -> EdgeId {
        let mut p = e;
        for _ in 0..self.edges.len() {
            let n = self.next(p);
            if n == e || !n.is_valid() {
                return p;
            }
            p = n;
        }
        p
    }

    /// Face to the left of a half-edge.
    #[inline]
    pub fn left(&self, e: EdgeId) -> FaceId {
        self.record(e).left
    }

    /// Face to the right of a half-edge.
    #[inline]
    pub fn right(&self, e: EdgeId) -> FaceId {
        self.left(e.sym())
    }

    /// Some half-edge originating at the vertex.
    #[inline]
    pub fn edge_with_org(&self, v: VertId) -> EdgeId {
        self.edge_per_vertex[v.index()]
    }

    /// The first half-edge of a face.
    #[inline]
    pub fn edge_with_left(&self, f: FaceId) -> EdgeId {
        self.edge_per_face[f.index()]
    }

    /// Check if a half-edge is on a boundary (has no left face).
    #[inline]
    pub fn is_boundary_edge(&self, e: EdgeId) -> bool {
        !self.left(e).is_valid()
    }

    /// Check if a vertex touches a boundary.
    pub fn is_boundary_vertex(&self, v: VertId) -> bool {
        self.out_edges(v)
            .any(|e| self.is_boundary_edge(e) || self.is_boundary_edge(e.sym()))
    }

    /// The three vertices of the triangle to the left of `e`, starting from
    /// the origin of `e` and following the face winding.
    ///
    /// Fails with [`MeshError::InvalidTopology`] if `e` is not a live
    /// half-edge, has no left face, or its left cycle is not a triangle.
    pub fn get_left_tri_verts(&self, e: EdgeId) -> Result<[VertId; 3]> {
        if !self.has_edge(e) {
            return Err(MeshError::topology(e, "no such edge"));
        }
        if !self.left(e).is_valid() {
            return Err(MeshError::topology(e, "edge has no left face"));
        }
        let b = self.next(e);
        let c = self.next(b);
        if self.next(c) != e {
            return Err(MeshError::topology(e, "left face is not a triangle"));
        }
        Ok([self.org(e), self.org(b), self.org(c)])
    }

    /// The three vertices of a valid face, starting from its first half-edge.
    pub fn face_verts(&self, f: FaceId) -> [VertId; 3] {
        let e0 = self.edge_with_left(f);
        let e1 = self.next(e0);
        let e2 = self.next(e1);
        [self.org(e0), self.org(e1), self.org(e2)]
    }

    // ==================== Iteration ====================

    /// Iterate over valid vertex ids.
    pub fn vert_ids(&self) -> impl Iterator<Item = VertId> + '_ {
        self.valid_verts.iter()
    }

    /// Iterate over valid face ids.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.valid_faces.iter()
    }

    /// Iterate over valid half-edge ids.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len())
            .map(EdgeId::new)
            .filter(|&e| self.edges[e.index()].org.is_valid())
    }

    /// Iterate over valid undirected edges.
    pub fn undirected_edges(&self) -> impl Iterator<Item = UndirectedEdgeId> + '_ {
        self.edge_ids().filter(|e| e.is_even()).map(EdgeId::undirected)
    }

    /// Iterate over half-edges leaving a vertex.
    pub fn out_edges(&self, v: VertId) -> OutEdgeIter<'_> {
        OutEdgeIter::new(self, v)
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertId) -> impl Iterator<Item = VertId> + '_ {
        self.out_edges(v).map(|e| self.dest(e))
    }

    /// Number of edges incident to a vertex.
    pub fn valence(&self, v: VertId) -> usize {
        self.out_edges(v).count()
    }

    /// All half-edges with no left face.
    pub fn boundary_edges(&self) -> EdgeBitSet {
        let mut set = EdgeBitSet::new(self.edges.len());
        for e in self.edge_ids().filter(|&e| self.is_boundary_edge(e)) {
            set.insert(e);
        }
        set
    }

    /// True if no half-edge lies on a boundary.
    pub fn is_closed(&self) -> bool {
        self.edge_ids().all(|e| !self.is_boundary_edge(e))
    }

    // ==================== Validation ====================

    /// Check all connectivity invariants, reporting the first violation.
    pub fn check_validity(&self) -> Result<()> {
        for e in self.edge_ids() {
            let rec = self.record(e);
            if !self.has_vert(rec.org) {
                return Err(MeshError::topology(e, "origin vertex is not valid"));
            }
            if !self.has_edge(e.sym()) {
                return Err(MeshError::topology(e, "opposite edge is not valid"));
            }
            if !self.has_edge(rec.next) {
                return Err(MeshError::topology(e, "next edge is not valid"));
            }
            if self.org(rec.next) != self.dest(e) {
                return Err(MeshError::topology(e, "next edge does not start at destination"));
            }
            if self.left(rec.next) != rec.left {
                return Err(MeshError::topology(e, "next edge has a different left face"));
            }
            if rec.left.is_valid() && !self.has_face(rec.left) {
                return Err(MeshError::topology(e, "left face is not valid"));
            }
            if !rec.left.is_valid() && !self.left(e.sym()).is_valid() {
                return Err(MeshError::topology(e, "edge has no face on either side"));
            }
        }

        for f in self.face_ids() {
            let e = self.edge_with_left(f);
            if !self.has_edge(e) || self.left(e) != f {
                return Err(MeshError::topology(e, "face edge does not bound the face"));
            }
            self.get_left_tri_verts(e)?;
        }

        for v in self.vert_ids() {
            let e = self.edge_with_org(v);
            if !self.has_edge(e) || self.org(e) != v {
                return Err(MeshError::topology(e, "vertex edge does not start at the vertex"));
            }
        }

        Ok(())
    }

    /// Check if all connectivity invariants hold.
    pub fn is_valid(&self) -> bool {
        self.check_validity().is_ok()
    }

    // ==================== Construction ====================

    /// Grow the vertex id space. New vertices stay invalid until an edge uses them.
    pub(crate) fn resize_verts(&mut self, n: usize) {
        if n > self.edge_per_vertex.len() {
            self.edge_per_vertex.resize(n, EdgeId::invalid());
            self.valid_verts.resize(n);
        }
    }

    /// Allocate a new pair of half-edges `a -> b` and `b -> a`, returning the first.
    pub(crate) fn make_edge(&mut self, a: VertId, b: VertId) -> EdgeId {
        let e = EdgeId::new(self.edges.len());
        self.edges.push(HalfEdgeRecord {
            org: a,
            ..Default::default()
        });
        self.edges.push(HalfEdgeRecord {
            org: b,
            ..Default::default()
        });
        e
    }

    /// Create a triangular face from three half-edges forming a directed cycle.
    pub(crate) fn add_triangle(&mut self, cycle: [EdgeId; 3]) -> FaceId {
        let f = FaceId::new(self.edge_per_face.len());
        self.edge_per_face.push(cycle[0]);
        self.valid_faces.insert(f);
        self.num_valid_faces += 1;
        for k in 0..3 {
            let rec = &mut self.edges[cycle[k].index()];
            rec.left = f;
            rec.next = cycle[(k + 1) % 3];
        }
        f
    }

    /// Remove faces. Edges left without faces and vertices left without
    /// edges are deleted too; ids are never reused.
    pub(crate) fn delete_faces(&mut self, region: &FaceBitSet) {
        let mut touched = Vec::new();
        for f in region.iter() {
            if !self.has_face(f) {
                continue;
            }
            let e0 = self.edge_with_left(f);
            let mut e = e0;
            for _ in 0..3 {
                let n = self.next(e);
                self.edges[e.index()].left = FaceId::invalid();
                touched.push(e);
                e = n;
            }
            self.edge_per_face[f.index()] = EdgeId::invalid();
            self.valid_faces.remove(f);
            self.num_valid_faces -= 1;
        }

        for e in touched {
            if self.has_edge(e) && !self.left(e).is_valid() && !self.right(e).is_valid() {
                for h in [e, e.sym()] {
                    self.edges[h.index()] = HalfEdgeRecord::default();
                }
            }
        }

        self.rebuild_vertex_edges();
        self.link_boundary_loops();
    }

    /// Recompute the outgoing edge of every vertex and the vertex validity set.
    pub(crate) fn rebuild_vertex_edges(&mut self) {
        self.edge_per_vertex.fill(EdgeId::invalid());
        for i in 0..self.edges.len() {
            let org = self.edges[i].org;
            if org.is_valid() && !self.edge_per_vertex[org.index()].is_valid() {
                self.edge_per_vertex[org.index()] = EdgeId::new(i);
            }
        }

        self.valid_verts = VertBitSet::new(self.edge_per_vertex.len());
        for (i, e) in self.edge_per_vertex.iter().enumerate() {
            if e.is_valid() {
                self.valid_verts.insert(VertId::new(i));
            }
        }
        self.num_valid_verts = self.valid_verts.count();
    }

    /// Link every boundary half-edge to the boundary half-edge that leaves its
    /// destination, found by rotating through the faces around that vertex.
    pub(crate) fn link_boundary_loops(&mut self) {
        let boundary: Vec<EdgeId> = self
            .edge_ids()
            .filter(|&e| self.is_boundary_edge(e))
            .collect();

        for e in boundary {
            let next = self.find_next_boundary(e);
            self.edges[e.index()].next = next;
        }
    }

    fn find_next_boundary(&self, e: EdgeId) -> EdgeId {
        // sym(e) leaves dest(e) and has a face; rotate around dest(e) until
        // an outgoing half-edge without a face shows up.
        let mut h = e.sym();
        for _ in 0..self.edges.len() {
            let incoming = self.next(self.next(h));
            let out = incoming.sym();
            if self.is_boundary_edge(out) {
                return out;
            }
            h = out;
        }
        EdgeId::invalid()
    }
}

/// Iterator over half-edges leaving a vertex.
pub struct OutEdgeIter<'a> {
    topology: &'a MeshTopology,
    start: EdgeId,
    current: EdgeId,
    remaining: usize,
}

impl<'a> OutEdgeIter<'a> {
    fn new(topology: &'a MeshTopology, v: VertId) -> Self {
        let start = if topology.has_vert(v) {
            topology.edge_with_org(v)
        } else {
            EdgeId::invalid()
        };
        Self {
            topology,
            start,
            current: start,
            remaining: if start.is_valid() { topology.edge_size() } else { 0 },
        }
    }
}

impl Iterator for OutEdgeIter<'_> {
    type Item = EdgeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let result = self.current;

        // If e goes v -> w, then sym(e) goes w -> v and the half-edge after
        // it (around its face or hole) leaves v again.
        self.current = self.topology.next(self.current.sym());
        if self.current == self.start || !self.current.is_valid() {
            self.remaining = 0;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles sharing the edge 0-1, built by hand.
    fn two_triangles() -> MeshTopology {
        let mut topo = MeshTopology::with_capacity(4, 2);
        topo.resize_verts(4);
        let [v0, v1, v2, v3] = [0, 1, 2, 3].map(VertId::new);

        let e01 = topo.make_edge(v0, v1);
        let e12 = topo.make_edge(v1, v2);
        let e20 = topo.make_edge(v2, v0);
        topo.add_triangle([e01, e12, e20]);

        let e03 = topo.make_edge(v0, v3);
        let e31 = topo.make_edge(v3, v1);
        topo.add_triangle([e01.sym(), e03, e31]);

        topo.rebuild_vertex_edges();
        topo.link_boundary_loops();
        topo
    }

    #[test]
    fn test_empty_topology() {
        let topo = MeshTopology::new();
        assert_eq!(topo.num_valid_verts(), 0);
        assert_eq!(topo.num_valid_faces(), 0);
        assert!(topo.is_valid());
    }

    #[test]
    fn test_hand_built() {
        let topo = two_triangles();
        assert_eq!(topo.num_valid_verts(), 4);
        assert_eq!(topo.num_valid_faces(), 2);
        assert_eq!(topo.edge_size(), 10);
        assert_eq!(topo.num_undirected_edges(), 5);
        assert!(topo.is_valid());
        assert!(!topo.is_closed());
        assert_eq!(topo.boundary_edges().count(), 4);
    }

    #[test]
    fn test_left_tri_verts() {
        let topo = two_triangles();
        let verts = topo.get_left_tri_verts(EdgeId::new(0)).unwrap();
        assert_eq!(verts, [0, 1, 2].map(VertId::new));

        let verts = topo.get_left_tri_verts(EdgeId::new(1)).unwrap();
        assert_eq!(verts, [1, 0, 3].map(VertId::new));
    }

    #[test]
    fn test_left_tri_verts_errors() {
        let topo = two_triangles();
        // E(3) is 2 -> 1 on the boundary.
        assert!(matches!(
            topo.get_left_tri_verts(EdgeId::new(3)),
            Err(MeshError::InvalidTopology { .. })
        ));
        assert!(matches!(
            topo.get_left_tri_verts(EdgeId::new(100)),
            Err(MeshError::InvalidTopology { .. })
        ));
        assert!(topo.get_left_tri_verts(EdgeId::invalid()).is_err());
    }

    #[test]
    fn test_boundary_loop_closes() {
        let topo = two_triangles();
        let start = EdgeId::new(3);
        let mut e = start;
        let mut steps = 0;
        loop {
            assert!(topo.is_boundary_edge(e));
            assert_eq!(topo.org(topo.next(e)), topo.dest(e));
            e = topo.next(e);
            steps += 1;
            if e == start {
                break;
            }
        }
        assert_eq!(steps, 4);
        assert_eq!(topo.prev(start), EdgeId::new(5));
    }

    #[test]
    fn test_vertex_ring() {
        let topo = two_triangles();
        let mut neighbors: Vec<usize> = topo
            .vertex_neighbors(VertId::new(0))
            .map(VertId::index)
            .collect();
        neighbors.sort_unstable();
        assert_eq!(neighbors, vec![1, 2, 3]);
        assert_eq!(topo.valence(VertId::new(1)), 3);
        assert!(topo.is_boundary_vertex(VertId::new(0)));
    }

    #[test]
    fn test_delete_face() {
        let mut topo = two_triangles();
        topo.delete_faces(&FaceBitSet::from_ids(2, [FaceId::new(1)]));

        assert_eq!(topo.num_valid_faces(), 1);
        assert_eq!(topo.num_valid_verts(), 3);
        assert!(!topo.has_vert(VertId::new(3)));
        assert!(!topo.has_edge(EdgeId::new(6)));
        assert!(topo.has_edge(EdgeId::new(0)));
        assert_eq!(topo.num_undirected_edges(), 3);
        assert_eq!(topo.boundary_edges().count(), 3);
        assert!(topo.is_valid());
        // Ids are not reused.
        assert_eq!(topo.face_size(), 2);
    }
}
