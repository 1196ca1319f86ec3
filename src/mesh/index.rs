//! Index types for mesh elements.
//!
//! This module provides type-safe index wrappers for vertices, half-edges,
//! undirected edges and faces. All of them wrap a `u32`; `u32::MAX` is
//! reserved as the "none" sentinel.
//!
//! Half-edges are allocated in pairs: `E(2k)` and `E(2k + 1)` are the two
//! opposite halves of undirected edge `k`.

use std::fmt::{self, Debug};
use std::hash::Hash;

const INVALID: u32 = u32::MAX;

/// Trait implemented by every identifier type, so that containers such as
/// [`TypedBitSet`](super::TypedBitSet) can be keyed by them.
pub trait MeshId: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Create an identifier from a raw index.
    fn from_index(index: usize) -> Self;

    /// Get the raw index value.
    fn to_index(self) -> usize;
}

/// A type-safe vertex index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertId(u32);

/// A type-safe half-edge index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct EdgeId(u32);

/// A type-safe undirected edge index (a pair of opposite half-edges).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct UndirectedEdgeId(u32);

/// A type-safe face index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a raw value.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index < INVALID as usize, "index {} too large", index);
                Self(index as u32)
            }

            /// Create an invalid/null index.
            #[inline]
            pub const fn invalid() -> Self {
                Self(INVALID)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Check if this is a valid (non-null) index.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != INVALID
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.index())
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }

        impl MeshId for $name {
            #[inline]
            fn from_index(index: usize) -> Self {
                Self::new(index)
            }

            #[inline]
            fn to_index(self) -> usize {
                self.index()
            }
        }
    };
}

impl_index_type!(VertId, "V");
impl_index_type!(EdgeId, "E");
impl_index_type!(UndirectedEdgeId, "UE");
impl_index_type!(FaceId, "F");

impl EdgeId {
    /// The opposite half-edge.
    #[inline]
    pub fn sym(self) -> Self {
        debug_assert!(self.is_valid());
        Self(self.0 ^ 1)
    }

    /// True for the first half-edge of its pair.
    #[inline]
    pub fn is_even(self) -> bool {
        self.0 & 1 == 0
    }

    /// The undirected edge this half-edge belongs to.
    #[inline]
    pub fn undirected(self) -> UndirectedEdgeId {
        UndirectedEdgeId(self.0 >> 1)
    }
}

impl UndirectedEdgeId {
    /// The even half-edge of this undirected edge.
    #[inline]
    pub fn edge(self) -> EdgeId {
        EdgeId(self.0 << 1)
    }
}
