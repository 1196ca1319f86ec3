//! Dense bit sets keyed by mesh identifiers.
//!
//! A [`TypedBitSet`] marks a subset of one identifier space. The mesh uses
//! them to track which vertices, half-edges and faces are alive, and callers
//! use them as regions that restrict an operation to part of a mesh.

use std::fmt::{self, Debug};
use std::marker::PhantomData;

use super::index::{EdgeId, FaceId, MeshId, VertId};

const WORD_BITS: usize = u64::BITS as usize;

/// A fixed-capacity set of identifiers of type `I`, stored one bit per id.
pub struct TypedBitSet<I: MeshId> {
    words: Vec<u64>,
    len: usize,
    _marker: PhantomData<fn() -> I>,
}

/// A set of vertices.
pub type VertBitSet = TypedBitSet<VertId>;
/// A set of half-edges.
pub type EdgeBitSet = TypedBitSet<EdgeId>;
/// A set of faces.
pub type FaceBitSet = TypedBitSet<FaceId>;

impl<I: MeshId> TypedBitSet<I> {
    /// Create an empty set able to hold ids `0..len`.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
            _marker: PhantomData,
        }
    }

    /// Create a set containing every id in `0..len`.
    pub fn full(len: usize) -> Self {
        let mut set = Self {
            words: vec![u64::MAX; len.div_ceil(WORD_BITS)],
            len,
            _marker: PhantomData,
        };
        set.clear_tail();
        set
    }

    /// Create a set of capacity `len` from a list of ids.
    ///
    /// Ids at or beyond `len` grow the set.
    pub fn from_ids(len: usize, ids: impl IntoIterator<Item = I>) -> Self {
        let mut set = Self::new(len);
        for id in ids {
            set.insert(id);
        }
        set
    }

    /// Capacity in ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no id is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Grow or shrink the capacity. New ids start unset.
    pub fn resize(&mut self, len: usize) {
        self.words.resize(len.div_ceil(WORD_BITS), 0);
        self.len = len;
        self.clear_tail();
    }

    /// Test membership. Ids outside the capacity are never members.
    #[inline]
    pub fn contains(&self, id: I) -> bool {
        let i = id.to_index();
        i < self.len && self.words[i / WORD_BITS] & (1 << (i % WORD_BITS)) != 0
    }

    /// Add an id, growing the capacity if needed.
    pub fn insert(&mut self, id: I) {
        let i = id.to_index();
        if i >= self.len {
            self.resize(i + 1);
        }
        self.words[i / WORD_BITS] |= 1 << (i % WORD_BITS);
    }

    /// Remove an id. Returns whether it was present.
    pub fn remove(&mut self, id: I) -> bool {
        let present = self.contains(id);
        if present {
            let i = id.to_index();
            self.words[i / WORD_BITS] &= !(1 << (i % WORD_BITS));
        }
        present
    }

    /// Set or clear an id.
    pub fn set(&mut self, id: I, value: bool) {
        if value {
            self.insert(id);
        } else {
            self.remove(id);
        }
    }

    /// Number of ids in the set.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate over members in ascending order.
    pub fn iter(&self) -> Iter<'_, I> {
        Iter {
            words: &self.words,
            word_index: 0,
            current: self.words.first().copied().unwrap_or(0),
            _marker: PhantomData,
        }
    }

    /// The largest member, if any.
    pub fn last(&self) -> Option<I> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| **w != 0)
            .map(|(wi, w)| {
                I::from_index(wi * WORD_BITS + (WORD_BITS - 1 - w.leading_zeros() as usize))
            })
    }

    /// Keep only ids also present in `other`.
    pub fn intersect_with(&mut self, other: &Self) {
        for (i, w) in self.words.iter_mut().enumerate() {
            *w &= other.words.get(i).copied().unwrap_or(0);
        }
    }

    /// Add every id of `other`.
    pub fn union_with(&mut self, other: &Self) {
        if other.len > self.len {
            self.resize(other.len);
        }
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= *o;
        }
    }

    /// Remove every id of `other`.
    pub fn subtract(&mut self, other: &Self) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w &= !*o;
        }
    }

    /// Ids present in both sets.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.intersect_with(other);
        out
    }

    /// Ids present in either set.
    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.union_with(other);
        out
    }

    fn clear_tail(&mut self) {
        let rem = self.len % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

impl<I: MeshId> Clone for TypedBitSet<I> {
    fn clone(&self) -> Self {
        Self {
            words: self.words.clone(),
            len: self.len,
            _marker: PhantomData,
        }
    }
}

impl<I: MeshId> Default for TypedBitSet<I> {
    fn default() -> Self {
        Self::new(0)
    }
}

// Equality is by membership; unused capacity does not matter.
impl<I: MeshId> PartialEq for TypedBitSet<I> {
    fn eq(&self, other: &Self) -> bool {
        let n = self.words.len().max(other.words.len());
        (0..n).all(|i| {
            self.words.get(i).copied().unwrap_or(0) == other.words.get(i).copied().unwrap_or(0)
        })
    }
}

impl<I: MeshId> Eq for TypedBitSet<I> {}

impl<I: MeshId> Debug for TypedBitSet<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<I: MeshId> FromIterator<I> for TypedBitSet<I> {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self::from_ids(0, iter)
    }
}

impl<'a, I: MeshId> IntoIterator for &'a TypedBitSet<I> {
    type Item = I;
    type IntoIter = Iter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over the members of a [`TypedBitSet`].
pub struct Iter<'a, I: MeshId> {
    words: &'a [u64],
    word_index: usize,
    current: u64,
    _marker: PhantomData<fn() -> I>,
}

impl<I: MeshId> Iterator for Iter<'_, I> {
    type Item = I;

    fn next(&mut self) -> Option<I> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(I::from_index(self.word_index * WORD_BITS + bit));
            }
            self.word_index += 1;
            self.current = *self.words.get(self.word_index)?;
        }
    }
}
