//! # Component Mask
//!
//! Fixed-width bitset, one bit per registered component type.

use std::ops::{BitAnd, BitOr};

use super::component::TypeIndex;

/// Maximum number of distinct component types a table supports.
pub const MAX_COMPONENT_TYPES: usize = 128;

const MASK_WORDS: usize = MAX_COMPONENT_TYPES / 64;

/// Bitset of component types.
///
/// Used per entity (which components it owns) and per query (which
/// components are required). An entity matches a query when
/// `entity.contains(&query)`, i.e. `entity & query == query`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask {
    words: [u64; MASK_WORDS],
}

impl ComponentMask {
    /// The empty mask.
    pub const EMPTY: Self = Self {
        words: [0; MASK_WORDS],
    };

    /// Builds a mask with the given bits set.
    ///
    /// # Panics
    ///
    /// Panics if an index is `>= MAX_COMPONENT_TYPES`.
    #[must_use]
    pub fn from_indices(indices: &[TypeIndex]) -> Self {
        let mut mask = Self::EMPTY;
        for &index in indices {
            mask.set(index);
        }
        mask
    }

    /// Sets bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_COMPONENT_TYPES`.
    #[inline]
    pub fn set(&mut self, index: TypeIndex) {
        let (word, bit) = Self::locate(index);
        self.words[word] |= bit;
    }

    /// Clears bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_COMPONENT_TYPES`.
    #[inline]
    pub fn reset(&mut self, index: TypeIndex) {
        let (word, bit) = Self::locate(index);
        self.words[word] &= !bit;
    }

    /// Clears every bit.
    #[inline]
    pub fn reset_all(&mut self) {
        self.words = [0; MASK_WORDS];
    }

    /// Tests bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_COMPONENT_TYPES`.
    #[inline]
    #[must_use]
    pub fn test(&self, index: TypeIndex) -> bool {
        let (word, bit) = Self::locate(index);
        self.words[word] & bit != 0
    }

    /// Returns true if every bit of `required` is also set here.
    #[inline]
    #[must_use]
    pub fn contains(&self, required: &Self) -> bool {
        (*self & *required) == *required
    }

    /// Returns true if no bit is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Returns the number of set bits.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates over set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TypeIndex> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut remaining = word;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some(TypeIndex::new(word_idx * 64 + bit))
            })
        })
    }

    #[inline]
    fn locate(index: TypeIndex) -> (usize, u64) {
        let i = index.get();
        assert!(
            i < MAX_COMPONENT_TYPES,
            "type index {i} exceeds mask width {MAX_COMPONENT_TYPES}"
        );
        (i / 64, 1u64 << (i % 64))
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        let mut words = self.words;
        for (w, r) in words.iter_mut().zip(rhs.words) {
            *w &= r;
        }
        Self { words }
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        let mut words = self.words;
        for (w, r) in words.iter_mut().zip(rhs.words) {
            *w |= r;
        }
        Self { words }
    }
}
