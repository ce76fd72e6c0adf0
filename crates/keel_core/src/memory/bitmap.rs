//! # Free Bitmap
//!
//! Word-packed bitset used to track free slots.
//!
//! At 64 slots per `u64`, the lowest free slot is found with one
//! `trailing_zeros` per non-empty word instead of a scan over slot values.

/// Bitset where a set bit marks a free slot.
///
/// ## Performance
///
/// - Set / clear / test: O(1)
/// - First free: O(n/64) worst case, O(1) when the first word has a free bit
/// - Append: amortized O(1)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FreeBitmap {
    /// Bits, 64 slots per word. Bits past `len` are always zero.
    words: Vec<u64>,
    /// Number of tracked slots.
    len: usize,
}

impl FreeBitmap {
    /// Creates a bitmap of `len` bits, all free or all occupied.
    #[must_use]
    pub fn new(len: usize, free: bool) -> Self {
        let word_count = len.div_ceil(64);
        let mut words = vec![if free { u64::MAX } else { 0 }; word_count];

        // Keep the tail of the last word clean so `first_set` never
        // reports a slot past `len`.
        let remaining = len % 64;
        if free && remaining > 0 {
            if let Some(last) = words.last_mut() {
                *last = (1u64 << remaining) - 1;
            }
        }

        Self { words, len }
    }

    /// Returns the number of tracked bits.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no bits are tracked.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends one bit.
    pub fn push(&mut self, free: bool) {
        let index = self.len;
        if index % 64 == 0 {
            self.words.push(0);
        }
        self.len += 1;
        if free {
            self.set(index);
        }
    }

    /// Marks bit `index` as free.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn set(&mut self, index: usize) {
        assert!(index < self.len, "bit {index} out of range ({})", self.len);
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    /// Marks bit `index` as occupied.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn clear(&mut self, index: usize) {
        assert!(index < self.len, "bit {index} out of range ({})", self.len);
        self.words[index / 64] &= !(1u64 << (index % 64));
    }

    /// Returns true if bit `index` is free. Out-of-range bits read as occupied.
    #[inline]
    #[must_use]
    pub fn test(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Returns the lowest free index, if any.
    #[inline]
    #[must_use]
    pub fn first_set(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, word)| **word != 0)
            .map(|(word_idx, word)| word_idx * 64 + word.trailing_zeros() as usize)
    }

    /// Returns the number of free bits.
    #[must_use]
    pub fn count_set(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Drops every bit.
    pub fn truncate_all(&mut self) {
        self.words.clear();
        self.len = 0;
    }
}
