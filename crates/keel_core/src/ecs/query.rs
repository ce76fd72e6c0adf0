//! # Query Results
//!
//! Flat, reusable buffer of query matches.
//!
//! ```text
//! query [Position, Velocity]:
//!   entities: [ E0,            E3            ]
//!   slots:    [ P(E0), V(E0),  P(E3), V(E3)  ]   stride = 2
//! ```

use super::entity::EntityId;
use crate::memory::SlotRef;

/// Matches of one query, stored flat.
///
/// Keep one buffer around and pass it to
/// [`EntityTable::query_into`](super::EntityTable::query_into) every frame:
/// once it has grown to the working set, queries stop allocating.
#[derive(Clone, Debug, Default)]
pub struct QueryBuffer {
    entities: Vec<EntityId>,
    slots: Vec<SlotRef>,
    stride: usize,
}

/// One matching entity and its requested component handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryMatch<'a> {
    /// The matching entity.
    pub entity: EntityId,
    /// Component handles, in the order the types were requested.
    pub slots: &'a [SlotRef],
}

impl QueryBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer with room for `matches` matches of `stride` types.
    #[must_use]
    pub fn with_capacity(matches: usize, stride: usize) -> Self {
        Self {
            entities: Vec::with_capacity(matches),
            slots: Vec::with_capacity(matches * stride),
            stride,
        }
    }

    /// Returns the number of matches.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if nothing matched.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns the number of handles per match.
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the matching entities in scan order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Returns match `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<QueryMatch<'_>> {
        let entity = *self.entities.get(index)?;
        let start = index * self.stride;
        Some(QueryMatch {
            entity,
            slots: &self.slots[start..start + self.stride],
        })
    }

    /// Iterates over all matches.
    pub fn iter(&self) -> impl Iterator<Item = QueryMatch<'_>> {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Drops all matches and sets the stride for the next query.
    pub(crate) fn reset(&mut self, stride: usize) {
        self.entities.clear();
        self.slots.clear();
        self.stride = stride;
    }

    pub(crate) fn push(&mut self, entity: EntityId, slots: impl IntoIterator<Item = SlotRef>) {
        self.entities.push(entity);
        self.slots.extend(slots);
        debug_assert_eq!(self.slots.len(), self.entities.len() * self.stride);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_layout() {
        let mut buffer = QueryBuffer::new();
        buffer.reset(2);
        buffer.push(
            EntityId::new(0, 0),
            [SlotRef::from_raw(10), SlotRef::from_raw(20)],
        );
        buffer.push(
            EntityId::new(3, 1),
            [SlotRef::from_raw(11), SlotRef::from_raw(21)],
        );

        assert_eq!(buffer.len(), 2);
        let second = buffer.get(1).unwrap();
        assert_eq!(second.entity, EntityId::new(3, 1));
        assert_eq!(second.slots, &[SlotRef::from_raw(11), SlotRef::from_raw(21)]);
        assert!(buffer.get(2).is_none());

        let entities: Vec<_> = buffer.iter().map(|m| m.entity.index()).collect();
        assert_eq!(entities, vec![0, 3]);

        buffer.reset(1);
        assert!(buffer.is_empty());
        assert_eq!(buffer.stride(), 1);
    }

    #[test]
    fn test_zero_stride() {
        let mut buffer = QueryBuffer::with_capacity(4, 0);
        buffer.reset(0);
        buffer.push(EntityId::new(1, 0), []);
        assert_eq!(buffer.get(0).unwrap().slots.len(), 0);
        assert_eq!(buffer.entities(), &[EntityId::new(1, 0)]);
    }
}
