//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - An index, recycled after the entity is destroyed
//! - A generation counter for safe reuse
//!
//! The data behind an entity is an [`EntityRecord`]: the component mask and
//! the slot table, always updated together.

use super::component::TypeIndex;
use super::mask::ComponentMask;
use crate::memory::SlotRef;

/// Unique identifier for an entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    ///
    /// # Arguments
    ///
    /// * `index` - The recyclable index (0 to 2^32-1)
    /// * `generation` - The generation counter (0 to 2^32-1)
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the raw 64-bit value.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

/// Source of entity identifiers.
///
/// The table acquires an ID for every created entity and releases it on
/// destruction. Implementations must never hand out an ID that is still
/// live, and must never hand out [`EntityId::NULL`].
pub trait IdAllocator {
    /// Issues a fresh ID.
    fn acquire(&mut self) -> EntityId;

    /// Returns an ID for reuse.
    ///
    /// IDs released once must never compare equal to a later issued ID.
    fn release(&mut self, id: EntityId);
}

/// Default allocator: recycles indices, bumping the generation on release.
#[derive(Clone, Debug, Default)]
pub struct GenerationalIds {
    /// Current generation per index.
    generations: Vec<u32>,
    /// Released indices, reused LIFO.
    free_indices: Vec<u32>,
}

impl GenerationalIds {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of IDs currently issued.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.generations.len() - self.free_indices.len()
    }
}

impl IdAllocator for GenerationalIds {
    fn acquire(&mut self) -> EntityId {
        if let Some(index) = self.free_indices.pop() {
            return EntityId::new(index, self.generations[index as usize]);
        }

        let index = u32::try_from(self.generations.len()).unwrap_or(u32::MAX);
        assert!(index < u32::MAX, "entity index space exhausted");
        self.generations.push(0);
        EntityId::new(index, 0)
    }

    fn release(&mut self, id: EntityId) {
        let index = id.index();
        debug_assert_eq!(
            self.generations.get(index as usize).copied(),
            Some(id.generation()),
            "released unknown or stale entity {id:?}"
        );
        let Some(generation) = self.generations.get_mut(index as usize) else {
            return;
        };
        if *generation != id.generation() {
            return;
        }

        // Invalidate old references
        *generation = generation.wrapping_add(1);
        self.free_indices.push(index);
    }
}

/// The data behind one live entity.
///
/// Holds the component mask and the slot table. Bit `i` of the mask is set
/// iff slot `i` holds a handle; the only mutators update both together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityRecord {
    /// Bitmask of attached components.
    mask: ComponentMask,
    /// Pool handle per component type.
    slots: Box<[Option<SlotRef>]>,
}

impl EntityRecord {
    /// Creates an empty record with room for `type_count` component types.
    #[must_use]
    pub fn new(type_count: usize) -> Self {
        Self {
            mask: ComponentMask::EMPTY,
            slots: vec![None; type_count].into_boxed_slice(),
        }
    }

    /// Returns the component mask.
    #[inline]
    #[must_use]
    pub const fn mask(&self) -> &ComponentMask {
        &self.mask
    }

    /// Returns true if component `ty` is attached.
    #[inline]
    #[must_use]
    pub fn has(&self, ty: TypeIndex) -> bool {
        self.slot(ty).is_some()
    }

    /// Returns the handle of component `ty`, if attached.
    #[inline]
    #[must_use]
    pub fn slot(&self, ty: TypeIndex) -> Option<SlotRef> {
        self.slots.get(ty.get()).copied().flatten()
    }

    /// Attaches component `ty` stored at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is out of range or already attached.
    pub fn set_component(&mut self, ty: TypeIndex, slot: SlotRef) {
        let entry = &mut self.slots[ty.get()];
        assert!(entry.is_none(), "component {ty} is already attached");
        *entry = Some(slot);
        self.mask.set(ty);
    }

    /// Detaches component `ty`, returning its handle.
    pub fn clear_component(&mut self, ty: TypeIndex) -> Option<SlotRef> {
        let slot = self.slots.get_mut(ty.get())?.take()?;
        self.mask.reset(ty);
        Some(slot)
    }

    /// Detaches every component, passing each handle to `release`.
    pub fn clear_all(&mut self, mut release: impl FnMut(TypeIndex, SlotRef)) {
        for ty in self.mask.iter() {
            if let Some(slot) = self.slots[ty.get()].take() {
                release(ty, slot);
            }
        }
        self.mask.reset_all();
    }

    /// Returns true if no component is attached.
    #[inline]
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.mask.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_roundtrip() {
        let id = EntityId::new(12345, 67890);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.generation(), 67890);
        assert!(!id.is_null());
        assert!(EntityId::default().is_null());
    }

    #[test]
    fn test_generational_reuse() {
        let mut ids = GenerationalIds::new();
        let a = ids.acquire();
        let b = ids.acquire();
        assert_ne!(a, b);
        assert_eq!(ids.live_count(), 2);

        ids.release(a);
        let c = ids.acquire();
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert_eq!(ids.live_count(), 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "stale")]
    fn test_stale_release_caught() {
        let mut ids = GenerationalIds::new();
        let a = ids.acquire();
        ids.release(a);
        let _reused = ids.acquire();
        ids.release(a);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "unknown")]
    fn test_unknown_release_caught() {
        let mut ids = GenerationalIds::new();
        ids.release(EntityId::new(7, 0));
    }

    #[test]
    fn test_record_lock_step() {
        let mut record = EntityRecord::new(4);
        let ty = TypeIndex::new(2);
        assert!(record.is_clear());

        record.set_component(ty, SlotRef::from_raw(9));
        assert!(record.mask().test(ty));
        assert_eq!(record.slot(ty), Some(SlotRef::from_raw(9)));

        assert_eq!(record.clear_component(ty), Some(SlotRef::from_raw(9)));
        assert!(!record.mask().test(ty));
        assert_eq!(record.slot(ty), None);
        assert_eq!(record.clear_component(ty), None);
    }

    #[test]
    fn test_record_clear_all() {
        let mut record = EntityRecord::new(3);
        record.set_component(TypeIndex::new(0), SlotRef::from_raw(1));
        record.set_component(TypeIndex::new(2), SlotRef::from_raw(5));

        let mut released = Vec::new();
        record.clear_all(|ty, slot| released.push((ty.get(), slot.index())));

        assert_eq!(released, vec![(0, 1), (2, 5)]);
        assert!(record.is_clear());
        assert_eq!(record, EntityRecord::new(3));
    }

    #[test]
    #[should_panic(expected = "already attached")]
    fn test_record_double_set_panics() {
        let mut record = EntityRecord::new(1);
        record.set_component(TypeIndex::new(0), SlotRef::from_raw(0));
        record.set_component(TypeIndex::new(0), SlotRef::from_raw(1));
    }
}
