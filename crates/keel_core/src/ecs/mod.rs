//! # Entity Component System
//!
//! A pooled ECS storage core.
//!
//! ## Design Philosophy
//!
//! - Component types get dense indices from an explicit registry
//! - Each component type lives in its own growable slot pool
//! - Entities are a mask plus a slot table, drawn from a pool of records
//! - Queries compare masks; no dynamic dispatch per component access

mod component;
mod entity;
mod mask;
mod query;
mod singleton;
mod storage;
mod table;

pub use component::{Component, Registry, RegistryBuilder, TypeIndex};
pub use entity::{EntityId, EntityRecord, GenerationalIds, IdAllocator};
pub use mask::{ComponentMask, MAX_COMPONENT_TYPES};
pub use query::{QueryBuffer, QueryMatch};
pub use singleton::Singletons;
pub use storage::{typed_pool, typed_pool_mut, ComponentStore, ErasedPool, PoolStore};
pub use table::{EntityTable, PoolStats, TableStats};
