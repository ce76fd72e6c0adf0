//! # KEEL Core
//!
//! Pooled storage core for an Entity Component System (ECS):
//! - Fixed slot pools and growable pools of slot pools
//! - 128-bit component masks
//! - An entity table with per-type component pools, singletons and
//!   mask queries
//!
//! ## Architecture Rules
//!
//! 1. **No heap traffic in steady state** - Freed slots are reused before pools grow
//! 2. **Handles, not pointers** - Pools hand out [`SlotRef`] indices
//! 3. **Explicit registration** - Component types are indexed by a frozen [`Registry`]
//!
//! ## Example
//!
//! ```rust
//! use keel_core::{EntityTable, RegistryBuilder};
//!
//! #[derive(Clone, Default)]
//! struct Position { x: f32, y: f32 }
//! #[derive(Clone, Default)]
//! struct Velocity { x: f32, y: f32 }
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register::<Position>();
//! builder.register::<Velocity>();
//! let mut table = EntityTable::new(builder.build().unwrap());
//!
//! let e = table.create_entity().unwrap();
//! table.insert(e, Position { x: 1.0, y: 2.0 }).unwrap();
//! table.insert(e, Velocity { x: 0.5, y: 0.0 }).unwrap();
//!
//! let vel = table.get::<Velocity>(e).unwrap().clone();
//! let pos = table.get_mut::<Position>(e).unwrap();
//! pos.x += vel.x;
//! assert_eq!(table.get::<Position>(e).unwrap().x, 1.5);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;
pub mod sync;

pub use config::{GrowthFn, GrowthPolicy, PoolPolicy, TableConfig};
pub use ecs::{
    Component, ComponentMask, ComponentStore, EntityId, EntityRecord, EntityTable, ErasedPool,
    GenerationalIds, IdAllocator, PoolStats, PoolStore, QueryBuffer, QueryMatch, Registry,
    RegistryBuilder, Singletons, TableStats, TypeIndex, MAX_COMPONENT_TYPES,
};
pub use error::{ConfigError, EcsError, EcsResult, PoolError, PoolResult};
pub use memory::{FreeBitmap, GrowablePool, SlotPool, SlotRef};
pub use sync::SharedTable;
