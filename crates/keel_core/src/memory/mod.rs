//! # Memory Management
//!
//! Slot pools for zero-allocation gameplay.
//!
//! ## Design Philosophy
//!
//! Memory is allocated when a pool grows, never on acquire or release:
//! - Slots are pre-initialized and reused in place
//! - Growth appends blocks and never moves existing ones
//! - Handles stay valid until released

mod bitmap;
mod growable_pool;
mod slot_pool;

pub use bitmap::FreeBitmap;
pub use growable_pool::GrowablePool;
pub use slot_pool::{SlotPool, SlotRef};
