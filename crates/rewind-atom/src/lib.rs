//! Recorded API invocations ("atoms") and the shadow memory they observe.
//!
//! This crate is API-agnostic: an operation catalog plugs in by implementing [`Command`]
//! for its closed command enum.

mod alloc;
mod atom;
pub mod memory;

pub use alloc::{Allocator, TempAlloc, DEFAULT_TEMP_BASE, DEFAULT_TEMP_SIZE};
pub use atom::{Atom, AtomFlags, AtomId, Command, Observations};
pub use memory::{Displaced, MemoryError, Observation, Pointer, Pool, Range};
