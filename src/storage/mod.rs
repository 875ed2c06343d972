pub mod engine;
pub mod memory;
pub mod slot;

pub use engine::{SlotStore, SlotTransaction};
pub use memory::{MemorySlotStore, MemoryTransaction};
pub use slot::{Lookup, SlotKey, SlotRow};
