// src/storage/mod.rs
//! Store client contract and the in-process implementation

mod memory_storage;
mod traits;

pub use memory_storage::MemoryStore;
pub use traits::{DocumentStore, UpdateResult};
