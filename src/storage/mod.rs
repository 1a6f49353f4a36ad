//! Data storage and persistence
//!
//! The pending-transaction pool and the JSON chain snapshot.

pub mod memory_pool;
pub mod snapshot;

pub use memory_pool::{FeeStatistics, MemoryPool};
pub use snapshot::Snapshot;
