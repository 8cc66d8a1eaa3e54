//! Pending-unit queue backends.

pub mod memory;

pub use memory::{InMemoryQueue, QueuedUnit};
