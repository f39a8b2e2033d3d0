//! Queue backends.

pub mod memory;

pub use memory::PriorityBlockingQueue;
