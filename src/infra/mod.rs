//! Infrastructure adapters for in-process queues.

pub mod queue;
pub use queue::PriorityBlockingQueue;
