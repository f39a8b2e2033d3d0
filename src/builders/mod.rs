//! Composition helpers wiring configuration, executors and schedulers.

pub mod scheduler_builder;

pub use scheduler_builder::{build_scheduler, global_executor, SchedulerBuilder};
