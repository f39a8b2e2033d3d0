//! Runtime adapters that execute scheduled jobs on an async runtime.

pub mod tokio_executor;

pub use tokio_executor::TokioExecutor;
