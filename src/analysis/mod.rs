//! Reduction pipelines and the batch driver that runs them.

pub mod aggregator;
pub mod categorical;
pub mod energy;
pub mod stats;

pub use aggregator::{run_batch, BatchOptions};
