//! Configuration models for pools and the tick loop.

pub mod runtime;

pub use runtime::{PoolSettings, RuntimeConfig};
