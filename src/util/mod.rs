//! Shared utilities.

pub mod clock;
pub mod telemetry;

pub use clock::{now_ms, ManualClock};
pub use telemetry::init_tracing;
