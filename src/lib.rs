//! # tickbase
//!
//! Low-level runtime primitives shared by the processes of a tick-driven
//! multiplayer server engine.
//!
//! The crate provides three subsystems that higher-level server components
//! (account services, game logic, database gateways) consume but never
//! re-implement:
//!
//! - **Timer scheduling** ([`Timers`]): a binary-heap-ordered collection of
//!   one-shot and recurring timed callbacks with lazy cancellation and an
//!   amortized purge of cancelled entries.
//! - **Object pooling** ([`ObjectPool`]): a mutex-guarded bounded free list
//!   that amortizes allocation for high-churn message and stream objects.
//! - **Reference counting** ([`RefPtr`]): intrusive shared ownership with a
//!   pluggable plain vs. atomic counter.
//!
//! ## Timer scheduling
//!
//! A server process's main loop periodically calls [`Timers::process`] to fire
//! due timers; [`Timers::next_exp`] sizes the wait between ticks. Handlers are
//! invoked with mutable access to the scheduler, so a callback may add or
//! cancel timers (including its own) mid-flight.
//!
//! ```
//! use std::rc::Rc;
//! use tickbase::{TimerHandle, TimerHandler, Timers, Timers32};
//!
//! struct Heartbeat;
//!
//! impl TimerHandler<u32> for Heartbeat {
//!     fn handle_timeout(&self, _timers: &mut Timers<u32>, _handle: TimerHandle, _user: ()) {
//!         // send a keepalive...
//!     }
//! }
//!
//! let mut timers: Timers32 = Timers32::new();
//! let handle = timers.add(10, 0, Rc::new(Heartbeat), ());
//! assert!(timers.legal(handle));
//! assert_eq!(timers.process(10), 1);
//! // One-shot timers are cancelled and freed after their single firing.
//! assert!(!timers.legal(handle));
//! ```
//!
//! ## Object pooling
//!
//! ```
//! use tickbase::{ObjectPool, Poolable};
//!
//! #[derive(Default)]
//! struct Message {
//!     payload: Vec<u8>,
//! }
//!
//! impl Poolable for Message {
//!     fn on_reclaimed(&mut self) {
//!         self.payload.clear();
//!     }
//! }
//!
//! let pool = ObjectPool::new("messages", Message::default);
//! let mut msg = pool.create();
//! msg.payload.extend_from_slice(b"hello");
//! pool.reclaim(msg);
//! assert_eq!(pool.size(), tickbase::POOL_PREALLOC_BATCH);
//! ```
//!
//! ## Concurrency contracts
//!
//! A [`Timers`] instance is confined to a single logical thread of control (it
//! holds `Rc` handler references and is deliberately `!Send`). [`ObjectPool`]
//! is safe for concurrent access from any number of threads. [`RefPtr`] is
//! thread-safe only with the [`AtomicCounter`] counter implementation.

/// Core runtime primitives: timers, pools, and reference counting.
pub mod core;
/// Configuration models for pools and the tick loop.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Shared utilities: clocks and telemetry bootstrap.
pub mod util;

pub use crate::builders::build_pools;
pub use crate::config::{PoolSettings, RuntimeConfig};
pub use crate::core::error::{AppResult, CoreError};
pub use crate::core::pool::{
    ObjectPool, Poolable, Pooled, POOL_DEFAULT_MAX_IDLE, POOL_PREALLOC_BATCH,
};
pub use crate::core::refcount::{
    AtomicCounter, Counter, LocalCounter, LocalRefPtr, RefCountable, RefPtr, SharedCounter,
};
pub use crate::core::timer::{
    TimeStamp, TimerHandle, TimerHandler, TimerInfo, TimerState, Timers, Timers32, Timers64,
};
pub use crate::util::{init_tracing, now_ms, ManualClock};
