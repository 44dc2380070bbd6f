//! Core runtime primitives and their capability contracts.

pub mod error;
pub mod pool;
#[allow(unsafe_code)]
pub mod refcount;
pub mod timer;

pub use error::{AppResult, CoreError};
pub use pool::{ObjectPool, Poolable, Pooled, POOL_DEFAULT_MAX_IDLE, POOL_PREALLOC_BATCH};
pub use refcount::{
    AtomicCounter, Counter, LocalCounter, LocalRefPtr, RefCountable, RefPtr, SharedCounter,
};
pub use timer::{
    TimeStamp, TimerHandle, TimerHandler, TimerInfo, TimerState, Timers, Timers32, Timers64,
};
