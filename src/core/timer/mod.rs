//! Priority-ordered timer scheduling for tick-driven event loops.
//!
//! A [`Timers`] instance owns a set of timer entries ordered by trigger time.
//! Each entry is either one-shot (`interval == 0`) or recurring, and is
//! addressed by a generation-checked [`TimerHandle`] that can be validated in
//! O(1) long after the entry may have been freed.
//!
//! Cancellation is lazy: cancelling flips the entry's state and lets
//! [`Timers::process`] reap it, with an amortized purge bounding how many
//! cancelled entries can stay resident. See [`Timers`] for the full contract.

mod arena;
mod scheduler;

pub(crate) use arena::{Arena, TimerKey};
pub use scheduler::{Timers, Timers32, Timers64};

use std::fmt;
use std::ops::{Add, Sub};

/// Unsigned timestamp type a scheduler is instantiated over.
///
/// Implemented for `u32` and `u64`. The unit is whatever the surrounding
/// process's tick loop counts in (stamps, milliseconds, ticks); the scheduler
/// only compares and adds.
pub trait TimeStamp:
    Copy + Ord + Default + Add<Output = Self> + Sub<Output = Self> + fmt::Debug + 'static
{
    /// The zero value: "no wait" for [`Timers::next_exp`], "one-shot" as an
    /// interval.
    const ZERO: Self;
}

impl TimeStamp for u32 {
    const ZERO: Self = 0;
}

impl TimeStamp for u64 {
    const ZERO: Self = 0;
}

/// Lifecycle state of a timer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Waiting in the heap for its trigger time.
    Pending,
    /// Currently inside its handler callback.
    Executing,
    /// Cancelled; freed once reaped from the heap.
    Cancelled,
}

/// A non-owning, comparable reference to a timer entry.
///
/// The handle is a slot index plus a generation; equality is entry identity.
/// A handle stays comparable and queryable after the entry is freed — it
/// simply stops resolving ([`Timers::legal`] returns `false`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimerHandle {
    key: Option<TimerKey>,
}

impl TimerHandle {
    pub(crate) fn new(key: TimerKey) -> Self {
        Self { key: Some(key) }
    }

    /// A handle that refers to nothing.
    #[must_use]
    pub fn unset() -> Self {
        Self::default()
    }

    /// Whether this handle still points at an entry.
    ///
    /// Detachment is always explicit: only [`TimerHandle::clear_without_cancel`]
    /// unsets a handle, never the scheduler.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.key.is_some()
    }

    /// Detach without cancelling the underlying entry.
    pub fn clear_without_cancel(&mut self) {
        self.key = None;
    }

    pub(crate) fn key(&self) -> Option<TimerKey> {
        self.key
    }
}

/// Read-only snapshot of a live timer entry.
#[derive(Debug, Clone)]
pub struct TimerInfo<S, U> {
    /// Next trigger time.
    pub time: S,
    /// Recurrence interval; zero for one-shot timers.
    pub interval: S,
    /// The opaque user payload registered with the entry.
    pub user: U,
}

/// Capability implemented by anything that wants timer callbacks.
///
/// Handlers are registered per entry as `Rc<dyn TimerHandler<..>>`, so a
/// handler structurally outlives every timer registered against it. Both
/// callbacks receive mutable access to the owning scheduler and may add or
/// cancel timers — including the one currently firing — from inside the call.
pub trait TimerHandler<S: TimeStamp, U: Clone = ()> {
    /// Called when a timer registered against this handler expires.
    fn handle_timeout(&self, timers: &mut Timers<S, U>, handle: TimerHandle, user: U);

    /// Called when a registration is torn down administratively (cancel or
    /// scheduler clear), distinct from normal firing.
    fn on_release(&self, timers: &mut Timers<S, U>, handle: TimerHandle, user: U) {
        let _ = (timers, handle, user);
    }
}
