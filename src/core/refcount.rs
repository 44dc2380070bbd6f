//! Intrusive reference counting with a pluggable counter implementation.
//!
//! [`RefPtr`] is a scoped owning handle over a counted heap allocation:
//! construction starts the count at one, cloning increments, dropping
//! decrements, and the last decrement destroys the value. The counter is a
//! capability with two implementations: [`LocalCounter`] for objects only
//! ever owned from one logical thread at a time, and [`AtomicCounter`] for
//! objects shared across threads.
//!
//! Counter underflow is a programming error and asserts; the crate favors
//! fail-fast over masking corruption in a long-running server process.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{fence, AtomicUsize, Ordering};

/// Ownership counter capability.
///
/// Implementations choose between plain and atomic arithmetic; the sharing
/// pattern of the concrete type selects the implementation, never ad hoc
/// atomics at call sites.
pub trait Counter {
    /// Creates a counter holding `count`.
    fn with_count(count: usize) -> Self;

    /// Increments, returning the previous value.
    fn increment(&self) -> usize;

    /// Decrements, returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics on underflow (decrement of a zero count).
    fn decrement(&self) -> usize;

    /// Current value.
    fn get(&self) -> usize;
}

/// Marker for counters safe to share across threads.
///
/// The last decrementer must observe every write made while other owners
/// held the object, so only synchronizing counters qualify.
pub trait SharedCounter: Counter + Send + Sync {}

/// Plain-integer counter for single-threaded ownership transfer.
#[derive(Debug)]
pub struct LocalCounter(Cell<usize>);

impl Counter for LocalCounter {
    fn with_count(count: usize) -> Self {
        Self(Cell::new(count))
    }

    fn increment(&self) -> usize {
        let prev = self.0.get();
        self.0.set(prev + 1);
        prev
    }

    fn decrement(&self) -> usize {
        let prev = self.0.get();
        assert!(prev > 0, "reference count underflow");
        self.0.set(prev - 1);
        prev
    }

    fn get(&self) -> usize {
        self.0.get()
    }
}

/// Atomic counter for ownership shared across concurrent threads.
///
/// Increments are relaxed; decrements release, and the destroying path
/// acquires, so exactly one thread — the last decrementer — observes zero
/// and runs destruction with all prior writes visible.
#[derive(Debug)]
pub struct AtomicCounter(AtomicUsize);

impl Counter for AtomicCounter {
    fn with_count(count: usize) -> Self {
        Self(AtomicUsize::new(count))
    }

    fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    fn decrement(&self) -> usize {
        let prev = self.0.fetch_sub(1, Ordering::Release);
        assert!(prev > 0, "reference count underflow");
        prev
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

impl SharedCounter for AtomicCounter {}

/// Capability for types held through [`RefPtr`].
pub trait RefCountable {
    /// Last-chance hook, invoked exactly once when the final handle drops,
    /// immediately before the allocation is destroyed. Default no-op.
    fn on_ref_exhausted(&mut self) {}
}

struct RefBox<T, C> {
    count: C,
    value: T,
}

/// A scoped owning handle to a reference-counted `T`.
///
/// Many handles may share one allocation; the value's lifetime is exactly
/// "at least one outstanding handle". Defaults to the thread-safe
/// [`AtomicCounter`]; use [`LocalRefPtr`] for single-threaded ownership.
pub struct RefPtr<T: RefCountable, C: Counter = AtomicCounter> {
    inner: NonNull<RefBox<T, C>>,
    _marker: PhantomData<RefBox<T, C>>,
}

/// Single-threaded [`RefPtr`] over a plain-integer counter.
pub type LocalRefPtr<T> = RefPtr<T, LocalCounter>;

impl<T: RefCountable, C: Counter> RefPtr<T, C> {
    /// Boxes `value` with a count of one.
    pub fn new(value: T) -> Self {
        let boxed = Box::new(RefBox {
            count: C::with_count(1),
            value,
        });
        Self {
            inner: NonNull::from(Box::leak(boxed)),
            _marker: PhantomData,
        }
    }

    fn shared(&self) -> &RefBox<T, C> {
        // SAFETY: the allocation lives until the count reaches zero, and this
        // handle holds one reference, so the count is at least one here.
        unsafe { self.inner.as_ref() }
    }

    /// Borrows the owned value.
    #[must_use]
    pub fn get(&self) -> &T {
        &self.shared().value
    }

    /// Current reference count, for diagnostics and tests.
    ///
    /// Under concurrent access the value may be stale by the time it is read.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.shared().count.get()
    }

    /// Whether two handles share one allocation (reference identity).
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.inner == b.inner
    }
}

impl<T: RefCountable, C: Counter> Clone for RefPtr<T, C> {
    fn clone(&self) -> Self {
        self.shared().count.increment();
        Self {
            inner: self.inner,
            _marker: PhantomData,
        }
    }
}

impl<T: RefCountable, C: Counter> Deref for RefPtr<T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T: RefCountable, C: Counter> Drop for RefPtr<T, C> {
    fn drop(&mut self) {
        if self.shared().count.decrement() != 1 {
            return;
        }
        // Pair with the Release decrements of handles dropped on other
        // threads before taking ownership of their writes.
        fence(Ordering::Acquire);

        // SAFETY: this was the last handle; the pointer came from Box::leak
        // in `new` and nobody else can reach it anymore.
        let mut boxed = unsafe { Box::from_raw(self.inner.as_ptr()) };
        debug_assert_eq!(boxed.count.get(), 0, "nonzero count at destruction");
        boxed.value.on_ref_exhausted();
    }
}

impl<T: RefCountable + fmt::Debug, C: Counter> fmt::Debug for RefPtr<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefPtr")
            .field("value", self.get())
            .field("count", &self.ref_count())
            .finish()
    }
}

// SAFETY: moving or sharing a handle across threads exposes the counter and
// the value to concurrent access; both must be thread-safe. `SharedCounter`
// restricts this to the atomic counter implementation.
unsafe impl<T: RefCountable + Send + Sync, C: SharedCounter> Send for RefPtr<T, C> {}
// SAFETY: as above; `&RefPtr` only hands out `&T` and counter operations.
unsafe impl<T: RefCountable + Send + Sync, C: SharedCounter> Sync for RefPtr<T, C> {}
