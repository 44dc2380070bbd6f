//! Thread-safe bounded object pooling for high-churn objects.
//!
//! Message and stream objects are created at a very high rate on a busy
//! server. [`ObjectPool`] keeps a bounded free list of pre-constructed
//! instances behind a `parking_lot::Mutex`, so steady-state acquisition is a
//! list pop instead of an allocation. A single pool-wide lock is acceptable
//! here: pool churn, not lock contention, is the bottleneck for short-lived
//! message objects.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// Number of objects constructed per pre-allocation burst.
pub const POOL_PREALLOC_BATCH: usize = 16;

/// Default ceiling on idle (pooled) instances.
pub const POOL_DEFAULT_MAX_IDLE: usize = POOL_PREALLOC_BATCH * 16;

/// Capability every pooled type must implement.
pub trait Poolable {
    /// Reset state so the object is safe for reuse. Called under the pool
    /// lock on every reclaim, before the keep-or-drop decision.
    fn on_reclaimed(&mut self);

    /// Reinitialize before hand-off to a caller. Default no-op.
    fn on_enabled(&mut self) {}

    /// Called at pool teardown for each idle instance. Return `true` to keep
    /// ownership of your own lifetime: [`ObjectPool::destroy`] hands such
    /// objects back to the caller instead of dropping them.
    fn on_pool_destroyed(&mut self) -> bool {
        false
    }

    /// Approximate resident size, for diagnostics. Default zero.
    fn pool_object_bytes(&self) -> usize {
        0
    }
}

struct PoolInner<T> {
    idle: VecDeque<T>,
    /// Instances ever allocated and still attributed to the pool
    /// (idle plus checked-out); dropped instances are subtracted.
    total_allocs: usize,
    destroyed: bool,
}

/// A mutex-guarded bounded free list of pre-constructed objects.
///
/// Reuse is FIFO (oldest idle instance first). When the free list runs dry,
/// a burst of [`POOL_PREALLOC_BATCH`] fresh instances is constructed, which
/// bounds allocation-call frequency under bursty demand. At most
/// [`max`](ObjectPool::max) idle instances are retained; objects reclaimed
/// above the ceiling are dropped immediately.
///
/// All mutating operations and [`size`](ObjectPool::size) are mutually
/// exclusive via one pool-wide lock; hold times are O(1) amortized.
pub struct ObjectPool<T: Poolable> {
    name: String,
    max_idle: usize,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    inner: Mutex<PoolInner<T>>,
}

impl<T: Poolable> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("name", &self.name)
            .field("max_idle", &self.max_idle)
            .finish_non_exhaustive()
    }
}

impl<T: Poolable> ObjectPool<T> {
    /// Creates a pool with the default idle ceiling and no pre-allocation.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_config(name, 0, POOL_DEFAULT_MAX_IDLE, factory)
    }

    /// Creates a pool with `prealloc` instances constructed up front and an
    /// idle ceiling of `max_idle` (a ceiling of zero is clamped to one).
    pub fn with_config<F>(
        name: impl Into<String>,
        prealloc: usize,
        max_idle: usize,
        factory: F,
    ) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let pool = Self {
            name: name.into(),
            max_idle: max_idle.max(1),
            factory: Box::new(factory),
            inner: Mutex::new(PoolInner {
                idle: VecDeque::new(),
                total_allocs: 0,
                destroyed: false,
            }),
        };
        if prealloc > 0 {
            let mut inner = pool.inner.lock();
            Self::assign_objs(&mut inner, &pool.factory, prealloc);
        }
        pool
    }

    /// Constructs `count` fresh instances onto the idle list. Caller holds
    /// the lock.
    fn assign_objs(inner: &mut PoolInner<T>, factory: &(dyn Fn() -> T + Send + Sync), count: usize) {
        for _ in 0..count {
            inner.idle.push_back(factory());
            inner.total_allocs += 1;
        }
    }

    /// Acquires an object, reusing the oldest idle instance when one exists.
    ///
    /// On an empty free list, a pre-allocation burst refills it first. The
    /// object's [`Poolable::on_enabled`] hook runs before hand-off.
    pub fn create(&self) -> T {
        let mut inner = self.inner.lock();
        loop {
            if let Some(mut obj) = inner.idle.pop_front() {
                obj.on_enabled();
                return obj;
            }
            tracing::trace!(pool = %self.name, batch = POOL_PREALLOC_BATCH, "pool empty, allocating batch");
            Self::assign_objs(&mut inner, &self.factory, POOL_PREALLOC_BATCH);
        }
    }

    /// Acquires an object wrapped in an RAII guard that reclaims on drop.
    pub fn create_scoped(&self) -> Pooled<'_, T> {
        Pooled {
            pool: self,
            obj: Some(self.create()),
        }
    }

    /// Returns an object to the pool.
    ///
    /// The object's [`Poolable::on_reclaimed`] hook always runs. If the idle
    /// ceiling is reached or the pool is destroyed, the object is dropped
    /// instead of pooled.
    pub fn reclaim(&self, obj: T) {
        let mut inner = self.inner.lock();
        self.reclaim_locked(&mut inner, obj);
    }

    /// Bulk reclaim: returns every object yielded by `objs` under one lock
    /// acquisition.
    pub fn reclaim_all<I>(&self, objs: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut inner = self.inner.lock();
        for obj in objs {
            self.reclaim_locked(&mut inner, obj);
        }
    }

    fn reclaim_locked(&self, inner: &mut PoolInner<T>, mut obj: T) {
        obj.on_reclaimed();
        if inner.idle.len() >= self.max_idle || inner.destroyed {
            inner.total_allocs -= 1;
            tracing::trace!(pool = %self.name, "idle ceiling reached, dropping reclaimed object");
        } else {
            inner.idle.push_back(obj);
        }
    }

    /// Marks the pool permanently destroyed and drains the free list.
    ///
    /// Each idle object is asked via [`Poolable::on_pool_destroyed`] whether
    /// it manages its own lifetime; those that do are returned to the caller,
    /// the rest are dropped. Subsequent reclaims drop immediately.
    pub fn destroy(&self) -> Vec<T> {
        let mut inner = self.inner.lock();
        inner.destroyed = true;

        let mut self_managed = Vec::new();
        while let Some(mut obj) = inner.idle.pop_front() {
            if obj.on_pool_destroyed() {
                self_managed.push(obj);
            } else {
                inner.total_allocs -= 1;
            }
        }
        tracing::debug!(
            pool = %self.name,
            handed_back = self_managed.len(),
            "object pool destroyed"
        );
        self_managed
    }

    /// Current idle count, lock-guarded.
    pub fn size(&self) -> usize {
        self.inner.lock().idle.len()
    }

    /// The configured idle ceiling.
    #[must_use]
    pub fn max(&self) -> usize {
        self.max_idle
    }

    /// Instances ever allocated and still attributed to the pool (idle plus
    /// checked-out).
    pub fn total_allocs(&self) -> usize {
        self.inner.lock().total_allocs
    }

    /// Whether [`destroy`](ObjectPool::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }

    /// The pool's diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sum of [`Poolable::pool_object_bytes`] across idle instances.
    pub fn idle_bytes(&self) -> usize {
        self.inner
            .lock()
            .idle
            .iter()
            .map(Poolable::pool_object_bytes)
            .sum()
    }
}

impl<T: Poolable> fmt::Display for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        write!(
            f,
            "ObjectPool(name={}, idle={}/{}, total_allocs={}, destroyed={})",
            self.name,
            inner.idle.len(),
            self.max_idle,
            inner.total_allocs,
            inner.destroyed
        )
    }
}

impl<T: Poolable> Drop for ObjectPool<T> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.destroyed {
            return;
        }
        inner.destroyed = true;
        while let Some(mut obj) = inner.idle.pop_front() {
            if obj.on_pool_destroyed() {
                // Nowhere to hand the object back from a destructor.
                tracing::warn!(pool = %self.name, "self-managed object dropped at pool teardown");
            }
            inner.total_allocs -= 1;
        }
    }
}

/// RAII guard around a checked-out pool object.
///
/// Dereferences to the object and reclaims it on drop; [`detach`](Pooled::detach)
/// opts out and hands ownership to the caller.
pub struct Pooled<'a, T: Poolable> {
    pool: &'a ObjectPool<T>,
    obj: Option<T>,
}

impl<T: Poolable> Pooled<'_, T> {
    /// Takes the object out of the guard; it will not be reclaimed on drop.
    #[must_use]
    pub fn detach(mut self) -> T {
        self.obj.take().expect("pooled object present until drop")
    }
}

impl<T: Poolable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.obj.as_ref().expect("pooled object present until drop")
    }
}

impl<T: Poolable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.obj.as_mut().expect("pooled object present until drop")
    }
}

impl<T: Poolable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(obj) = self.obj.take() {
            self.pool.reclaim(obj);
        }
    }
}
