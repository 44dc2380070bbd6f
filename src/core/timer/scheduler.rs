//! The timer scheduler: a binary heap over arena-resident entries.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

use super::{Arena, TimeStamp, TimerHandle, TimerHandler, TimerInfo, TimerKey, TimerState};

struct Entry<S, U> {
    due: S,
    interval: S,
    state: TimerState,
    handler: Rc<dyn TimerHandler<S, U>>,
    user: U,
}

/// Heap item: ordering snapshot of an entry's due time.
///
/// An entry is heap-resident at most once; its `due` here always matches the
/// arena entry's, because the due time only advances while the entry is
/// popped out for execution.
#[derive(Clone, Copy)]
struct HeapItem<S> {
    due: S,
    key: TimerKey,
}

impl<S: Ord> PartialEq for HeapItem<S> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<S: Ord> Eq for HeapItem<S> {}

impl<S: Ord> PartialOrd for HeapItem<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S: Ord> Ord for HeapItem<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest due time wins.
        // Ties broken arbitrarily but totally, by slot index.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.key.index.cmp(&self.key.index))
    }
}

/// A priority-ordered scheduler of one-shot and recurring timers.
///
/// `S` is the timestamp type (`u32` or `u64`, see [`Timers32`]/[`Timers64`]);
/// `U` is an opaque per-timer user payload cloned into each callback.
///
/// # Concurrency
///
/// A scheduler instance is confined to one logical thread of control: there is
/// no internal lock, and handlers are held as `Rc`. Run one instance per
/// worker thread, or add external synchronization.
///
/// # Cancellation
///
/// [`cancel`](Timers::cancel) is lazy: it flips the entry to
/// [`TimerState::Cancelled`] and lets [`process`](Timers::process) reap it,
/// because arbitrary-position removal is not a native heap operation. A
/// counter tracks cancelled-but-resident entries; once it exceeds half the
/// heap size, an eager purge partitions the storage, frees the cancelled
/// entries, and rebuilds the heap, bounding worst-case memory and scan cost.
pub struct Timers<S: TimeStamp, U: Clone = ()> {
    arena: Arena<Entry<S, U>>,
    heap: BinaryHeap<HeapItem<S>>,
    /// Entry currently inside its callback, if any. Covers the reentrant case
    /// where a handler queries or cancels its own handle mid-callback.
    processing: Option<TimerKey>,
    last_process_time: S,
    cancelled: usize,
    registrations: usize,
}

/// Scheduler over 32-bit timestamps.
pub type Timers32<U = ()> = Timers<u32, U>;
/// Scheduler over 64-bit timestamps.
pub type Timers64<U = ()> = Timers<u64, U>;

impl<S: TimeStamp, U: Clone> Default for Timers<S, U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TimeStamp, U: Clone> Timers<S, U> {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            heap: BinaryHeap::new(),
            processing: None,
            last_process_time: S::ZERO,
            cancelled: 0,
            registrations: 0,
        }
    }

    /// Number of heap-resident entries, cancelled residue included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no entries are heap-resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of live registrations (added and not yet released).
    #[must_use]
    pub fn registrations(&self) -> usize {
        self.registrations
    }

    /// Number of cancelled entries not yet physically freed.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.cancelled
    }

    /// The `now` passed to the most recent [`process`](Timers::process) call.
    #[must_use]
    pub fn last_process_time(&self) -> S {
        self.last_process_time
    }

    /// Registers a timer firing at `start_time`, then every `interval`
    /// (`interval == 0` means one-shot).
    ///
    /// The returned handle stays valid until the entry is freed; validate
    /// with [`legal`](Timers::legal).
    pub fn add(
        &mut self,
        start_time: S,
        interval: S,
        handler: Rc<dyn TimerHandler<S, U>>,
        user: U,
    ) -> TimerHandle {
        let key = self.arena.insert(Entry {
            due: start_time,
            interval,
            state: TimerState::Pending,
            handler,
            user,
        });
        self.heap.push(HeapItem {
            due: start_time,
            key,
        });
        self.registrations += 1;
        TimerHandle::new(key)
    }

    /// Fires every entry due at or before `now` and reaps cancelled residue.
    ///
    /// Returns the number of entries actually fired; cancelled entries reaped
    /// along the way do not count. Recurring entries advance by their interval
    /// and re-enter the heap, so an entry whose next due time is still within
    /// `now` fires again within the same call. Handlers may add or cancel
    /// timers (their own included) while this runs.
    pub fn process(&mut self, now: S) -> usize {
        let mut fired = 0;

        loop {
            let Some(&top) = self.heap.peek() else { break };
            let top_cancelled = self
                .arena
                .get(top.key)
                .is_none_or(|e| e.state == TimerState::Cancelled);
            if top.due > now && !top_cancelled {
                break;
            }
            self.heap.pop();

            if top_cancelled {
                self.reap(top.key);
                continue;
            }

            fired += 1;
            self.processing = Some(top.key);
            self.trigger(top.key);

            match self.arena.get(top.key) {
                Some(e) if e.state != TimerState::Cancelled => {
                    let due = e.due;
                    self.heap.push(HeapItem { due, key: top.key });
                }
                _ => self.reap(top.key),
            }
            self.processing = None;
        }

        self.processing = None;
        self.last_process_time = now;
        // Every arena slot is either a live registration or cancelled residue.
        debug_assert_eq!(self.arena.len(), self.registrations + self.cancelled);
        fired
    }

    /// Runs one entry's callback and post-firing transition.
    fn trigger(&mut self, key: TimerKey) {
        let Some(entry) = self.arena.get_mut(key) else {
            return;
        };
        entry.state = TimerState::Executing;
        let handler = Rc::clone(&entry.handler);
        let user = entry.user.clone();

        handler.handle_timeout(self, TimerHandle::new(key), user);

        // A one-shot that survived its own callback is cancelled now, running
        // the release hook exactly as an explicit cancel would.
        let one_shot_done = self
            .arena
            .get(key)
            .is_some_and(|e| e.state != TimerState::Cancelled && e.interval == S::ZERO);
        if one_shot_done {
            self.cancel(TimerHandle::new(key));
        }

        if let Some(entry) = self.arena.get_mut(key) {
            if entry.state != TimerState::Cancelled {
                entry.due = entry.due + entry.interval;
                entry.state = TimerState::Pending;
            }
        }
    }

    /// Frees a cancelled entry's slot and settles the cancellation counter.
    fn reap(&mut self, key: TimerKey) {
        if self.arena.remove(key).is_some() {
            debug_assert!(self.cancelled > 0);
            self.cancelled = self.cancelled.saturating_sub(1);
        }
    }

    /// Cancels the entry behind `handle`.
    ///
    /// Defined no-op when the handle is unset, stale, or already cancelled.
    /// The state flips before this returns; physical heap removal is deferred
    /// to [`process`](Timers::process) or the amortized purge.
    pub fn cancel(&mut self, handle: TimerHandle) {
        let Some(key) = handle.key() else { return };
        let Some(entry) = self.arena.get_mut(key) else {
            return;
        };
        if entry.state == TimerState::Cancelled {
            return;
        }
        entry.state = TimerState::Cancelled;
        let handler = Rc::clone(&entry.handler);
        let user = entry.user.clone();

        // Count before the hook runs: a release hook may cancel further
        // timers, and a nested purge must see this entry as accounted for.
        self.registrations -= 1;
        self.cancelled += 1;
        handler.on_release(self, handle, user);

        if self.cancelled * 2 > self.heap.len() {
            self.purge_cancelled();
        }
    }

    /// Partitions the heap storage, frees cancelled entries, and rebuilds.
    ///
    /// O(n), amortized across the many cancellations needed to reach the
    /// trigger threshold.
    fn purge_cancelled(&mut self) {
        let before = self.heap.len();
        let arena = &mut self.arena;
        let mut purged = 0usize;
        self.heap.retain(|item| {
            let keep = arena
                .get(item.key)
                .is_some_and(|e| e.state != TimerState::Cancelled);
            if !keep {
                arena.remove(item.key);
                purged += 1;
            }
            keep
        });
        self.cancelled = self.cancelled.saturating_sub(purged);
        // Only a currently-executing entry can remain cancelled here, since
        // it is the one cancelled entry that is not heap-resident.
        debug_assert!(self.cancelled <= 1);
        if purged > 0 {
            tracing::trace!(purged, before, after = self.heap.len(), "purged cancelled timers");
        }
    }

    /// Whether `handle` still refers to a live entry: pending in the heap,
    /// currently executing, or cancelled but not yet reaped.
    #[must_use]
    pub fn legal(&self, handle: TimerHandle) -> bool {
        handle.key().is_some_and(|key| self.arena.contains(key))
    }

    /// Time until the earliest trigger, or zero if the heap is empty or the
    /// top entry is already overdue. Sized for the caller's event-loop wait.
    #[must_use]
    pub fn next_exp(&self, now: S) -> S {
        match self.heap.peek() {
            Some(top) if now <= top.due => top.due - now,
            _ => S::ZERO,
        }
    }

    /// Read-only snapshot of a timer's trigger time, interval, and user data.
    ///
    /// Returns `None` for unset or stale handles and for cancelled entries.
    #[must_use]
    pub fn timer_info(&self, handle: TimerHandle) -> Option<TimerInfo<S, U>> {
        let entry = self.arena.get(handle.key()?)?;
        if entry.state == TimerState::Cancelled {
            return None;
        }
        Some(TimerInfo {
            time: entry.due,
            interval: entry.interval,
            user: entry.user.clone(),
        })
    }

    /// Drains the entire heap and frees every entry.
    ///
    /// With `should_call_cancel`, non-cancelled entries get their release
    /// hooks, bounded to the initially observed heap size so a hook that
    /// re-queues timers cannot extend the drain unboundedly; entries past the
    /// bound (and everything when the flag is off) are dropped silently.
    pub fn clear(&mut self, should_call_cancel: bool) {
        let mut budget = self.heap.len();
        let mut call_cancel = should_call_cancel;

        while let Some(item) = self.heap.pop() {
            let released = match self.arena.get_mut(item.key) {
                Some(entry) if entry.state != TimerState::Cancelled => {
                    entry.state = TimerState::Cancelled;
                    Some((Rc::clone(&entry.handler), entry.user.clone()))
                }
                Some(_) => None,
                None => continue,
            };
            if let Some((handler, user)) = released {
                self.registrations -= 1;
                if call_cancel {
                    handler.on_release(self, TimerHandle::new(item.key), user);
                    budget = budget.saturating_sub(1);
                    if budget == 0 {
                        call_cancel = false;
                    }
                }
            }
            self.arena.remove(item.key);
        }

        self.cancelled = 0;
        self.processing = None;
    }
}

impl<S: TimeStamp, U: Clone> Drop for Timers<S, U> {
    fn drop(&mut self) {
        self.clear(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Noop;

    impl TimerHandler<u32> for Noop {
        fn handle_timeout(&self, _: &mut Timers<u32>, _: TimerHandle, _user: ()) {}
    }

    #[test]
    fn process_on_empty_scheduler_fires_nothing() {
        let mut timers: Timers32 = Timers32::new();
        assert_eq!(timers.process(100), 0);
        assert_eq!(timers.last_process_time(), 100);
        assert!(timers.is_empty());
    }

    #[test]
    fn next_exp_reports_wait_until_earliest_trigger() {
        let mut timers: Timers32 = Timers32::new();
        assert_eq!(timers.next_exp(5), 0);

        timers.add(30, 0, Rc::new(Noop), ());
        timers.add(20, 0, Rc::new(Noop), ());
        assert_eq!(timers.next_exp(5), 15);
        assert_eq!(timers.next_exp(20), 0);
        assert_eq!(timers.next_exp(25), 0);
    }

    #[test]
    fn unset_handle_is_never_legal() {
        let timers: Timers32 = Timers32::new();
        let handle = TimerHandle::unset();
        assert!(!handle.is_set());
        assert!(!timers.legal(handle));
        assert!(timers.timer_info(handle).is_none());
    }

    #[test]
    fn clear_without_cancel_detaches_the_handle_only() {
        let mut timers: Timers32 = Timers32::new();
        let mut handle = timers.add(10, 0, Rc::new(Noop), ());
        assert!(handle.is_set());

        handle.clear_without_cancel();
        assert!(!handle.is_set());
        // The entry itself is untouched.
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.process(10), 1);
    }

    struct CountRelease {
        released: Cell<usize>,
    }

    impl TimerHandler<u32> for CountRelease {
        fn handle_timeout(&self, _: &mut Timers<u32>, _: TimerHandle, _user: ()) {}

        fn on_release(&self, _: &mut Timers<u32>, _: TimerHandle, _user: ()) {
            self.released.set(self.released.get() + 1);
        }
    }

    #[test]
    fn drop_clears_and_releases_pending_timers() {
        let handler = Rc::new(CountRelease {
            released: Cell::new(0),
        });
        {
            let mut timers: Timers32 = Timers32::new();
            timers.add(10, 0, Rc::clone(&handler) as Rc<dyn TimerHandler<u32>>, ());
            timers.add(20, 5, Rc::clone(&handler) as Rc<dyn TimerHandler<u32>>, ());
        }
        assert_eq!(handler.released.get(), 2);
    }

    #[test]
    fn double_cancel_is_a_no_op() {
        let handler = Rc::new(CountRelease {
            released: Cell::new(0),
        });
        let mut timers: Timers32 = Timers32::new();
        let a = timers.add(10, 0, Rc::clone(&handler) as Rc<dyn TimerHandler<u32>>, ());
        let b = timers.add(20, 0, Rc::clone(&handler) as Rc<dyn TimerHandler<u32>>, ());

        timers.cancel(a);
        timers.cancel(a);
        assert_eq!(handler.released.get(), 1);
        assert_eq!(timers.registrations(), 1);

        // Stale handle after the entry is freed: still a no-op.
        timers.process(0);
        timers.cancel(a);
        assert_eq!(handler.released.get(), 1);
        assert!(timers.legal(b));
    }
}
