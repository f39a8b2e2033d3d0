//! In-memory blocking priority queue.
//!
//! A `BinaryHeap` of [`KeyedEntry`] values behind a `parking_lot::Mutex`,
//! with a `Condvar` that parks consumers until an entry arrives or their
//! monotonic deadline passes. Push is O(log n) and never blocks.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::entry::{Comparator, KeyedEntry, QueueOrder};
use crate::core::SchedulerError;

/// Thread-safe priority queue with blocking, timed and non-blocking pops.
pub struct PriorityBlockingQueue<T> {
    heap: Mutex<BinaryHeap<KeyedEntry<T>>>,
    not_empty: Condvar,
    comparator: Comparator<T>,
    order: QueueOrder,
    waiting: AtomicUsize,
}

/// Keeps `waiting` in step with parked callers on every exit path.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl<T> PriorityBlockingQueue<T> {
    /// Create a queue ordered by `comparator`, popping per `order`.
    pub fn new<F>(order: QueueOrder, comparator: F) -> Self
    where
        F: Fn(&T, &T) -> CmpOrdering + Send + Sync + 'static,
    {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            not_empty: Condvar::new(),
            comparator: Arc::new(comparator),
            order,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Queue that pops the smallest entry under `comparator` first.
    pub fn min_by<F>(comparator: F) -> Self
    where
        F: Fn(&T, &T) -> CmpOrdering + Send + Sync + 'static,
    {
        Self::new(QueueOrder::Min, comparator)
    }

    /// Queue that pops the largest entry under `comparator` first.
    pub fn max_by<F>(comparator: F) -> Self
    where
        F: Fn(&T, &T) -> CmpOrdering + Send + Sync + 'static,
    {
        Self::new(QueueOrder::Max, comparator)
    }

    /// Insert an item and signal one parked consumer, if any.
    pub fn push(&self, item: T) -> &Self {
        let entry = KeyedEntry::new(item, Arc::clone(&self.comparator), self.order);
        self.heap.lock().push(entry);
        if self.num_waiting() > 0 {
            self.not_empty.notify_one();
        }
        self
    }

    /// Insert an optional item; `None` is refused.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidArgument` when `item` is `None`.
    pub fn try_push(&self, item: Option<T>) -> Result<&Self, SchedulerError> {
        let item = item.ok_or_else(|| {
            SchedulerError::InvalidArgument("cannot enqueue an absent item".into())
        })?;
        Ok(self.push(item))
    }

    /// Remove the head entry without waiting.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::EmptyQueue` if the queue has no entries.
    pub fn try_pop(&self) -> Result<T, SchedulerError> {
        self.heap
            .lock()
            .pop()
            .map(KeyedEntry::into_payload)
            .ok_or(SchedulerError::EmptyQueue)
    }

    /// Remove the head entry, blocking until one is available.
    pub fn pop(&self) -> T {
        let _waiting = WaitingGuard::enter(&self.waiting);
        let mut heap = self.heap.lock();
        loop {
            if let Some(entry) = heap.pop() {
                return entry.into_payload();
            }
            self.not_empty.wait(&mut heap);
        }
    }

    /// Remove the head entry, waiting at most `timeout` (forever when `None`).
    ///
    /// Returns `None` once the deadline has passed without an entry arriving.
    pub fn poll(&self, timeout: Option<Duration>) -> Option<T> {
        let deadline = match timeout {
            None => return Some(self.pop()),
            Some(timeout) => Instant::now().checked_add(timeout),
        };
        let _waiting = WaitingGuard::enter(&self.waiting);
        let mut heap = self.heap.lock();
        loop {
            if let Some(entry) = heap.pop() {
                return Some(entry.into_payload());
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return None;
                    }
                    // The result is ignored: the loop re-checks both the heap
                    // and the deadline, since another consumer may win the entry.
                    let _ = self.not_empty.wait_until(&mut heap, deadline);
                }
                None => self.not_empty.wait(&mut heap),
            }
        }
    }

    /// Remove the head entry once it is due.
    ///
    /// `due_at` maps an entry to the instant it becomes eligible. The caller
    /// parks until the head is due, an entry is pushed (which may be earlier),
    /// or [`wake_all`](Self::wake_all) is called; each wake re-evaluates the
    /// head and `should_stop`. Returns `None` only when `should_stop` is true.
    ///
    /// Intended for a single consumer per queue.
    pub fn pop_due<D, S>(&self, due_at: D, should_stop: S) -> Option<T>
    where
        D: Fn(&T) -> Instant,
        S: Fn() -> bool,
    {
        let _waiting = WaitingGuard::enter(&self.waiting);
        let mut heap = self.heap.lock();
        loop {
            if should_stop() {
                return None;
            }
            let next_due = heap.peek().map(|entry| due_at(entry.payload()));
            match next_due {
                None => self.not_empty.wait(&mut heap),
                Some(due) if due <= Instant::now() => {
                    return heap.pop().map(KeyedEntry::into_payload);
                }
                Some(due) => {
                    let _ = self.not_empty.wait_until(&mut heap, due);
                }
            }
        }
    }

    /// Apply `f` to the head entry, if any, under the lock.
    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.heap.lock().peek().map(|entry| f(entry.payload()))
    }

    /// Remove the first entry matching `predicate`.
    pub fn remove_first<P>(&self, mut predicate: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        let mut heap = self.heap.lock();
        if !heap.iter().any(|entry| predicate(entry.payload())) {
            return None;
        }
        let mut entries = std::mem::take(&mut *heap).into_vec();
        let removed = entries
            .iter()
            .position(|entry| predicate(entry.payload()))
            .map(|idx| entries.swap_remove(idx).into_payload());
        *heap = BinaryHeap::from(entries);
        removed
    }

    /// Atomically take every entry, in unspecified order.
    pub fn drain(&self) -> Vec<T> {
        self.heap.lock().drain().map(KeyedEntry::into_payload).collect()
    }

    /// Atomically discard every entry.
    pub fn clear(&self) {
        self.heap.lock().clear();
    }

    /// Whether the queue currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }

    /// Number of entries currently queued.
    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    /// Approximate number of callers parked in a blocking pop.
    pub fn num_waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Wake every parked caller so it re-checks its exit conditions.
    pub fn wake_all(&self) {
        let _heap = self.heap.lock();
        self.not_empty.notify_all();
    }
}

impl<T: Ord + 'static> PriorityBlockingQueue<T> {
    /// Queue popping the smallest item by `T`'s own ordering.
    #[must_use]
    pub fn min_first() -> Self {
        Self::min_by(T::cmp)
    }

    /// Queue popping the largest item by `T`'s own ordering.
    #[must_use]
    pub fn max_first() -> Self {
        Self::max_by(T::cmp)
    }
}

impl<T> fmt::Debug for PriorityBlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityBlockingQueue")
            .field("len", &self.len())
            .field("order", &self.order)
            .field("waiting", &self.num_waiting())
            .finish()
    }
}
