use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, trace};

use crate::core::error::TimeoutError;
use crate::core::guard::TaskDoneGuard;
use crate::core::stats::QueueStats;

/// Buffer and counters, always touched together under one lock
struct State<T> {
    items: VecDeque<T>,
    unfinished_tasks: usize,
    enqueued_total: u64,
    completed_total: u64,
}

/// Blocking FIFO queue that also tracks how many enqueued items are still
/// being worked on.
///
/// Every [`push`](Self::push) counts as one unfinished task. Dequeuing does
/// not finish it: a consumer marks it done with [`task_done`](Self::task_done),
/// or by letting the [`TaskDoneGuard`] from [`pop_with_guard`](Self::pop_with_guard)
/// go out of scope. [`join`](Self::join) blocks until the count is back to zero.
///
/// ```
/// use std::thread;
/// use tracked_queue::TrackedQueue;
///
/// let queue = TrackedQueue::new();
/// thread::scope(|s| {
///     s.spawn(|| {
///         for _ in 0..3 {
///             let (item, _done) = queue.pop_with_guard();
///             assert!(item < 3);
///         }
///     });
///     for i in 0..3 {
///         queue.push(i);
///     }
///     queue.join();
/// });
/// ```
///
/// The queue must be drained when it is dropped. Dropping it with unfinished
/// tasks is a bug in the caller and panics.
pub struct TrackedQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    all_tasks_done: Condvar,
}

impl<T> TrackedQueue<T> {
    /// Create a new, empty queue
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                unfinished_tasks: 0,
                enqueued_total: 0,
                completed_total: 0,
            }),
            not_empty: Condvar::new(),
            all_tasks_done: Condvar::new(),
        }
    }

    // No caller code runs and no panic happens while the lock is held, so
    // poisoned state is still consistent.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue_locked(state: &mut State<T>, item: T) {
        state.items.push_back(item);
        state.unfinished_tasks += 1;
        state.enqueued_total += 1;
    }

    /// Enqueue an item and wake one waiting consumer
    pub fn push(&self, item: T) {
        {
            let mut state = self.lock();
            Self::enqueue_locked(&mut state, item);
            trace!(unfinished = state.unfinished_tasks, "pushed item");
        }
        self.not_empty.notify_one();
    }

    /// Enqueue every item of `items` under a single lock acquisition.
    ///
    /// Consumers see the batch contiguously and in iteration order. The
    /// iterator is drained before the lock is taken, so it may call back into
    /// the queue, and a panic inside it enqueues nothing.
    pub fn extend<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let batch: Vec<T> = items.into_iter().collect();
        let added = batch.len();
        {
            let mut state = self.lock();
            for item in batch {
                Self::enqueue_locked(&mut state, item);
            }
        }
        for _ in 0..added {
            self.not_empty.notify_one();
        }
    }

    /// Enqueue an item, then block until every task in the queue is done.
    ///
    /// This waits for the whole queue to drain, not just for `item`.
    pub fn push_and_join(&self, item: T) {
        let mut state = self.lock();
        Self::enqueue_locked(&mut state, item);
        self.not_empty.notify_one();
        let _drained = self
            .all_tasks_done
            .wait_while(state, |s| s.unfinished_tasks > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until an item is available and remove it.
    ///
    /// The caller still owes a [`task_done`](Self::task_done) for it.
    pub fn pop(&self) -> T {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return item;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`pop`](Self::pop) but the returned guard calls `task_done` when dropped
    pub fn pop_with_guard(&self) -> (T, TaskDoneGuard<'_, T>) {
        (self.pop(), TaskDoneGuard::new(self))
    }

    /// Block for at most `timeout` waiting for an item.
    ///
    /// On expiry nothing is removed and [`TimeoutError`] is returned.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<T, TimeoutError> {
        let (mut state, _) = self
            .not_empty
            .wait_timeout_while(self.lock(), timeout, |s| s.items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        match state.items.pop_front() {
            Some(item) => Ok(item),
            None => {
                debug!(?timeout, "pop timed out");
                Err(TimeoutError)
            }
        }
    }

    /// Like [`pop_timeout`](Self::pop_timeout) but the returned guard calls `task_done` when dropped
    pub fn pop_with_guard_timeout(
        &self,
        timeout: Duration,
    ) -> Result<(T, TaskDoneGuard<'_, T>), TimeoutError> {
        let item = self.pop_timeout(timeout)?;
        Ok((item, TaskDoneGuard::new(self)))
    }

    /// Remove the front item if there is one, without blocking
    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Like [`try_pop`](Self::try_pop) but the returned guard calls `task_done` when dropped
    pub fn try_pop_with_guard(&self) -> Option<(T, TaskDoneGuard<'_, T>)> {
        let item = self.try_pop()?;
        Some((item, TaskDoneGuard::new(self)))
    }

    /// Mark one previously enqueued task as finished.
    ///
    /// # Panics
    ///
    /// Panics if called more times than items were pushed.
    pub fn task_done(&self) {
        let mut state = self.lock();
        if state.unfinished_tasks == 0 {
            drop(state);
            error!("task_done() called with no unfinished tasks");
            panic!("task_done() called too many times");
        }
        state.unfinished_tasks -= 1;
        state.completed_total += 1;
        if state.unfinished_tasks == 0 {
            trace!("all tasks done");
            self.all_tasks_done.notify_all();
        }
    }

    /// Block until every enqueued item has been marked done
    pub fn join(&self) {
        let _drained = self
            .all_tasks_done
            .wait_while(self.lock(), |s| s.unfinished_tasks > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Number of items currently buffered
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Items pushed but not yet marked done, including ones already dequeued
    pub fn unfinished_tasks(&self) -> usize {
        self.lock().unfinished_tasks
    }

    /// Consistent snapshot of the buffer and counters
    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            buffered: state.items.len(),
            unfinished_tasks: state.unfinished_tasks,
            enqueued_total: state.enqueued_total,
            completed_total: state.completed_total,
        }
    }
}

impl<T> Default for TrackedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TrackedQueue<T> {
    // Dropping needs exclusive access, so nobody is left to finish outstanding
    // tasks; blocking here would never return.
    fn drop(&mut self) {
        let unfinished = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .unfinished_tasks;
        if unfinished != 0 && !thread::panicking() {
            error!(unfinished, "queue dropped with unfinished tasks");
            panic!("TrackedQueue dropped with {unfinished} unfinished task(s)");
        }
    }
}
