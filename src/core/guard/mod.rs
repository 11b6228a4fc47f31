use std::fmt;

use crate::core::queue::TrackedQueue;

/// Marks one task of a [`TrackedQueue`] as done when dropped.
///
/// Handed out next to the item by the guarded dequeue operations. Moving the
/// guard moves the obligation with it; whichever binding ends up dropping it
/// calls [`TrackedQueue::task_done`], once. Unwinding drops it too, so a
/// consumer that panics mid-task still releases anyone blocked in `join`.
#[must_use = "dropping the guard immediately marks the task as done"]
pub struct TaskDoneGuard<'q, T> {
    queue: Option<&'q TrackedQueue<T>>,
}

impl<'q, T> TaskDoneGuard<'q, T> {
    pub(crate) fn new(queue: &'q TrackedQueue<T>) -> Self {
        Self { queue: Some(queue) }
    }

    /// Whether dropping this guard will still signal completion
    pub fn is_responsible(&self) -> bool {
        self.queue.is_some()
    }

    /// Mark the task done now instead of at the end of scope
    pub fn finish(mut self) {
        self.signal();
    }

    fn signal(&mut self) {
        // take() leaves the guard inert, so the signal fires at most once
        if let Some(queue) = self.queue.take() {
            queue.task_done();
        }
    }
}

impl<T> Drop for TaskDoneGuard<'_, T> {
    fn drop(&mut self) {
        self.signal();
    }
}

impl<T> fmt::Debug for TaskDoneGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDoneGuard")
            .field("responsible", &self.is_responsible())
            .finish()
    }
}
