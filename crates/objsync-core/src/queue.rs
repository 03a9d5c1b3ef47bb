//! FIFO work queue shared between lanes.
//!
//! Every pop is a single check-and-remove under the lock, so two lanes can
//! never take the same item and a lane never observes a non-empty queue that
//! then turns out to be empty.

use std::collections::VecDeque;
use std::sync::Mutex;

/// FIFO of pending work items. Share it behind an `Arc`.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item at the tail.
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Remove and return the oldest item, or `None` when empty.
    pub fn pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        // A panicking lane cannot leave the deque half-updated; keep draining.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> FromIterator<T> for WorkQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}
