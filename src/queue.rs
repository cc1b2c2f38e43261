//! Ordered FIFO queue with a "current" cursor and an optional history.
//!
//! [`Queue`] keeps three partitions: the pending elements still waiting to be
//! dequeued, the element most recently handed out by [`Queue::next`], and the
//! archive of elements that were current before it. A job uses one queue to
//! both drive its run loop and inspect the in-flight task.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Queue<T> {
    name: Option<String>,
    pending: VecDeque<T>,
    current: Option<T>,
    executed: Vec<T>,
    keep_history: bool,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<T> Queue<T> {
    /// Create an empty queue that archives superseded elements.
    pub fn new(name: Option<String>) -> Self {
        Self::with_history(name, true)
    }

    /// Create an empty queue; with `keep_history` off, superseded elements are
    /// dropped instead of archived.
    pub fn with_history(name: Option<String>, keep_history: bool) -> Self {
        Self {
            name,
            pending: VecDeque::new(),
            current: None,
            executed: Vec::new(),
            keep_history,
        }
    }

    pub fn push(&mut self, item: T) {
        self.pending.push_back(item);
    }

    /// Append every item, preserving iteration order.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        self.pending.extend(items);
    }

    /// Dequeue the next pending element and make it current.
    ///
    /// The previous current element moves to the archive (or is dropped when
    /// history is disabled). Returns `None` without touching any partition
    /// when nothing is pending.
    pub fn next(&mut self) -> Option<&mut T> {
        let next = self.pending.pop_front()?;
        if let Some(previous) = self.current.replace(next) {
            if self.keep_history {
                self.executed.push(previous);
            }
        }
        self.current.as_mut()
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut T> {
        self.current.as_mut()
    }

    /// Number of pending elements. The current and archived elements are not
    /// counted.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn executed(&self) -> &[T] {
        &self.executed
    }

    pub fn pending(&self) -> &VecDeque<T> {
        &self.pending
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn keeps_history(&self) -> bool {
        self.keep_history
    }
}
