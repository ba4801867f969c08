// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! FIFO task queue.
//!
//! Single-threaded counterpart of a global injection queue: everything
//! submitted lands at the back, the loop pops from the front.
use std::cell::RefCell;
use std::collections::VecDeque;

use crate::task::Task;

/// Ready-to-run tasks in submission order.
///
/// Interior mutability so tasks can submit more work through a shared
/// reference while the loop holds the queue.
pub struct TaskQueue {
    queue: RefCell<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
        }
    }

    pub fn push(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }

    /// Pop one task from the front.
    pub fn pop(&self) -> Option<Task> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
