// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Units of deferred work and the traits hosts implement to run them.
//!
//! Everything the deferred core does asynchronously goes through
//! [`Schedule`]. Timer-driven settlement goes through [`Timers`].

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// A zero-argument callback submitted to run later.
pub type Task = Box<dyn FnOnce()>;

/// Submit work to run after the current unit of work returns.
///
/// Implementations must preserve submission order for tasks submitted
/// through the same handle. Nothing else is assumed: no priorities, no
/// fairness between submitters.
pub trait Schedule {
    fn schedule(&self, task: Task);
}

/// Identifier handed out by [`Timers::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Delayed submission. Timers with the same deadline fire in the order
/// they were set.
pub trait Timers: Schedule {
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancel a timer that has not fired yet. Returns false if it already
    /// fired or was never set.
    fn clear_timeout(&self, id: TimerId) -> bool;
}

impl<S: Schedule + ?Sized> Schedule for Rc<S> {
    fn schedule(&self, task: Task) {
        (**self).schedule(task)
    }
}

impl<S: Timers + ?Sized> Timers for Rc<S> {
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        (**self).set_timeout(delay, task)
    }

    fn clear_timeout(&self, id: TimerId) -> bool {
        (**self).clear_timeout(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Runs nothing; just records how many tasks it was handed.
    struct Counting(RefCell<Vec<Task>>);

    impl Schedule for Counting {
        fn schedule(&self, task: Task) {
            self.0.borrow_mut().push(task);
        }
    }

    #[test]
    fn rc_forwards_to_inner_scheduler() {
        let inner = Rc::new(Counting(RefCell::new(Vec::new())));
        let shared: Rc<Counting> = inner.clone();
        shared.schedule(Box::new(|| {}));
        shared.schedule(Box::new(|| {}));
        assert_eq!(inner.0.borrow().len(), 2);
    }

    #[test]
    fn timer_id_display() {
        assert_eq!(TimerId(7).to_string(), "timer#7");
    }
}
