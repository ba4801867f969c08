// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Deterministic single-threaded event loop.
//!
//! One FIFO ready queue plus a virtual-time timer queue. The loop drains
//! ready tasks first; when none are left it fires the earliest timer,
//! moving the virtual clock to that timer's deadline. Tasks never run
//! while any loop state is borrowed, so they are free to schedule more.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::config::EventLoopConfig;
use crate::error::RuntimeError;
use crate::queue::TaskQueue;
use crate::task::{Schedule, Task, TimerId, Timers};
use crate::timer::{TimerQueue, VirtualClock};

/// Cloneable handle to the loop. Clones share the same queues and clock.
#[derive(Clone)]
pub struct EventLoop {
    shared: Rc<Shared>,
}

struct Shared {
    ready: TaskQueue,
    timers: RefCell<TimerQueue>,
    clock: Cell<VirtualClock>,
    config: EventLoopConfig,
}

/// What a run executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Ready tasks run.
    pub tasks: usize,
    /// Timers fired.
    pub timers: usize,
}

impl RunStats {
    pub fn total(&self) -> usize {
        self.tasks + self.timers
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    pub fn with_config(config: EventLoopConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                ready: TaskQueue::new(),
                timers: RefCell::new(TimerQueue::new()),
                clock: Cell::new(VirtualClock::new()),
                config,
            }),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.shared.clock.get().now()
    }

    pub fn pending_tasks(&self) -> usize {
        self.shared.ready.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.shared.timers.borrow().len()
    }

    /// No ready tasks and no timers.
    pub fn is_idle(&self) -> bool {
        self.shared.ready.is_empty() && self.shared.timers.borrow().is_empty()
    }

    /// Run a single ready task. Returns false if there was none.
    /// Timers are not fired and the clock does not move.
    pub fn turn(&self) -> bool {
        match self.shared.ready.pop() {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run until there is nothing left: all ready tasks, then timers in
    /// deadline order, then whatever those scheduled.
    ///
    /// On `TaskBudgetExhausted` nothing is lost: the task that would
    /// have gone over budget stays queued for the next run.
    pub fn run_until_idle(&self) -> Result<RunStats, RuntimeError> {
        let mut stats = RunStats::default();
        while self.run_ready(&mut stats)? || self.fire_next(None, &mut stats)? {}
        tracing::debug!(
            tasks = stats.tasks,
            timers = stats.timers,
            now_ms = self.now().as_millis() as u64,
            "event loop idle"
        );
        Ok(stats)
    }

    /// Run everything due within the next `by` of virtual time, then
    /// leave the clock at `now + by`. Timers further out stay pending.
    pub fn advance(&self, by: Duration) -> Result<RunStats, RuntimeError> {
        let target = self.now() + by;
        let mut stats = RunStats::default();
        while self.run_ready(&mut stats)? || self.fire_next(Some(target), &mut stats)? {}
        self.move_clock(target);
        Ok(stats)
    }

    /// Run one ready task if any, charging it against the budget first.
    fn run_ready(&self, stats: &mut RunStats) -> Result<bool, RuntimeError> {
        if self.shared.ready.is_empty() {
            return Ok(false);
        }
        self.charge(stats)?;
        let Some(task) = self.shared.ready.pop() else {
            return Ok(false);
        };
        task();
        stats.tasks += 1;
        Ok(true)
    }

    /// Fire the earliest timer if its deadline is within `limit`.
    fn fire_next(
        &self,
        limit: Option<Duration>,
        stats: &mut RunStats,
    ) -> Result<bool, RuntimeError> {
        let next = self.shared.timers.borrow().next_deadline();
        match next {
            Some(deadline) if limit.map_or(true, |limit| deadline <= limit) => {}
            _ => return Ok(false),
        }
        self.charge(stats)?;
        let popped = self.shared.timers.borrow_mut().pop_next();
        let Some((deadline, task)) = popped else {
            return Ok(false);
        };
        self.move_clock(deadline);
        tracing::trace!(deadline_ms = deadline.as_millis() as u64, "timer fired");
        task();
        stats.timers += 1;
        Ok(true)
    }

    fn charge(&self, stats: &RunStats) -> Result<(), RuntimeError> {
        let budget = self.shared.config.task_budget;
        if stats.total() >= budget {
            tracing::warn!(budget, "event loop task budget exhausted");
            return Err(RuntimeError::TaskBudgetExhausted { budget });
        }
        Ok(())
    }

    fn move_clock(&self, target: Duration) {
        let mut clock = self.shared.clock.get();
        clock.advance_to(target);
        self.shared.clock.set(clock);
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule for EventLoop {
    fn schedule(&self, task: Task) {
        self.shared.ready.push(task);
    }
}

impl Timers for EventLoop {
    fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        let deadline = self.now() + delay;
        let id = self.shared.timers.borrow_mut().insert(deadline, task);
        tracing::trace!(%id, deadline_ms = deadline.as_millis() as u64, "timer set");
        id
    }

    fn clear_timeout(&self, id: TimerId) -> bool {
        self.shared.timers.borrow_mut().cancel(id)
    }
}
