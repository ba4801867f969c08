// SPDX-License-Identifier: (MIT OR Apache-2.0)

/// Event loop limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLoopConfig {
    /// Max tasks (ready tasks plus fired timers) a single
    /// `run_until_idle` or `advance` call may execute before giving up.
    pub task_budget: usize,
}

impl EventLoopConfig {
    pub fn with_task_budget(mut self, task_budget: usize) -> Self {
        self.task_budget = task_budget;
        self
    }
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            task_budget: 1_000_000,
        }
    }
}
