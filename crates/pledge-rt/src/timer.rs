// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Virtual-time timers.
//!
//! No wall clock anywhere: time only moves when the event loop fires a
//! timer or is told to advance. Ordering is (deadline, registration seq).

use std::collections::BTreeMap;
use std::time::Duration;

use crate::task::{Task, TimerId};

/// Monotonic virtual clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualClock {
    now: Duration,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Move the clock forward to `target`. Earlier targets are ignored.
    pub fn advance_to(&mut self, target: Duration) {
        if target > self.now {
            self.now = target;
        }
    }
}

/// Pending timers keyed by deadline, then by the order they were set.
pub struct TimerQueue {
    timers: BTreeMap<(Duration, u64), Task>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Register `task` to fire at `deadline`.
    pub fn insert(&mut self, deadline: Duration, task: Task) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert((deadline, seq), task);
        TimerId(seq)
    }

    /// Remove a timer before it fires.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.timers.keys().find(|(_, seq)| *seq == id.0).copied();
        match key {
            Some(key) => self.timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest timer if its deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, Task)> {
        let (&(deadline, seq), _) = self.timers.iter().next()?;
        if deadline > now {
            return None;
        }
        self.timers
            .remove(&(deadline, seq))
            .map(|task| (deadline, task))
    }

    /// Pop the earliest timer regardless of deadline.
    pub fn pop_next(&mut self) -> Option<(Duration, Task)> {
        let (deadline, _) = *self.timers.keys().next()?;
        self.pop_due(deadline)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}
