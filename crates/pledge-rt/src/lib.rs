// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Host runtime for `pledge` deferred values.
//!
//! The deferred core never runs anything inline; it submits tasks to a
//! [`Schedule`] and reports orphaned failures to a [`ReportUnhandled`].
//! This crate defines those seams and ships a deterministic
//! implementation of both.
//!
//! Components:
//! - task       — `Task`, `Schedule`, `Timers`
//! - queue      — FIFO ready queue
//! - timer      — virtual clock + deadline-ordered timers
//! - event_loop — single-threaded loop driving the two queues
//! - report     — unhandled-failure hook and reporters
//! - config     — loop limits

pub mod config;
pub mod error;
pub mod event_loop;
pub mod queue;
pub mod report;
pub mod task;
pub mod timer;

pub use config::EventLoopConfig;
pub use error::RuntimeError;
pub use event_loop::{EventLoop, RunStats};
pub use report::{CollectingReporter, ReportUnhandled, TracingReporter, UnhandledFailure};
pub use task::{Schedule, Task, TimerId, Timers};
