// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Unhandled-failure reporting.
//!
//! A failure that reaches the end of a chain without being consumed is
//! handed to a [`ReportUnhandled`] once. Reports are advisory.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A failure nobody consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledFailure {
    /// Id of the deferred value that settled with the failure.
    pub deferred_id: u64,
    /// `Debug` rendering of the failure reason.
    pub reason: String,
}

impl UnhandledFailure {
    pub fn new(deferred_id: u64, reason: &dyn fmt::Debug) -> Self {
        Self {
            deferred_id,
            reason: format!("{:?}", reason),
        }
    }
}

impl fmt::Display for UnhandledFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uncaught (in deferred#{}) {}", self.deferred_id, self.reason)
    }
}

pub trait ReportUnhandled {
    fn report_unhandled(&self, failure: UnhandledFailure);
}

impl<R: ReportUnhandled + ?Sized> ReportUnhandled for Rc<R> {
    fn report_unhandled(&self, failure: UnhandledFailure) {
        (**self).report_unhandled(failure)
    }
}

/// Logs each report at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ReportUnhandled for TracingReporter {
    fn report_unhandled(&self, failure: UnhandledFailure) {
        tracing::error!(
            deferred = failure.deferred_id,
            reason = %failure.reason,
            "uncaught (in deferred)"
        );
    }
}

/// Keeps every report, in order. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    reports: Rc<RefCell<Vec<UnhandledFailure>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<UnhandledFailure> {
        self.reports.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }

    /// Take the reports collected so far, leaving the log empty.
    pub fn take(&self) -> Vec<UnhandledFailure> {
        std::mem::take(&mut *self.reports.borrow_mut())
    }
}

impl ReportUnhandled for CollectingReporter {
    fn report_unhandled(&self, failure: UnhandledFailure) {
        self.reports.borrow_mut().push(failure);
    }
}
