// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The collaborators a deferred value runs against.

use std::fmt;
use std::rc::Rc;

use pledge_rt::{ReportUnhandled, Schedule, Task, TracingReporter, UnhandledFailure};

/// Scheduler + unhandled-failure reporter.
///
/// Every deferred value carries one; children created by chaining share
/// their parent's. Cloning is cheap.
#[derive(Clone)]
pub struct Host {
    scheduler: Rc<dyn Schedule>,
    reporter: Rc<dyn ReportUnhandled>,
}

impl Host {
    /// Host reporting unhandled failures through `tracing`.
    pub fn new(scheduler: impl Schedule + 'static) -> Self {
        Self {
            scheduler: Rc::new(scheduler),
            reporter: Rc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: impl ReportUnhandled + 'static) -> Self {
        self.reporter = Rc::new(reporter);
        self
    }

    pub fn schedule(&self, task: Task) {
        self.scheduler.schedule(task);
    }

    pub fn report_unhandled(&self, failure: UnhandledFailure) {
        self.reporter.report_unhandled(failure);
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
