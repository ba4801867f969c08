// SPDX-License-Identifier: (MIT OR Apache-2.0)
#![allow(dead_code)]
//! Shared helpers for the integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use pledge::rt::{CollectingReporter, EventLoop};
use pledge::{Deferred, Host};

/// A fresh virtual-time loop, a reporter that keeps every unhandled
/// failure, and a host wired to both.
pub fn fixture() -> (EventLoop, CollectingReporter, Host) {
    let rt = EventLoop::new();
    let reporter = CollectingReporter::new();
    let host = Host::new(rt.clone()).with_reporter(reporter.clone());
    (rt, reporter, host)
}

pub type Outcome<T> = Rc<RefCell<Option<Result<T, String>>>>;

/// Capture whichever way `d` settles.
pub fn observe<T: Clone + 'static>(d: &Deferred<T, String>) -> Outcome<T> {
    let out: Outcome<T> = Rc::default();
    let ok = out.clone();
    let err = out.clone();
    d.then_or_else(
        move |v| {
            *ok.borrow_mut() = Some(Ok(v));
            Ok(())
        },
        move |e| {
            *err.borrow_mut() = Some(Err(e));
            Ok(())
        },
    );
    out
}
