// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Failure paths: rejection inside the executor, from a timer, raised by
//! a handler, and carried by a thenable.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::fixture;
use pledge::rt::Timers;
use pledge::{Deferred, Resolution, Status};

type Log = Rc<RefCell<Vec<i32>>>;

/// Records the failure and recovers with `next`.
fn recover(log: &Log, next: i32) -> impl FnOnce(i32) -> Result<i32, i32> {
    let log = log.clone();
    move |e| {
        log.borrow_mut().push(e);
        Ok(next)
    }
}

/// Records the failure and fails again with `next`.
fn rethrow(log: &Log, next: i32) -> impl FnOnce(i32) -> Result<i32, i32> {
    let log = log.clone();
    move |e| {
        log.borrow_mut().push(e);
        Err(next)
    }
}

fn no_value(v: i32) -> Result<i32, i32> {
    panic!("fulfillment handler should not run, got {}", v)
}

#[test]
fn rejection_in_synchronous_executor() {
    let (rt, reporter, host) = fixture();
    let log = Log::default();
    Deferred::<i32, i32>::new(&host, |_, reject| {
        reject.reject(1);
        Ok(())
    })
    .then_or_else(no_value, rethrow(&log, 2))
    .then_or_else(no_value, rethrow(&log, 3))
    .catch(recover(&log, 0));
    rt.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec![1, 2, 3]);
    assert!(reporter.is_empty());
}

#[test]
fn rejection_from_a_timer() {
    let (rt, reporter, host) = fixture();
    let log = Log::default();
    Deferred::<i32, i32>::new(&host, |_, reject| {
        rt.set_timeout(Duration::from_millis(10), Box::new(move || reject.reject(1)));
        Ok(())
    })
    .catch(rethrow(&log, 2))
    .catch(rethrow(&log, 3))
    .catch(recover(&log, 0));
    rt.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec![1, 2, 3]);
    assert_eq!(rt.now(), Duration::from_millis(10));
    assert!(reporter.is_empty());
}

#[test]
fn handler_failure_rejects_the_child() {
    let (rt, _, host) = fixture();
    let log = Log::default();
    let child = Deferred::<i32, i32>::resolve_value(&host, 5).then(|v| Err::<i32, i32>(v * 10));
    child.catch(recover(&log, 0));
    rt.run_until_idle().unwrap();
    assert_eq!(child.status(), Status::Rejected);
    assert_eq!(*log.borrow(), vec![50]);
}

#[test]
fn failure_skips_fulfillment_handlers_until_caught() {
    let (rt, _, host) = fixture();
    let log = Log::default();
    let l = log.clone();
    Deferred::<i32, i32>::reject(&host, 7)
        .then(no_value)
        .then(no_value)
        .catch(recover(&log, 8))
        .then(move |v| {
            l.borrow_mut().push(v);
            Ok(())
        });
    rt.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec![7, 8]);
}

#[test]
fn rejecting_thenables_from_handlers() {
    let (rt, reporter, host) = fixture();
    let log = Log::default();
    let h1 = host.clone();
    let h2 = host.clone();
    let l1 = log.clone();
    let l2 = log.clone();
    Deferred::<i32, i32>::reject(&host, 1)
        .then_resolve_or_else(
            |v| panic!("fulfilled with {}", v),
            move |e| {
                l1.borrow_mut().push(e);
                Ok(Resolution::from(Deferred::<i32, i32>::reject(&h1, 2)))
            },
        )
        .catch_resolve(move |e| {
            l2.borrow_mut().push(e);
            Ok(Resolution::from(Deferred::<i32, i32>::reject(&h2, 3)))
        })
        .catch(recover(&log, 0));
    rt.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec![1, 2, 3]);
    // Each inner rejection is consumed by the chain that follows it.
    assert!(reporter.is_empty());
}

#[test]
fn rejecting_thenables_settled_from_timers() {
    let (rt, reporter, host) = fixture();
    let log = Log::default();
    let later = {
        let rt = rt.clone();
        let host = host.clone();
        move |reason: i32| -> Result<Resolution<i32, i32>, i32> {
            Ok(Resolution::from(Deferred::<i32, i32>::new(&host, |_, reject| {
                rt.set_timeout(Duration::from_millis(5), Box::new(move || reject.reject(reason)));
                Ok(())
            })))
        }
    };
    let l = log.clone();
    Deferred::<i32, i32>::new(&host, |_, reject| {
        rt.set_timeout(Duration::ZERO, Box::new(move || reject.reject(1)));
        Ok(())
    })
    .catch_resolve(move |e| {
        l.borrow_mut().push(e);
        later(2)
    })
    .catch(rethrow(&log, 3))
    .catch(recover(&log, 0));
    rt.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec![1, 2, 3]);
    assert_eq!(rt.now(), Duration::from_millis(5));
    assert!(reporter.is_empty());
}

#[test]
fn rejection_reason_can_be_a_thenable() {
    let (rt, _, host) = fixture();
    let reason = Deferred::<i32, String>::resolve_value(&host, 4);
    let failed = Deferred::<i32, Deferred<i32, String>>::reject(&host, reason.clone());
    let seen = Rc::new(RefCell::new(None));
    let s = seen.clone();
    failed.catch(move |e| {
        *s.borrow_mut() = Some(e);
        Ok(0)
    });
    rt.run_until_idle().unwrap();
    let got = seen.borrow_mut().take().expect("catch handler ran");
    assert_eq!(got.id(), reason.id());
}
