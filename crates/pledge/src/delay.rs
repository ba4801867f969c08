// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Deferred values settled by a timer.

use std::fmt;
use std::time::Duration;

use pledge_rt::Timers;

use crate::deferred::Deferred;
use crate::host::Host;

/// Fulfill with `value` once `delay` has elapsed on `timers`.
pub fn resolve_after<T, E>(
    host: &Host,
    timers: &impl Timers,
    delay: Duration,
    value: T,
) -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    Deferred::new(host, |fulfiller, _| {
        timers.set_timeout(delay, Box::new(move || fulfiller.fulfill(value)));
        Ok(())
    })
}

/// Reject with `reason` once `delay` has elapsed on `timers`.
pub fn reject_after<T, E>(
    host: &Host,
    timers: &impl Timers,
    delay: Duration,
    reason: E,
) -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    Deferred::new(host, |_, rejecter| {
        timers.set_timeout(delay, Box::new(move || rejecter.reject(reason)));
        Ok(())
    })
}
