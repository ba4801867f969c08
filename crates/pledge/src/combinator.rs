// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Aggregates over many payloads: `all` and `race`.
//!
//! Every item is first passed through [`Deferred::resolve`], so plain
//! values and thenables go through the same scheduling path. That is
//! what lets a plain value beat a thenable that has not settled yet.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::deferred::Deferred;
use crate::host::Host;
use crate::resolution::{Resolution, Thenable};

/// Ordered result buffer for `all`.
struct Tally<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
    failed: bool,
}

impl<T> Tally<T> {
    fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
            remaining: len,
            failed: false,
        }
    }

    /// Store the value for `index`. Returns every value, in input order,
    /// once the last slot is filled.
    fn record(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        if self.failed {
            return None;
        }
        if self.slots[index].replace(value).is_none() {
            self.remaining -= 1;
        }
        if self.remaining > 0 {
            return None;
        }
        self.slots.iter_mut().map(Option::take).collect()
    }

    /// Returns true only for the first failure.
    fn fail(&mut self) -> bool {
        if self.failed || self.remaining == 0 {
            return false;
        }
        self.failed = true;
        true
    }
}

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    /// Fulfill with every item's value, in input order, or reject with
    /// the first failure to arrive. Empty input fulfills with `vec![]`.
    pub fn all(host: &Host, items: Vec<Resolution<T, E>>) -> Deferred<Vec<T>, E> {
        Deferred::<Vec<T>, E>::new(host, move |fulfiller, rejecter| {
            tracing::trace!(items = items.len(), "all");
            if items.is_empty() {
                fulfiller.fulfill(Vec::new());
                return Ok(());
            }

            let tally = Rc::new(RefCell::new(Tally::new(items.len())));
            for (index, item) in items.into_iter().enumerate() {
                let on_value: Box<dyn FnOnce(T)> = {
                    let tally = tally.clone();
                    let fulfiller = fulfiller.clone();
                    Box::new(move |value| {
                        let done = tally.borrow_mut().record(index, value);
                        if let Some(values) = done {
                            fulfiller.fulfill(values);
                        }
                    })
                };
                let on_reason: Box<dyn FnOnce(E)> = {
                    let tally = tally.clone();
                    let rejecter = rejecter.clone();
                    Box::new(move |reason| {
                        let first = tally.borrow_mut().fail();
                        if first {
                            rejecter.reject(reason);
                        }
                    })
                };
                Deferred::<T, E>::resolve(host, item).subscribe(on_value, on_reason);
            }
            Ok(())
        })
    }

    /// Settle like whichever item settles first. Empty input never
    /// settles.
    pub fn race(host: &Host, items: Vec<Resolution<T, E>>) -> Deferred<T, E> {
        Self::new(host, move |fulfiller, rejecter| {
            tracing::trace!(items = items.len(), "race");
            for item in items {
                let fulfiller = fulfiller.clone();
                let rejecter = rejecter.clone();
                Deferred::<T, E>::resolve(host, item).subscribe(
                    Box::new(move |value| fulfiller.fulfill(value)),
                    Box::new(move |reason| rejecter.reject(reason)),
                );
            }
            Ok(())
        })
    }
}
