// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Thenables and fulfillment payloads.
//!
//! A fulfillment payload is either a plain value or something
//! promise-shaped. Promise-shaped payloads are never handed to user
//! handlers as-is; consumers subscribe to them and receive whatever they
//! eventually settle with, recursively.

use std::fmt;
use std::rc::Rc;

/// Anything that eventually settles with a `T` or an `E`.
///
/// Implementors must call at most one of the two callbacks, at most once.
pub trait Thenable<T, E> {
    fn subscribe(&self, on_fulfilled: Box<dyn FnOnce(T)>, on_rejected: Box<dyn FnOnce(E)>);
}

/// A fulfillment payload.
pub enum Resolution<T, E> {
    Value(T),
    Thenable(Rc<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    pub fn value(value: T) -> Self {
        Resolution::Value(value)
    }

    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Resolution::Thenable(Rc::new(thenable))
    }

    /// True if consumers have to wait on this payload rather than use it.
    pub fn is_thenable(&self) -> bool {
        matches!(self, Resolution::Thenable(_))
    }
}

impl<T: Clone, E> Clone for Resolution<T, E> {
    fn clone(&self) -> Self {
        match self {
            Resolution::Value(value) => Resolution::Value(value.clone()),
            Resolution::Thenable(thenable) => Resolution::Thenable(thenable.clone()),
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolution::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}
