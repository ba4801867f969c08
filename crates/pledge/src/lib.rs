// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Single-settlement deferred values.
//!
//! A [`Deferred`] settles once, with a value or a failure, and runs the
//! continuations attached to it afterwards, always as scheduled work on
//! its [`Host`]. Payloads that are themselves [`Thenable`] are followed
//! rather than handed to handlers. `all` and `race` aggregate.
//!
//! Components:
//! - deferred   — state machine, settlement handles, `then`/`catch`/`finally`
//! - resolution — `Thenable` capability and `Resolution` payloads
//! - combinator — `all`, `race`
//! - delay      — timer-driven constructors
//! - host       — scheduler + unhandled-failure reporter

pub mod combinator;
pub mod deferred;
pub mod delay;
pub mod error;
pub mod host;
pub mod resolution;

pub use deferred::{Deferred, DeferredId, Executor, Fulfiller, Handler, Rejecter, Settled, Status};
pub use error::DeferredError;
pub use host::Host;
pub use resolution::{Resolution, Thenable};

pub use pledge_rt as rt;
