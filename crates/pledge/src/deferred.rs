// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The deferred value state machine.
//!
//! `Pending -> Fulfilled | Rejected`, once. Settlement and every
//! continuation run as tasks on the host scheduler, never inline in the
//! caller's frame. Continuations registered while pending are kept in
//! order and drained by the settling task; ones registered later are
//! scheduled straight away.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use pledge_rt::UnhandledFailure;

use crate::error::DeferredError;
use crate::host::Host;
use crate::resolution::{Resolution, Thenable};

/// What a settled deferred hands to its continuations.
pub type Settled<T, E> = Result<Resolution<T, E>, E>;

/// A boxed `then`-style handler. `Err` rejects the child.
pub type Handler<A, U, E> = Box<dyn FnOnce(A) -> Result<Resolution<U, E>, E>>;

/// A boxed executor, for [`Deferred::try_new`].
pub type Executor<T, E> = Box<dyn FnOnce(Fulfiller<T, E>, Rejecter<T, E>) -> Result<(), E>>;

type Continuation<T, E> = Box<dyn FnOnce(Settled<T, E>)>;

/// Process-unique id, for logs and unhandled-failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeferredId(u64);

impl DeferredId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeferredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deferred#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pending => f.write_str("pending"),
            Status::Fulfilled => f.write_str("fulfilled"),
            Status::Rejected => f.write_str("rejected"),
        }
    }
}

enum State<T, E> {
    Pending,
    Fulfilled(Resolution<T, E>),
    Rejected(E),
}

impl<T, E> State<T, E> {
    fn status(&self) -> Status {
        match self {
            State::Pending => Status::Pending,
            State::Fulfilled(_) => Status::Fulfilled,
            State::Rejected(_) => Status::Rejected,
        }
    }
}

struct Inner<T, E> {
    id: DeferredId,
    host: Host,
    state: State<T, E>,
    /// Only populated while pending.
    queue: Vec<Continuation<T, E>>,
    /// Set while a failure has not been handed to any continuation.
    unreported: Option<E>,
}

/// A value that settles at most once, asynchronously.
///
/// Cloning shares the same state.
pub struct Deferred<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Deferred")
            .field("id", &inner.id)
            .field("status", &inner.state.status())
            .finish()
    }
}

/// Fulfills the deferred it was created for. Cheap to clone.
pub struct Fulfiller<T, E> {
    target: Deferred<T, E>,
}

/// Rejects the deferred it was created for. Cheap to clone.
pub struct Rejecter<T, E> {
    target: Deferred<T, E>,
}

impl<T, E> Clone for Fulfiller<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<T, E> Clone for Rejecter<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<T, E> Fulfiller<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    pub fn fulfill(&self, value: T) {
        self.target.settle(Ok(Resolution::Value(value)));
    }

    /// Fulfill with a payload that may be a thenable. Consumers wait for
    /// the thenable rather than seeing it.
    pub fn resolve(&self, resolution: impl Into<Resolution<T, E>>) {
        self.target.settle(Ok(resolution.into()));
    }
}

impl<T, E> Rejecter<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    pub fn reject(&self, reason: E) {
        self.target.settle(Err(reason));
    }
}

impl<T, E> Deferred<T, E> {
    pub fn id(&self) -> DeferredId {
        self.inner.borrow().id
    }

    pub fn status(&self) -> Status {
        self.inner.borrow().state.status()
    }

    pub fn is_pending(&self) -> bool {
        self.status() == Status::Pending
    }

    pub fn host(&self) -> Host {
        self.inner.borrow().host.clone()
    }
}

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    /// Create a deferred and run `executor` right away with its
    /// settlement handles. An `Err` from the executor rejects it.
    ///
    /// Nothing attached later can observe the outcome before this
    /// returns: settlement is always scheduled.
    pub fn new<F>(host: &Host, executor: F) -> Self
    where
        F: FnOnce(Fulfiller<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        let deferred = Self::pending(host);
        let fulfiller = Fulfiller {
            target: deferred.clone(),
        };
        let rejecter = Rejecter {
            target: deferred.clone(),
        };
        if let Err(reason) = executor(fulfiller, rejecter.clone()) {
            tracing::trace!(deferred = %deferred.id(), "executor failed");
            rejecter.reject(reason);
        }
        deferred
    }

    /// Like [`Deferred::new`], for executors that may be absent.
    /// Fails before anything is created if there is none.
    pub fn try_new(host: &Host, executor: Option<Executor<T, E>>) -> Result<Self, DeferredError> {
        let executor =
            executor.ok_or(DeferredError::TypeConstraintViolation("executor must be callable"))?;
        Ok(Self::new(host, executor))
    }

    /// Fulfill with `resolution`. A thenable is followed, not exposed.
    pub fn resolve(host: &Host, resolution: impl Into<Resolution<T, E>>) -> Self {
        let resolution = resolution.into();
        Self::new(host, move |fulfiller, _| {
            fulfiller.resolve(resolution);
            Ok(())
        })
    }

    pub fn resolve_value(host: &Host, value: T) -> Self {
        Self::resolve(host, Resolution::Value(value))
    }

    /// Reject with `reason`, whatever it is.
    pub fn reject(host: &Host, reason: E) -> Self {
        Self::new(host, move |_, rejecter| {
            rejecter.reject(reason);
            Ok(())
        })
    }

    /// Chain a plain-value handler. Failures pass through.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, E> + 'static,
    {
        self.react(
            Box::new(move |value| on_fulfilled(value).map(Resolution::Value)),
            None,
        )
    }

    /// Chain handlers for both outcomes. A handled failure resumes the
    /// fulfilled path.
    pub fn then_or_else<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, E> + 'static,
        R: FnOnce(E) -> Result<U, E> + 'static,
    {
        self.react(
            Box::new(move |value| on_fulfilled(value).map(Resolution::Value)),
            Some(Box::new(move |reason| on_rejected(reason).map(Resolution::Value))),
        )
    }

    /// Chain a handler that may return another thenable.
    pub fn then_resolve<U, F>(&self, on_fulfilled: F) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.react(Box::new(on_fulfilled), None)
    }

    pub fn then_resolve_or_else<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
        R: FnOnce(E) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.react(Box::new(on_fulfilled), Some(Box::new(on_rejected)))
    }

    /// Chain optional handlers. A missing one passes its outcome through
    /// unchanged.
    pub fn then_opt(
        &self,
        on_fulfilled: Option<Handler<T, T, E>>,
        on_rejected: Option<Handler<E, T, E>>,
    ) -> Deferred<T, E> {
        let on_fulfilled: Handler<T, T, E> = match on_fulfilled {
            Some(handler) => handler,
            None => Box::new(pass_value::<T, E>),
        };
        self.react(on_fulfilled, on_rejected)
    }

    pub fn catch<R>(&self, on_rejected: R) -> Deferred<T, E>
    where
        R: FnOnce(E) -> Result<T, E> + 'static,
    {
        self.react(
            Box::new(pass_value::<T, E>),
            Some(Box::new(move |reason| on_rejected(reason).map(Resolution::Value))),
        )
    }

    pub fn catch_resolve<R>(&self, on_rejected: R) -> Deferred<T, E>
    where
        R: FnOnce(E) -> Result<Resolution<T, E>, E> + 'static,
    {
        self.react(Box::new(pass_value::<T, E>), Some(Box::new(on_rejected)))
    }

    /// Run `on_finally` once the outcome is known, whatever it is.
    ///
    /// The outcome passes through untouched unless `on_finally` fails,
    /// in which case the child rejects with that failure.
    pub fn finally<F>(&self, on_finally: F) -> Deferred<T, E>
    where
        F: FnOnce() -> Result<(), E> + 'static,
    {
        let slot = Rc::new(RefCell::new(Some(on_finally)));
        let other = slot.clone();
        self.react(
            Box::new(move |value| {
                run_once(&slot)?;
                Ok(Resolution::Value(value))
            }),
            Some(Box::new(move |reason| {
                run_once(&other)?;
                Err(reason)
            })),
        )
    }

    fn pending(host: &Host) -> Self {
        let id = DeferredId::next();
        tracing::trace!(deferred = %id, "created");
        Self {
            inner: Rc::new(RefCell::new(Inner {
                id,
                host: host.clone(),
                state: State::Pending,
                queue: Vec::new(),
                unreported: None,
            })),
        }
    }

    /// Build the child and hook its settlement onto ours.
    fn react<U>(
        &self,
        on_fulfilled: Handler<T, U, E>,
        on_rejected: Option<Handler<E, U, E>>,
    ) -> Deferred<U, E>
    where
        U: Clone + 'static,
    {
        let child = Deferred::pending(&self.host());
        let fulfiller = Fulfiller {
            target: child.clone(),
        };
        let rejecter = Rejecter {
            target: child.clone(),
        };

        let on_value: Box<dyn FnOnce(T)> = {
            let fulfiller = fulfiller.clone();
            let rejecter = rejecter.clone();
            Box::new(move |value| settle_with(on_fulfilled(value), &fulfiller, &rejecter))
        };
        let on_reason: Box<dyn FnOnce(E)> = Box::new(move |reason| match on_rejected {
            Some(handler) => settle_with(handler(reason), &fulfiller, &rejecter),
            None => rejecter.reject(reason),
        });
        self.subscribe(on_value, on_reason);
        child
    }

    /// Schedule a transition attempt.
    fn settle(&self, outcome: Settled<T, E>) {
        let target = self.clone();
        self.host()
            .schedule(Box::new(move || target.transition(outcome)));
    }

    fn transition(&self, outcome: Settled<T, E>) {
        let (queue, watch) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            if !matches!(inner.state, State::Pending) {
                tracing::trace!(
                    deferred = %inner.id,
                    status = %inner.state.status(),
                    "already settled, ignoring"
                );
                return;
            }
            inner.state = match &outcome {
                Ok(resolution) => State::Fulfilled(resolution.clone()),
                Err(reason) => State::Rejected(reason.clone()),
            };
            let queue = mem::take(&mut inner.queue);
            if let Err(reason) = &outcome {
                if queue.is_empty() {
                    inner.unreported = Some(reason.clone());
                }
            }
            tracing::trace!(
                deferred = %inner.id,
                status = %inner.state.status(),
                continuations = queue.len(),
                "settled"
            );
            (queue, inner.unreported.is_some())
        };

        for continuation in queue {
            continuation(outcome.clone());
        }
        if watch {
            self.schedule_unhandled_check();
        }
    }

    /// Report the failure later if nothing has picked it up by then.
    fn schedule_unhandled_check(&self) {
        let target = self.clone();
        self.host().schedule(Box::new(move || {
            let (id, host, reason) = {
                let mut inner = target.inner.borrow_mut();
                (inner.id, inner.host.clone(), inner.unreported.take())
            };
            if let Some(reason) = reason {
                tracing::debug!(deferred = %id, "unhandled failure");
                host.report_unhandled(UnhandledFailure::new(id.get(), &reason));
            }
        }));
    }

    /// Queue `continuation`, or schedule it now if already settled.
    fn enqueue(&self, continuation: Continuation<T, E>) {
        let (host, settled) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            let settled = match &inner.state {
                State::Pending => {
                    inner.queue.push(continuation);
                    return;
                }
                State::Fulfilled(resolution) => Ok(resolution.clone()),
                State::Rejected(reason) => {
                    let reason = reason.clone();
                    inner.unreported = None;
                    Err(reason)
                }
            };
            (inner.host.clone(), settled)
        };
        host.schedule(Box::new(move || continuation(settled)));
    }
}

impl<T, E> Thenable<T, E> for Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    fn subscribe(&self, on_fulfilled: Box<dyn FnOnce(T)>, on_rejected: Box<dyn FnOnce(E)>) {
        self.enqueue(Box::new(move |settled| {
            dispatch(settled, on_fulfilled, on_rejected)
        }));
    }
}

impl<T, E> From<Deferred<T, E>> for Resolution<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    fn from(deferred: Deferred<T, E>) -> Self {
        Resolution::Thenable(Rc::new(deferred))
    }
}

/// Route a settled outcome to the matching callback, following thenables
/// until a plain value or a failure turns up.
fn dispatch<T, E>(
    settled: Settled<T, E>,
    on_fulfilled: Box<dyn FnOnce(T)>,
    on_rejected: Box<dyn FnOnce(E)>,
) {
    match settled {
        Ok(Resolution::Value(value)) => on_fulfilled(value),
        Ok(Resolution::Thenable(thenable)) => thenable.subscribe(on_fulfilled, on_rejected),
        Err(reason) => on_rejected(reason),
    }
}

fn settle_with<U, E>(
    result: Result<Resolution<U, E>, E>,
    fulfiller: &Fulfiller<U, E>,
    rejecter: &Rejecter<U, E>,
) where
    U: Clone + 'static,
    E: Clone + fmt::Debug + 'static,
{
    match result {
        Ok(resolution) => fulfiller.resolve(resolution),
        Err(reason) => rejecter.reject(reason),
    }
}

fn pass_value<T, E>(value: T) -> Result<Resolution<T, E>, E> {
    Ok(Resolution::Value(value))
}

fn run_once<E, F>(slot: &RefCell<Option<F>>) -> Result<(), E>
where
    F: FnOnce() -> Result<(), E>,
{
    let f = slot.borrow_mut().take();
    f.map_or(Ok(()), |f| f())
}
