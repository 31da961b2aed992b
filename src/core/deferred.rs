//! # Deferred
//!
//! A single-threaded, cancellable, single-resolution result.
//!
//! ```text
//!             resolve(v)
//!           ┌──────────────► Resolved(v)
//!  Pending ─┼──────────────► Rejected(err)     reject(err)
//!           └──────────────► Cancelled(err)    cancel() / cancel_with(err)
//! ```
//!
//! Exactly one terminal state is ever reached; later attempts to settle are
//! ignored and return `false`. Callbacks run synchronously on the thread
//! that settles the deferred, in registration order. Cancel handlers run
//! before the failure callbacks so that whatever the deferred was waiting on
//! (a timer, a request) is released first.
//!
//! Callbacks registered on an already-settled deferred run immediately.
//! No `RefCell` borrow is held while user code runs, so callbacks may freely
//! register more callbacks or settle other deferreds.
//!
//! A `Deferred` is also a [`Future`], which is how async code (the binary,
//! the HTTP helper tests) waits on one.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use super::error::NavError;

/// Observable state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    Pending,
    Resolved,
    Rejected,
    Cancelled,
}

enum Outcome<T> {
    Pending,
    Resolved(T),
    Rejected(NavError),
    Cancelled(NavError),
}

type SettleCallback<T> = Box<dyn FnOnce(Result<&T, &NavError>)>;
type CancelHandler = Box<dyn FnOnce(&NavError)>;

struct Inner<T> {
    outcome: Outcome<T>,
    callbacks: Vec<SettleCallback<T>>,
    cancel_handlers: Vec<CancelHandler>,
    wakers: Vec<Waker>,
}

impl<T: Clone> Inner<T> {
    fn result(&self) -> Option<Result<T, NavError>> {
        match &self.outcome {
            Outcome::Pending => None,
            Outcome::Resolved(value) => Some(Ok(value.clone())),
            Outcome::Rejected(err) | Outcome::Cancelled(err) => Some(Err(err.clone())),
        }
    }
}

pub struct Deferred<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.borrow().outcome {
            Outcome::Pending => DeferredState::Pending,
            Outcome::Resolved(_) => DeferredState::Resolved,
            Outcome::Rejected(_) => DeferredState::Rejected,
            Outcome::Cancelled(_) => DeferredState::Cancelled,
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

impl<T: Clone + 'static> Deferred<T> {
    /// A new pending deferred.
    pub fn new() -> Self {
        Self::with_outcome(Outcome::Pending)
    }

    pub fn resolved(value: T) -> Self {
        Self::with_outcome(Outcome::Resolved(value))
    }

    pub fn rejected(err: NavError) -> Self {
        Self::with_outcome(Outcome::Rejected(err))
    }

    pub fn cancelled(err: NavError) -> Self {
        Self::with_outcome(Outcome::Cancelled(err))
    }

    fn with_outcome(outcome: Outcome<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                outcome,
                callbacks: Vec::new(),
                cancel_handlers: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    // ------------------------------------------------------------------------
    // Settling
    // ------------------------------------------------------------------------

    /// Resolves with `value`. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Outcome::Resolved(value))
    }

    /// Rejects with `err`. Returns `false` if already settled.
    pub fn reject(&self, err: NavError) -> bool {
        self.settle(Outcome::Rejected(err))
    }

    /// Cancels with [`NavError::Cancelled`].
    pub fn cancel(&self) -> bool {
        self.cancel_with(NavError::Cancelled)
    }

    /// Cancels with a specific reason. Cancel handlers see the same error.
    pub fn cancel_with(&self, err: NavError) -> bool {
        self.settle(Outcome::Cancelled(err))
    }

    fn settle(&self, outcome: Outcome<T>) -> bool {
        let (result, cancel_handlers, callbacks, wakers) = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.outcome, Outcome::Pending) {
                return false;
            }
            let cancelled = matches!(outcome, Outcome::Cancelled(_));
            inner.outcome = outcome;
            let Some(result) = inner.result() else {
                return false;
            };
            let handlers = mem::take(&mut inner.cancel_handlers);
            let cancel_handlers = if cancelled { handlers } else { Vec::new() };
            (
                result,
                cancel_handlers,
                mem::take(&mut inner.callbacks),
                mem::take(&mut inner.wakers),
            )
        };

        if let Err(err) = &result {
            for handler in cancel_handlers {
                handler(err);
            }
        }
        for callback in callbacks {
            callback(result.as_ref());
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    // ------------------------------------------------------------------------
    // Observing
    // ------------------------------------------------------------------------

    pub fn state(&self) -> DeferredState {
        match self.inner.borrow().outcome {
            Outcome::Pending => DeferredState::Pending,
            Outcome::Resolved(_) => DeferredState::Resolved,
            Outcome::Rejected(_) => DeferredState::Rejected,
            Outcome::Cancelled(_) => DeferredState::Cancelled,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == DeferredState::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.state() == DeferredState::Resolved
    }

    /// Rejected or cancelled.
    pub fn is_failed(&self) -> bool {
        matches!(
            self.state(),
            DeferredState::Rejected | DeferredState::Cancelled
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == DeferredState::Cancelled
    }

    pub fn value(&self) -> Option<T> {
        self.inner.borrow().result().and_then(Result::ok)
    }

    pub fn error(&self) -> Option<NavError> {
        self.inner.borrow().result().and_then(Result::err)
    }

    /// Same underlying deferred (not merely equal state).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs `callback` once the deferred settles, or right away if it has.
    pub fn on_settled<F>(&self, callback: F)
    where
        F: FnOnce(Result<&T, &NavError>) + 'static,
    {
        let result = {
            let mut inner = self.inner.borrow_mut();
            match inner.result() {
                Some(result) => result,
                None => {
                    inner.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(result.as_ref());
    }

    pub fn on_success<F>(&self, callback: F)
    where
        F: FnOnce(&T) + 'static,
    {
        self.on_settled(move |result| {
            if let Ok(value) = result {
                callback(value);
            }
        });
    }

    /// Runs on rejection and on cancellation.
    pub fn on_failure<F>(&self, callback: F)
    where
        F: FnOnce(&NavError) + 'static,
    {
        self.on_settled(move |result| {
            if let Err(err) = result {
                callback(err);
            }
        });
    }

    /// Registers a handler that runs synchronously when the deferred is
    /// cancelled. Runs immediately if it already was; dropped unused if the
    /// deferred resolves or is rejected instead.
    pub fn on_cancel<F>(&self, handler: F)
    where
        F: FnOnce(&NavError) + 'static,
    {
        let err = {
            let mut inner = self.inner.borrow_mut();
            match &inner.outcome {
                Outcome::Pending => {
                    inner.cancel_handlers.push(Box::new(handler));
                    return;
                }
                Outcome::Cancelled(err) => err.clone(),
                Outcome::Resolved(_) | Outcome::Rejected(_) => return,
            }
        };
        handler(&err);
    }

    // ------------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------------

    /// Settles `target` the same way this deferred settles.
    pub fn forward_to(&self, target: &Deferred<T>) {
        let target = target.clone();
        let cancelled = self.clone();
        self.on_settled(move |result| match result {
            Ok(value) => {
                target.resolve(value.clone());
            }
            Err(err) if cancelled.is_cancelled() => {
                target.cancel_with(err.clone());
            }
            Err(err) => {
                target.reject(err.clone());
            }
        });
    }

    /// A deferred for `f(value)`. Cancelling the result cancels `self`.
    pub fn map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(&T) -> U + 'static,
    {
        let mapped = Deferred::new();
        let source = self.clone();
        mapped.on_cancel(move |err| {
            source.cancel_with(err.clone());
        });

        let target = mapped.clone();
        let cancelled = self.clone();
        self.on_settled(move |result| match result {
            Ok(value) => {
                target.resolve(f(value));
            }
            Err(err) if cancelled.is_cancelled() => {
                target.cancel_with(err.clone());
            }
            Err(err) => {
                target.reject(err.clone());
            }
        });
        mapped
    }

    /// Waits for `self`, then for the deferred `f` returns. Cancelling the
    /// result cancels whichever of the two is still pending.
    pub fn and_then<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(&T) -> Deferred<U> + 'static,
    {
        let chained = Deferred::new();
        let next: Rc<RefCell<Option<Deferred<U>>>> = Rc::new(RefCell::new(None));

        let source = self.clone();
        let slot = Rc::clone(&next);
        chained.on_cancel(move |err| {
            source.cancel_with(err.clone());
            let current = slot.borrow_mut().take();
            if let Some(inner) = current {
                inner.cancel_with(err.clone());
            }
        });

        let target = chained.clone();
        let cancelled = self.clone();
        self.on_settled(move |result| match result {
            Ok(value) => {
                let inner = f(value);
                *next.borrow_mut() = Some(inner.clone());
                inner.forward_to(&target);
            }
            Err(err) if cancelled.is_cancelled() => {
                target.cancel_with(err.clone());
            }
            Err(err) => {
                target.reject(err.clone());
            }
        });
        chained
    }
}

/// Resolves once every member resolves. The first failure rejects (or
/// cancels) the join. Cancelling the join cancels every member that is
/// still pending. Completion order of the members does not matter.
pub fn join_all<T: Clone + 'static>(members: Vec<Deferred<T>>) -> Deferred<()> {
    let joined = Deferred::new();
    if members.is_empty() {
        joined.resolve(());
        return joined;
    }

    let to_cancel = members.clone();
    joined.on_cancel(move |err| {
        for member in &to_cancel {
            member.cancel_with(err.clone());
        }
    });

    let remaining = Rc::new(Cell::new(members.len()));
    for member in members {
        let target = joined.clone();
        let remaining = Rc::clone(&remaining);
        let cancelled = member.clone();
        member.on_settled(move |result| match result {
            Ok(_) => {
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    target.resolve(());
                }
            }
            Err(err) if cancelled.is_cancelled() => {
                target.cancel_with(err.clone());
            }
            Err(err) => {
                target.reject(err.clone());
            }
        });
    }
    joined
}

impl<T: Clone + 'static> Future for Deferred<T> {
    type Output = Result<T, NavError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.inner.borrow_mut();
        match inner.result() {
            Some(result) => Poll::Ready(result),
            None => {
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
