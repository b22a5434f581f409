//! A single-threaded promise: a value that is either pending or settled, with
//! an ordered list of reactions waiting on it.
//!
//! Reactions never run inline. Settling a promise (or subscribing to one that
//! has already settled) queues each reaction on the promise's [`TaskQueue`],
//! so continuations and `.await` resumptions interleave in exactly the order
//! they were queued.

use core::{
    cell::RefCell,
    future::{Future, IntoFuture},
    pin::Pin,
    task::{Context, Poll, Waker},
};
use std::{fmt, mem, rc::Rc};

use tracing::trace;

use crate::{error::Rejected, queue::TaskQueue};

/// The outcome of a settled promise.
pub type Settled<T> = Result<T, Rejected>;

enum Reaction<T> {
    Callback(Box<dyn FnOnce(Settled<T>)>),
    Resume(Rc<RefCell<Waker>>),
}

enum State<T> {
    Pending(Vec<Reaction<T>>),
    Settled(Settled<T>),
}

struct Shared<T> {
    id: u64,
    queue: TaskQueue,
    state: RefCell<State<T>>,
}

pub struct Promise<T> {
    shared: Rc<Shared<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.state.borrow() {
            State::Pending(_) => "pending",
            State::Settled(Ok(_)) => "fulfilled",
            State::Settled(Err(_)) => "rejected",
        };
        f.debug_struct("Promise")
            .field("id", &self.shared.id)
            .field("state", &state)
            .finish()
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Returns a pending promise together with the resolver that settles it.
    pub fn pending(queue: &TaskQueue) -> (Self, Resolver<T>) {
        let promise = Self::with_state(queue, State::Pending(Vec::new()));
        let resolver = Resolver {
            promise: promise.clone(),
        };
        (promise, resolver)
    }

    pub(crate) fn settled(queue: &TaskQueue, outcome: Settled<T>) -> Self {
        let promise = Self::with_state(queue, State::Pending(Vec::new()));
        promise.settle(outcome);
        promise
    }

    fn with_state(queue: &TaskQueue, state: State<T>) -> Self {
        Promise {
            shared: Rc::new(Shared {
                id: queue.next_id(),
                queue: queue.clone(),
                state: RefCell::new(state),
            }),
        }
    }

    /// The queue this promise schedules its reactions on.
    pub fn queue(&self) -> &TaskQueue {
        &self.shared.queue
    }

    /// The current outcome, if the promise has settled. Does not count as
    /// handling a rejection.
    pub fn peek(&self) -> Option<Settled<T>> {
        match &*self.shared.state.borrow() {
            State::Pending(_) => None,
            State::Settled(outcome) => Some(outcome.clone()),
        }
    }

    /// Maps the fulfilled value through `f`. A rejection skips `f` and
    /// rejects the returned promise with the same reason.
    pub fn then<U, F>(&self, f: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        self.chain(move |outcome, resolver| resolver.settle(outcome.map(f)))
    }

    /// Like [`then`](Self::then), but `f` returns a promise whose outcome the
    /// returned promise adopts.
    pub fn and_then<U, F>(&self, f: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Promise<U> + 'static,
    {
        self.chain(move |outcome, resolver| match outcome {
            Ok(value) => f(value).subscribe(Reaction::Callback(Box::new(move |inner| {
                resolver.settle(inner)
            }))),
            Err(rejected) => resolver.settle(Err(rejected)),
        })
    }

    /// Recovers a rejection into a value. A fulfilled value passes through
    /// untouched.
    pub fn catch<F>(&self, f: F) -> Promise<T>
    where
        F: FnOnce(Rejected) -> T + 'static,
    {
        self.chain(move |outcome, resolver| resolver.fulfill(outcome.unwrap_or_else(f)))
    }

    fn chain<U, F>(&self, f: F) -> Promise<U>
    where
        U: Clone + 'static,
        F: FnOnce(Settled<T>, Resolver<U>) + 'static,
    {
        let (derived, resolver) = Promise::pending(&self.shared.queue);
        self.subscribe(Reaction::Callback(Box::new(move |outcome| {
            f(outcome, resolver)
        })));
        derived
    }

    fn subscribe(&self, reaction: Reaction<T>) {
        let settled = match &mut *self.shared.state.borrow_mut() {
            State::Pending(reactions) => {
                reactions.push(reaction);
                return;
            }
            State::Settled(outcome) => outcome.clone(),
        };
        if settled.is_err() {
            self.shared.queue.mark_handled(self.shared.id);
        }
        self.dispatch(reaction, settled);
    }

    fn settle(&self, outcome: Settled<T>) {
        let reactions = {
            let mut state = self.shared.state.borrow_mut();
            match &mut *state {
                State::Pending(reactions) => {
                    let reactions = mem::take(reactions);
                    *state = State::Settled(outcome.clone());
                    reactions
                }
                State::Settled(_) => {
                    trace!(promise = self.shared.id, "ignoring second settlement");
                    return;
                }
            }
        };
        trace!(
            promise = self.shared.id,
            fulfilled = outcome.is_ok(),
            reactions = reactions.len(),
            "promise settled"
        );
        if let Err(rejected) = &outcome {
            if reactions.is_empty() {
                self.shared
                    .queue
                    .track_rejection(self.shared.id, rejected.clone());
            }
        }
        for reaction in reactions {
            self.dispatch(reaction, outcome.clone());
        }
    }

    fn dispatch(&self, reaction: Reaction<T>, outcome: Settled<T>) {
        match reaction {
            Reaction::Callback(callback) => {
                self.shared.queue.enqueue(move || callback(outcome));
            }
            // the awaiting task reads the outcome back out of the promise when
            // it is polled, so queueing its resumption is the whole reaction.
            Reaction::Resume(waker) => waker.borrow().wake_by_ref(),
        }
    }
}

/// The producer half of a pending [`Promise`]. Settling consumes it; dropping
/// it unsettled leaves the promise pending forever.
pub struct Resolver<T> {
    promise: Promise<T>,
}

impl<T: Clone + 'static> Resolver<T> {
    pub fn fulfill(self, value: T) {
        self.promise.settle(Ok(value));
    }

    pub fn reject(self, reason: impl Into<String>) {
        self.promise.settle(Err(Rejected::new(reason)));
    }

    pub fn settle(self, outcome: Settled<T>) {
        self.promise.settle(outcome);
    }
}

/// Future returned by `.await`ing a [`Promise`].
///
/// The first poll always suspends, even on an already settled promise: it
/// subscribes the task's waker, which queues the task's resumption behind
/// whatever is already waiting in the queue. Later polls while the promise is
/// still pending swap in the caller's current waker.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Awaiting<T> {
    promise: Promise<T>,
    waker: Option<Rc<RefCell<Waker>>>,
}

impl<T: Clone + 'static> IntoFuture for Promise<T> {
    type Output = Settled<T>;
    type IntoFuture = Awaiting<T>;

    fn into_future(self) -> Self::IntoFuture {
        Awaiting {
            promise: self,
            waker: None,
        }
    }
}

impl<T: Clone + 'static> Future for Awaiting<T> {
    type Output = Settled<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(waker) = &this.waker else {
            let waker = Rc::new(RefCell::new(cx.waker().clone()));
            this.promise.subscribe(Reaction::Resume(Rc::clone(&waker)));
            this.waker = Some(waker);
            return Poll::Pending;
        };
        match this.promise.peek() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                waker.borrow_mut().clone_from(cx.waker());
                Poll::Pending
            }
        }
    }
}
