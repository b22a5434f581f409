//! The single-threaded task queue everything else is scheduled on.
//!
//! There is exactly one ordered FIFO of jobs. A job is either a reaction
//! callback (queued when a promise settles, or when a continuation is
//! attached to an already settled promise) or the resumption of a suspended
//! task (queued when that task's waker fires). Because both kinds share one
//! queue, the output of a program is fully determined by the order in which
//! it queues work.
//!
//! [`Waker`]s have to be `Send + Sync`, so the FIFO itself only carries plain
//! ids. The closures and task futures they refer to stay in `RefCell`
//! tables owned by the queue.

use core::{
    cell::{Cell, RefCell},
    future::Future,
    task::{Context, Poll, Waker},
};
use std::{
    collections::{HashMap, VecDeque},
    mem,
    rc::Rc,
    sync::{Arc, Mutex, PoisonError},
    task::Wake,
};

use futures_lite::future::{BoxedLocal, FutureExt};
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Rejected},
    promise::{Promise, Settled},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Reaction(u64),
    Resume(u64),
}

type Ready = Arc<Mutex<VecDeque<Job>>>;

struct Inner {
    ready: Ready,
    reactions: RefCell<HashMap<u64, Box<dyn FnOnce()>>>,
    tasks: RefCell<HashMap<u64, BoxedLocal<()>>>,
    unhandled: RefCell<Vec<(u64, Rejected)>>,
    next_id: Cell<u64>,
}

/// Handle to a task queue. Cloning it yields another handle to the same
/// queue.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Rc<Inner>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        TaskQueue {
            inner: Rc::new(Inner {
                ready: Arc::new(Mutex::new(VecDeque::new())),
                reactions: RefCell::new(HashMap::new()),
                tasks: RefCell::new(HashMap::new()),
                unhandled: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// A promise that is already fulfilled with `value`.
    pub fn resolved<T: Clone + 'static>(&self, value: T) -> Promise<T> {
        Promise::settled(self, Ok(value))
    }

    /// A promise that is already rejected with `reason`.
    pub fn rejected<T: Clone + 'static>(&self, reason: impl Into<String>) -> Promise<T> {
        Promise::settled(self, Err(Rejected::new(reason)))
    }

    /// Appends `job` to the back of the queue. It runs during the next
    /// [`drain`](Self::drain), after everything queued before it.
    pub fn enqueue(&self, job: impl FnOnce() + 'static) {
        let id = self.next_id();
        self.inner.reactions.borrow_mut().insert(id, Box::new(job));
        push(&self.inner.ready, Job::Reaction(id));
    }

    /// Starts `future` as a task and returns a promise for its outcome.
    ///
    /// The future is polled right away, so it runs synchronously up to its
    /// first suspension point. Every later poll is a queued resumption job.
    pub fn spawn<T, F>(&self, future: F) -> Promise<T>
    where
        T: Clone + 'static,
        F: Future<Output = Settled<T>> + 'static,
    {
        let (promise, resolver) = Promise::pending(self);
        let task = async move { resolver.settle(future.await) }.boxed_local();
        let id = self.next_id();
        debug!(task = id, "spawning task");
        self.poll_task(id, task);
        promise
    }

    /// Runs queued jobs in order until none are left, including jobs queued
    /// by the jobs themselves. Returns how many jobs ran.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while let Some(job) = pop(&self.inner.ready) {
            ran += 1;
            match job {
                Job::Reaction(id) => {
                    let reaction = self.inner.reactions.borrow_mut().remove(&id);
                    if let Some(reaction) = reaction {
                        trace!(job = id, "running reaction");
                        reaction();
                    }
                }
                Job::Resume(id) => {
                    let task = self.inner.tasks.borrow_mut().remove(&id);
                    match task {
                        Some(task) => {
                            trace!(task = id, "resuming task");
                            self.poll_task(id, task);
                        }
                        None => trace!(task = id, "ignoring wake for finished task"),
                    }
                }
            }
        }
        debug!(jobs = ran, "task queue drained");
        ran
    }

    /// Drains the queue, then fails with the first rejection that was never
    /// handled. Every unhandled rejection is logged.
    pub fn run(&self) -> Result<(), Error> {
        self.drain();
        let unhandled = mem::take(&mut *self.inner.unhandled.borrow_mut());
        for (promise, rejected) in &unhandled {
            warn!(promise, reason = rejected.reason(), "unhandled rejection");
        }
        match unhandled.into_iter().next() {
            Some((_, rejected)) => Err(Error::UnhandledRejection(rejected)),
            None => Ok(()),
        }
    }

    /// Number of spawned tasks still suspended.
    pub fn suspended_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    pub(crate) fn next_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    pub(crate) fn track_rejection(&self, promise: u64, rejected: Rejected) {
        self.inner.unhandled.borrow_mut().push((promise, rejected));
    }

    pub(crate) fn mark_handled(&self, promise: u64) {
        self.inner
            .unhandled
            .borrow_mut()
            .retain(|(id, _)| *id != promise);
    }

    fn poll_task(&self, id: u64, mut task: BoxedLocal<()>) {
        let waker = Waker::from(Arc::new(TaskWaker {
            task: id,
            ready: Arc::clone(&self.inner.ready),
        }));
        let mut cx = Context::from_waker(&waker);
        match task.as_mut().poll(&mut cx) {
            Poll::Ready(()) => debug!(task = id, "task completed"),
            Poll::Pending => {
                self.inner.tasks.borrow_mut().insert(id, task);
            }
        }
    }
}

struct TaskWaker {
    task: u64,
    ready: Ready,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref()
    }

    fn wake_by_ref(self: &Arc<Self>) {
        push(&self.ready, Job::Resume(self.task));
    }
}

fn push(ready: &Ready, job: Job) {
    ready
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push_back(job);
}

// the lock must be released before the job runs since jobs push more jobs.
fn pop(ready: &Ready) -> Option<Job> {
    ready
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use futures_lite::future::yield_now;

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) + Clone) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let push = {
            let log = Rc::clone(&log);
            move |entry: &'static str| log.borrow_mut().push(entry)
        };
        (log, push)
    }

    #[test]
    fn jobs_run_in_fifo_order() {
        let queue = TaskQueue::new();
        let (log, record) = recorder();
        for entry in ["first", "second", "third"] {
            let record = record.clone();
            queue.enqueue(move || record(entry));
        }
        assert!(log.borrow().is_empty());
        assert_eq!(queue.drain(), 3);
        assert_eq!(*log.borrow(), ["first", "second", "third"]);
    }

    #[test]
    fn jobs_queued_while_draining_run_after_existing_ones() {
        let queue = TaskQueue::new();
        let (log, record) = recorder();
        let handle = queue.clone();
        let outer = record.clone();
        queue.enqueue(move || {
            outer("outer");
            let nested = outer.clone();
            handle.enqueue(move || nested("nested"));
        });
        queue.enqueue(move || record("sibling"));
        assert_eq!(queue.drain(), 3);
        assert_eq!(*log.borrow(), ["outer", "sibling", "nested"]);
    }

    #[test]
    fn spawn_runs_inline_until_first_suspension() {
        let queue = TaskQueue::new();
        let (log, record) = recorder();
        let done = queue.spawn(async move {
            record("before");
            yield_now().await;
            record("after");
            Ok(())
        });
        assert_eq!(*log.borrow(), ["before"]);
        assert_eq!(queue.suspended_tasks(), 1);
        assert_eq!(done.peek(), None);

        queue.drain();
        assert_eq!(*log.borrow(), ["before", "after"]);
        assert_eq!(queue.suspended_tasks(), 0);
        assert_eq!(done.peek(), Some(Ok(())));
    }

    #[test]
    fn resumptions_share_the_fifo_with_reactions() {
        let queue = TaskQueue::new();
        let (log, record) = recorder();
        {
            let record = record.clone();
            queue.enqueue(move || record("reaction"));
        }
        let _task = queue.spawn(async move {
            yield_now().await;
            record("resumed");
            Ok(())
        });
        queue.drain();
        assert_eq!(*log.borrow(), ["reaction", "resumed"]);
    }

    #[test]
    fn run_reports_unhandled_rejection() {
        let queue = TaskQueue::new();
        let _rejected: Promise<()> = queue.rejected("nobody listened");
        match queue.run() {
            Err(Error::UnhandledRejection(rejected)) => {
                assert_eq!(rejected.reason(), "nobody listened")
            }
            other => panic!("expected an unhandled rejection, got {other:?}"),
        }
    }

    #[test]
    fn run_reports_first_of_several_unhandled_rejections() {
        let queue = TaskQueue::new();
        let _first: Promise<()> = queue.rejected("first");
        let _second: Promise<()> = queue.rejected("second");
        assert!(matches!(
            queue.run(),
            Err(Error::UnhandledRejection(rejected)) if rejected.reason() == "first"
        ));
        // every pending report is consumed by one run.
        assert!(queue.run().is_ok());
    }

    #[test]
    fn run_succeeds_on_empty_queue() {
        let queue = TaskQueue::new();
        assert!(queue.run().is_ok());
        assert_eq!(queue.drain(), 0);
    }
}
