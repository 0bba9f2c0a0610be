use crate::gate::Gate;
use crate::state::{Callback, Core, Handler, Recovery, Status, Successor};
use crate::strategy::{Job, Strategy};
use crate::{Error, Failure, Panic};
use log::{debug, trace, warn};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::task::{Context, Poll};

type Computation<T> = Box<dyn FnOnce() -> Result<T, Failure> + Send>;

/// The eventual outcome of a computation, observable from any thread.
///
/// Cloning a `Promise` yields another handle to the same outcome.
///
/// # Examples
///
/// ```
/// use thread_promise::{spawn, Failure};
///
/// let doubled = spawn(|| Ok::<_, Failure>(21)).then(|n| n * 2);
/// doubled.wait();
/// assert_eq!(doubled.result().unwrap(), 42);
/// ```
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    core: RwLock<Core<T>>,
    gate: Gate,
    strategy: Strategy,
    computation: Mutex<Option<Computation<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise { inner: self.inner.clone() }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("status", &self.inner.read().status())
            .field("strategy", &self.inner.strategy)
            .finish()
    }
}

impl<T: Send + Sync + 'static> Promise<T> {
    /// Builds a promise and starts its computation with `strategy`.
    pub fn new<F, E>(strategy: Strategy, computation: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<Failure>,
    {
        let promise = Promise::deferred(strategy, computation);
        promise.inner.launch();
        promise
    }

    /// Builds a promise whose computation does not run until it is started,
    /// either by `start` or by an upstream promise it was chained onto.
    pub fn deferred<F, E>(strategy: Strategy, computation: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<Failure>,
    {
        let computation: Computation<T> = Box::new(move || computation().map_err(Into::into));
        Promise {
            inner: Arc::new(Inner {
                core: RwLock::new(Core::new()),
                gate: Gate::new(),
                strategy,
                computation: Mutex::new(Some(computation)),
            }),
        }
    }

    /// Starts a deferred computation. Does nothing if it already ran.
    pub fn start(&self) {
        self.inner.launch();
    }

    pub fn status(&self) -> Status {
        self.inner.read().status()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    /// Blocks the calling thread until this promise settles.
    pub fn wait(&self) {
        self.inner.gate.wait();
    }

    /// The unabsorbed failure this promise was rejected with, if any.
    pub fn throw_uncaught(&self) -> Result<(), Failure> {
        match self.inner.read().failure() {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    /// Makes `next` the successor of this promise and returns it.
    ///
    /// When this promise resolves, `next` is started. When it rejects, `next`
    /// is rejected with the same (possibly absorbed) failure and its own
    /// computation never runs. If this promise has already settled, that
    /// happens before `chain` returns. Chaining again replaces the successor.
    pub fn chain<U: Send + Sync + 'static>(&self, next: Promise<U>) -> Promise<U> {
        let successor: Arc<dyn Successor> = next.inner.clone();
        let propagate = self.inner.write().set_successor(successor.clone());
        if let Some(propagate) = propagate {
            trace!("chaining onto a settled promise");
            propagate.apply(successor);
        }
        next
    }

    /// Registers a recovery handler for failures of type `E`.
    ///
    /// The handler runs once, either now (if this promise is already
    /// rejected with an unabsorbed failure) or at rejection time. When the
    /// failure is an `E` the handler absorbs it; otherwise the failure stays
    /// unhandled and later handlers get their turn. The first match wins.
    pub fn catch<E, F>(&self, handler: F) -> Promise<T>
    where
        E: StdError + 'static,
        F: FnOnce(&E) + Send + 'static,
    {
        self.catch_any(move |failure: &Failure| match failure.downcast_ref::<E>() {
            Some(err) => {
                handler(err);
                true
            }
            None => false,
        })
    }

    /// Like `catch`, but `handler` decides whether it absorbed the failure.
    pub fn catch_any<F>(&self, handler: F) -> Promise<T>
    where
        F: FnOnce(&Failure) -> bool + Send + 'static,
    {
        let recovery = self.inner.write().add_handler(Box::new(handler));
        if let Recovery::Run(failure, handler) = recovery {
            self.inner.handle(failure, vec![handler]);
        }
        self.clone()
    }

    /// Registers a callback to run once this promise settles either way.
    ///
    /// Callbacks run on the settling thread after the gate opens, so one
    /// registered right after `wait()` returns may still be queued and run
    /// there shortly after, rather than inline on the caller's thread. A
    /// panicking callback is logged and does not stop the ones after it.
    pub fn always<F>(&self, callback: F) -> Promise<T>
    where
        F: FnOnce() + Send + 'static,
    {
        let rejected = self.inner.write().add_callback(Box::new(callback));
        if let Some(callback) = rejected {
            callback();
        }
        self.clone()
    }
}

impl<T: Clone + Send + Sync + 'static> Promise<T> {
    /// The resolved value.
    ///
    /// Fails with `Error::NotFinished` while pending, and with the recorded
    /// failure (or `Error::Rejected` once it was absorbed) when rejected.
    pub fn result(&self) -> Result<T, Error> {
        self.inner.read().result()
    }

    /// Waits for settlement, then returns the value or the failure.
    pub fn get(&self) -> Result<T, Failure> {
        self.wait();
        self.result().map_err(Error::into_failure)
    }

    /// A `std::future::Future` that completes when this promise settles.
    pub fn settled(&self) -> Settled<T> {
        Settled { promise: self.clone() }
    }

    /// Chains a transform of the resolved value, run inline on whichever
    /// thread settles this promise.
    pub fn then<U, F>(&self, transform: F) -> Promise<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |value| Ok::<_, Failure>(transform(value)))
    }

    /// Like `then`, but the transform may fail and reject the new promise.
    pub fn and_then<U, E, F>(&self, transform: F) -> Promise<U>
    where
        U: Send + Sync + 'static,
        E: Into<Failure>,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        let upstream = Arc::downgrade(&self.inner);
        let next = Promise::deferred(Strategy::Synchronous, move || -> Result<U, Failure> {
            let value = upstream_value(&upstream)?;
            transform(value).map_err(Into::into)
        });
        self.chain(next)
    }
}

/// Runs a recovery handler. One that panics has not absorbed anything.
fn absorbs(handler: Handler, failure: &Failure) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(failure))) {
        Ok(absorbed) => absorbed,
        Err(payload) => {
            let panic = Panic::from_payload(payload);
            warn!("recovery handler panicked: {}", panic.message());
            false
        }
    }
}

fn upstream_value<T: Clone>(upstream: &Weak<Inner<T>>) -> Result<T, Failure> {
    match upstream.upgrade() {
        Some(inner) => inner.read().result().map_err(Error::into_failure),
        None => Err(Failure::new(Error::Rejected)),
    }
}

impl<T: Send + Sync + 'static> Inner<T> {
    fn launch(self: &Arc<Self>) {
        let computation = match self.take_computation() {
            Some(computation) => computation,
            None => return,
        };
        let inner = self.clone();
        let job: Job = Box::new(move || inner.execute(computation));
        if let Err(err) = self.strategy.run(job) {
            warn!("failed to spawn promise worker: {}", err);
            self.reject(Some(Failure::new(err)));
        }
    }

    fn execute(&self, computation: Computation<T>) {
        match panic::catch_unwind(AssertUnwindSafe(computation)) {
            Ok(Ok(value)) => self.resolve(value),
            Ok(Err(failure)) => self.reject(Some(failure)),
            Err(payload) => {
                let panic = Panic::from_payload(payload);
                warn!("promise computation panicked: {}", panic.message());
                self.reject(Some(Failure::new(panic)));
            }
        }
    }

    fn resolve(&self, value: T) {
        let next = match self.write().resolve(value) {
            Ok(next) => next,
            Err(_) => {
                trace!("ignoring resolve of a settled promise");
                return;
            }
        };
        debug!("promise resolved");
        self.gate.release();
        if let Some(next) = next {
            next.trigger();
        }
        self.fire_callbacks();
    }

    fn reject(&self, failure: Option<Failure>) {
        let handlers = match self.write().reject(failure.clone()) {
            Some(handlers) => handlers,
            None => {
                trace!("ignoring reject of a settled promise");
                return;
            }
        };
        debug!("promise rejected");
        if let Some(failure) = failure {
            self.handle(failure, handlers);
        }
        // the computation will never run now
        drop(self.take_computation());
        let rejection = self.write().finish_settling();
        self.gate.release();
        if let Some((next, failure)) = rejection {
            next.pass_rejection(failure);
        }
        self.fire_callbacks();
    }

    /// Passes `failure` through handlers until one absorbs it, picking up
    /// handlers registered while the pass runs.
    fn handle(&self, failure: Failure, mut handlers: Vec<Handler>) {
        loop {
            let absorbed = handlers.drain(..).any(|handler| absorbs(handler, &failure));
            if absorbed {
                debug!("failure absorbed by handler: {}", failure);
            }
            match self.write().finish_handling(absorbed) {
                Some(queued) => handlers = queued,
                None => return,
            }
        }
    }

    fn fire_callbacks(&self) {
        loop {
            let callbacks: Vec<Callback> = self.write().take_callbacks();
            if callbacks.is_empty() {
                return;
            }
            for callback in callbacks {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
                    let panic = Panic::from_payload(payload);
                    warn!("completion callback panicked: {}", panic.message());
                }
            }
        }
    }

    fn take_computation(&self) -> Option<Computation<T>> {
        self.computation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl<T> Inner<T> {
    fn read(&self) -> RwLockReadGuard<'_, Core<T>> {
        self.core.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Core<T>> {
        self.core.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Send + Sync + 'static> Successor for Inner<T> {
    fn trigger(self: Arc<Self>) {
        self.launch();
    }

    fn pass_rejection(self: Arc<Self>, failure: Option<Failure>) {
        self.reject(failure);
    }
}

/// Completes with the outcome of a promise once it settles.
///
/// # Examples
///
/// ```
/// use thread_promise::{spawn, Failure};
/// use futures::executor::block_on;
///
/// let promise = spawn(|| Ok::<_, Failure>("🍓"));
/// assert_eq!(block_on(promise.settled()).unwrap(), "🍓");
/// ```
#[derive(Debug)]
pub struct Settled<T> {
    promise: Promise<T>,
}

impl<T: Clone + Send + Sync + 'static> Future for Settled<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.promise.inner.gate.poll_released(cx.waker()) {
            Poll::Ready(self.promise.result())
        } else {
            Poll::Pending
        }
    }
}
