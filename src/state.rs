//! The settlement state of a promise, without any locking.
//!
//! `Core` only ever moves out of `Pending` once. Every mutator reports
//! whether it won the transition so the caller knows whether to run the
//! follow-up work (gate release, successor, callbacks) outside the lock.
use crate::{Error, Failure};
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Resolved,
    Rejected,
}

impl Status {
    pub fn is_finished(self) -> bool {
        self != Status::Pending
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Pending => "pending",
            Status::Resolved => "resolved",
            Status::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// A promise waiting on another one.
pub(crate) trait Successor: Send + Sync {
    /// Run the successor's own computation.
    fn trigger(self: Arc<Self>);
    /// Reject the successor without running its computation.
    fn pass_rejection(self: Arc<Self>, failure: Option<Failure>);
}

/// What a successor should be told about a settled upstream.
pub(crate) enum Propagate {
    Trigger,
    Reject(Option<Failure>),
}

impl Propagate {
    pub(crate) fn apply(self, next: Arc<dyn Successor>) {
        match self {
            Propagate::Trigger => next.trigger(),
            Propagate::Reject(failure) => next.pass_rejection(failure),
        }
    }
}

/// Returns true when it absorbed the failure.
pub(crate) type Handler = Box<dyn FnOnce(&Failure) -> bool + Send>;
pub(crate) type Callback = Box<dyn FnOnce() + Send>;

/// Where a freshly registered recovery handler should go.
pub(crate) enum Recovery {
    /// Run it now against this failure; nobody else is handling.
    Run(Failure, Handler),
    /// Queued, or dropped because there is nothing left to absorb.
    Done,
}

/// A queue of boxed `FnOnce`s. Only touched through `&mut`, the mutex is
/// there so `Core` stays `Sync` behind the read/write lock.
pub(crate) struct Queue<F>(Mutex<Vec<F>>);

impl<F> Queue<F> {
    fn new() -> Self {
        Queue(Mutex::new(Vec::new()))
    }

    fn items(&mut self) -> &mut Vec<F> {
        self.0.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&mut self, item: F) {
        self.items().push(item)
    }

    fn take(&mut self) -> Vec<F> {
        std::mem::take(self.items())
    }
}

pub(crate) struct Core<T> {
    status: Status,
    value: Option<T>,
    failure: Option<Failure>,
    successor: Option<Arc<dyn Successor>>,
    handlers: Queue<Handler>,
    callbacks: Queue<Callback>,
    // a handler pass over `failure` is in progress outside the lock
    handling: bool,
    // rejected, but the successor has not been told yet
    settling: bool,
    callbacks_done: bool,
}

impl<T> Core<T> {
    pub(crate) fn new() -> Self {
        Core {
            status: Status::Pending,
            value: None,
            failure: None,
            successor: None,
            handlers: Queue::new(),
            callbacks: Queue::new(),
            handling: false,
            settling: false,
            callbacks_done: false,
        }
    }

    pub(crate) fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Pending -> Resolved. On success returns the successor to trigger.
    pub(crate) fn resolve(&mut self, value: T) -> Result<Option<Arc<dyn Successor>>, T> {
        if self.status != Status::Pending {
            return Err(value);
        }
        self.status = Status::Resolved;
        self.value = Some(value);
        Ok(self.successor.clone())
    }

    /// Pending -> Rejected. On success returns the queued handlers, which
    /// the caller must pass over the failure and then `finish_handling`.
    pub(crate) fn reject(&mut self, failure: Option<Failure>) -> Option<Vec<Handler>> {
        if self.status != Status::Pending {
            return None;
        }
        self.status = Status::Rejected;
        self.settling = true;
        self.handling = failure.is_some();
        self.failure = failure;
        Some(self.handlers.take())
    }

    /// Records the outcome of a handler pass. Returns handlers queued while
    /// the pass ran, if the failure is still unabsorbed and there are any.
    pub(crate) fn finish_handling(&mut self, absorbed: bool) -> Option<Vec<Handler>> {
        if absorbed {
            self.failure = None;
        }
        let queued = self.handlers.take();
        if self.failure.is_none() || queued.is_empty() {
            self.handling = false;
            return None;
        }
        Some(queued)
    }

    pub(crate) fn add_handler(&mut self, handler: Handler) -> Recovery {
        match self.status {
            Status::Pending => self.handlers.push(handler),
            Status::Rejected if self.handling => self.handlers.push(handler),
            Status::Rejected => {
                if let Some(failure) = self.failure.clone() {
                    self.handling = true;
                    return Recovery::Run(failure, handler);
                }
            }
            Status::Resolved => {}
        }
        Recovery::Done
    }

    /// Registers `callback`, or hands it back if callbacks already fired.
    pub(crate) fn add_callback(&mut self, callback: Callback) -> Option<Callback> {
        if self.callbacks_done {
            return Some(callback);
        }
        self.callbacks.push(callback);
        None
    }

    /// The next batch of completion callbacks; marks them done once drained.
    pub(crate) fn take_callbacks(&mut self) -> Vec<Callback> {
        let callbacks = self.callbacks.take();
        if callbacks.is_empty() {
            self.callbacks_done = true;
        }
        callbacks
    }

    /// Replaces the successor. Returns what to tell it right away if this
    /// core has already settled and is not mid handler pass.
    pub(crate) fn set_successor(&mut self, next: Arc<dyn Successor>) -> Option<Propagate> {
        self.successor = Some(next);
        match self.status {
            Status::Pending => None,
            Status::Resolved => Some(Propagate::Trigger),
            Status::Rejected if self.settling => None,
            Status::Rejected => Some(Propagate::Reject(self.failure.clone())),
        }
    }

    /// Ends a rejection, returning the successor to hand the (possibly
    /// absorbed) failure on to. Successors chained from now on are told
    /// by `set_successor` instead.
    pub(crate) fn finish_settling(&mut self) -> Option<(Arc<dyn Successor>, Option<Failure>)> {
        self.settling = false;
        self.successor
            .clone()
            .map(|next| (next, self.failure.clone()))
    }
}

impl<T: Clone> Core<T> {
    pub(crate) fn result(&self) -> Result<T, Error> {
        match self.status {
            Status::Pending => Err(Error::NotFinished),
            Status::Resolved => self.value.clone().ok_or(Error::NotFinished),
            Status::Rejected => match &self.failure {
                Some(failure) => Err(Error::Failed(failure.clone())),
                None => Err(Error::Rejected),
            },
        }
    }
}
