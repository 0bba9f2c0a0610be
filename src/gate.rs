//! A one-shot completion gate: released once, waited on by any number of
//! threads or async tasks.
use std::sync::{Condvar, Mutex, MutexGuard};
use std::task::Waker;

#[derive(Debug, Default)]
pub(crate) struct Gate {
    inner: Mutex<Inner>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct Inner {
    released: bool,
    wakers: Vec<Waker>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Gate::default()
    }

    /// Opens the gate. Returns false if it was already open.
    pub(crate) fn release(&self) -> bool {
        let mut inner = self.lock();
        if inner.released {
            return false;
        }
        inner.released = true;
        let wakers = std::mem::take(&mut inner.wakers);
        drop(inner);

        self.cond.notify_all();
        for waker in wakers {
            waker.wake()
        }
        true
    }

    /// Blocks the calling thread until the gate is released.
    pub(crate) fn wait(&self) {
        let mut inner = self.lock();
        while !inner.released {
            inner = match self.cond.wait(inner) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Registers `waker` unless the gate is already open; returns whether it is.
    pub(crate) fn poll_released(&self, waker: &Waker) -> bool {
        let mut inner = self.lock();
        if inner.released {
            return true;
        }
        if !inner.wakers.iter().any(|w| w.will_wake(waker)) {
            inner.wakers.push(waker.clone());
        }
        false
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
