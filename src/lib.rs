//! Thread-backed promises.
//!
//! A [`Promise`] holds the eventual outcome of a computation that runs
//! either on its own thread ([`Strategy::Asynchronous`]) or inline before
//! construction returns ([`Strategy::Synchronous`]). Observers on any thread
//! can block on it, chain further work with `then`, recover from typed
//! failures with `catch`, and register completion callbacks with `always`.
//! [`when`] and [`join_all`] join several promises into one.
//!
//! ```
//! use thread_promise::spawn;
//! use std::num::ParseIntError;
//!
//! let parsed = spawn(|| "12".parse::<i32>());
//! let doubled = parsed.then(|n| n * 2);
//! doubled.wait();
//! assert_eq!(doubled.result().unwrap(), 24);
//!
//! let bad = spawn(|| "twelve".parse::<i32>())
//!     .catch(|err: &ParseIntError| println!("recovered from {}", err));
//! bad.wait();
//! assert!(bad.throw_uncaught().is_ok());
//! ```
mod error;
mod gate;
mod join;
mod promise;
mod state;
mod strategy;

pub use error::{Error, Failure, Panic};
pub use join::{join_all, when, Join};
pub use promise::{Promise, Settled};
pub use state::Status;
pub use strategy::Strategy;

/// Builds a promise for `computation` and starts it with `strategy`.
pub fn promise<T, E, F>(strategy: Strategy, computation: F) -> Promise<T>
where
    T: Send + Sync + 'static,
    E: Into<Failure>,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    Promise::new(strategy, computation)
}

/// Runs `computation` on a new thread.
pub fn spawn<T, E, F>(computation: F) -> Promise<T>
where
    T: Send + Sync + 'static,
    E: Into<Failure>,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    Promise::new(Strategy::Asynchronous, computation)
}

/// Runs `computation` to completion on the calling thread.
pub fn run<T, E, F>(computation: F) -> Promise<T>
where
    T: Send + Sync + 'static,
    E: Into<Failure>,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    Promise::new(Strategy::Synchronous, computation)
}
