use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the promise itself when a result is read.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("execution has not finished yet")]
    NotFinished,
    #[error("trying to get result from rejected promise")]
    Rejected,
    #[error("{0}")]
    Failed(Failure),
}

impl Error {
    /// The captured failure, if this error re-raises one.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Error::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Unwraps a re-raised failure, or captures this error as a new one.
    pub fn into_failure(self) -> Failure {
        match self {
            Error::Failed(failure) => failure,
            other => Failure::new(other),
        }
    }
}

/// A captured error, shared by every observer of a rejected promise.
///
/// Any `std::error::Error` converts into a `Failure`, so computations can use
/// `?` freely. Clones point at the same underlying error object.
///
/// ```
/// use thread_promise::Failure;
/// use std::num::ParseIntError;
///
/// let failure: Failure = "x".parse::<i32>().unwrap_err().into();
/// assert!(failure.is::<ParseIntError>());
/// assert!(failure.ptr_eq(&failure.clone()));
/// ```
#[derive(Clone)]
pub struct Failure {
    inner: Arc<dyn StdError + Send + Sync + 'static>,
}

impl Failure {
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Failure { inner: Arc::new(err) }
    }

    /// An ad-hoc failure carrying only a message.
    pub fn msg<M: fmt::Display>(msg: M) -> Self {
        Failure::new(Message(msg.to_string()))
    }

    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.inner.is::<E>()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Whether both failures are the very same error object.
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E> From<E> for Failure
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Failure::new(err)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// A computation panicked instead of returning.
#[derive(Debug, Clone, Error)]
#[error("computation panicked: {message}")]
pub struct Panic {
    message: String,
}

impl Panic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_owned()
        };
        Panic { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
