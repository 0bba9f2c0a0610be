//! Joining several promises into one.
//!
//! Inputs are waited on one at a time in positional order. The first input
//! that turns out rejected rejects the joined promise with its failure, and
//! the combine function never runs.
use crate::{Failure, Promise, Strategy};
use log::debug;

/// A fixed group of promises that can be waited on together.
///
/// Implemented for tuples of one to ten promises of independent types.
pub trait Join {
    type Output;

    /// Blocks on each promise in order, collecting the values.
    fn join(self) -> Result<Self::Output, Failure>;
}

macro_rules! impl_join {
    ($($p:ident: $T:ident),+) => {
        impl<$($T),+> Join for ($(Promise<$T>,)+)
        where
            $($T: Clone + Send + Sync + 'static,)+
        {
            type Output = ($($T,)+);

            fn join(self) -> Result<Self::Output, Failure> {
                let ($($p,)+) = self;
                Ok(($($p.get()?,)+))
            }
        }
    };
}

impl_join!(p1: T1);
impl_join!(p1: T1, p2: T2);
impl_join!(p1: T1, p2: T2, p3: T3);
impl_join!(p1: T1, p2: T2, p3: T3, p4: T4);
impl_join!(p1: T1, p2: T2, p3: T3, p4: T4, p5: T5);
impl_join!(p1: T1, p2: T2, p3: T3, p4: T4, p5: T5, p6: T6);
impl_join!(p1: T1, p2: T2, p3: T3, p4: T4, p5: T5, p6: T6, p7: T7);
impl_join!(p1: T1, p2: T2, p3: T3, p4: T4, p5: T5, p6: T6, p7: T7, p8: T8);
impl_join!(p1: T1, p2: T2, p3: T3, p4: T4, p5: T5, p6: T6, p7: T7, p8: T8, p9: T9);
impl_join!(p1: T1, p2: T2, p3: T3, p4: T4, p5: T5, p6: T6, p7: T7, p8: T8, p9: T9, p10: T10);

/// Joins a tuple of promises, combining their values on a new thread.
///
/// # Examples
///
/// ```
/// use thread_promise::{spawn, when, Failure};
///
/// let a = spawn(|| Ok::<_, Failure>(2));
/// let b = spawn(|| Ok::<_, Failure>("three"));
/// let joined = when((a, b), |(n, s)| format!("{} {}", n, s));
/// assert_eq!(joined.get().unwrap(), "2 three");
/// ```
pub fn when<J, U, F>(promises: J, combine: F) -> Promise<U>
where
    J: Join + Send + 'static,
    U: Send + Sync + 'static,
    F: FnOnce(J::Output) -> U + Send + 'static,
{
    Promise::new(Strategy::Asynchronous, move || {
        let values = promises.join()?;
        debug!("joined promises resolved, combining");
        Ok::<_, Failure>(combine(values))
    })
}

/// Joins any number of same-typed promises.
pub fn join_all<T, U, I, F>(promises: I, combine: F) -> Promise<U>
where
    T: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
    I: IntoIterator<Item = Promise<T>>,
    F: FnOnce(Vec<T>) -> U + Send + 'static,
{
    let promises: Vec<Promise<T>> = promises.into_iter().collect();
    Promise::new(Strategy::Asynchronous, move || {
        let values = promises
            .iter()
            .map(Promise::get)
            .collect::<Result<Vec<T>, Failure>>()?;
        debug!("joined {} promises, combining", values.len());
        Ok::<_, Failure>(combine(values))
    })
}
