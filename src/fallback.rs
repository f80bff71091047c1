//! Ordered fallback evaluation.
//!
//! The geo fetcher (endpoint list), the image resolver chain (enrichment
//! sources) and the image proxy (redirect hops) all evaluate an ordered
//! sequence of fallible operations lazily and stop at the first success.
//! [`first_of`] is that control structure.

use futures::future::BoxFuture;
use std::future::Future;

/// Result of a single attempt in a [`first_of`] sequence.
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// The attempt produced a value, no further attempts are made.
    Success(T),
    /// The attempt failed, the next one is tried.
    Fallthrough(E),
    /// The attempt failed in a way that must stop the whole sequence.
    Halt(E),
}

/// A boxed attempt, used when the attempts of a sequence are heterogeneous.
pub type BoxedAttempt<'a, T, E> = Box<dyn FnOnce() -> BoxFuture<'a, Attempt<T, E>> + Send + 'a>;

/// Evaluates `attempts` in order, returning the first success.
///
/// Attempts are only constructed and awaited once the previous one fell
/// through. On exhaustion the last observed error is returned, or `None`
/// if the sequence was empty.
pub async fn first_of<T, E, I, F, Fut>(attempts: I) -> Result<T, Option<E>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
{
    let mut last_error = None;
    for attempt in attempts {
        match attempt().await {
            Attempt::Success(value) => return Ok(value),
            Attempt::Fallthrough(err) => last_error = Some(err),
            Attempt::Halt(err) => return Err(Some(err)),
        }
    }
    Err(last_error)
}

impl<T, E> From<Result<T, E>> for Attempt<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Attempt::Success(value),
            Err(err) => Attempt::Fallthrough(err),
        }
    }
}
