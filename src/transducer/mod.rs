//! Immutable, composable transformation descriptions.
//!
//! A [`Transducer<A, B>`] describes how values of `A` become values of `B`.
//! Building one performs no work: combinators nest structurally, the graph
//! is cheap to clone, safe to share across threads and reusable across any
//! number of invocations. Execution happens only through
//! [`invoke`](crate::invoke), which transforms the graph into a single
//! reducer chain and drives the trampoline.
//!
//! Combinators live one family per file; free constructors are re-exported
//! here and most have a method-form equivalent on `Transducer`.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::reducer::{DynReducer, Reducer};
use crate::result::TResult;
use crate::schedule::Schedule;
use crate::sum::Sum;

pub(crate) mod support;

mod apply;
mod bind;
mod choice;
mod compose;
mod constructors;
mod filter;
mod fold;
mod fork;
mod map;
mod memo;
mod post;
mod repeat;
mod resources;
mod retry;
mod sum_ops;
mod try_catch;
mod zip;

pub use apply::{apply, apply_sum, SharedFn};
pub use bind::{bind, flatten};
pub use choice::choice;
pub use compose::compose;
pub use constructors::{constant, emit_each, fail, from_async, identity, lift_result, lift_sum};
pub use filter::filter;
pub use fold::{fold_until, fold_while};
pub use fork::{fork, TFork};
pub use map::lift;
pub use memo::memo;
pub use post::post;
pub use repeat::{repeat, repeat_until};
pub use resources::{release, use_resource};
pub use retry::{retry, retry_sum, retry_sum_while, retry_until, retry_while};
pub use sum_ops::{bind_sum, filter_sum};
pub use try_catch::try_catch;
pub use zip::zip;

/// How a node turns a downstream reducer into an upstream one.
///
/// Object-safe so graphs can nest arbitrarily: the chain threads the
/// type-erased state cell, never a caller-visible state type.
pub(crate) trait Transform<A, B>: Send + Sync {
    fn transform(&self, next: DynReducer<B>) -> DynReducer<A>;
    fn as_any(&self) -> &dyn Any;
}

/// An immutable description of a transformation from `A` to `B`.
///
/// Constructed once, invoked arbitrarily many times, shared freely.
/// Cloning copies a handle, not the graph.
///
/// # Example
///
/// ```rust
/// use millrace::{lift, invoke1, CancelToken};
///
/// let pipeline = lift(|x: i32| x + 1).filter(|x| x % 2 == 0);
///
/// assert_eq!(invoke1(&pipeline, 3, CancelToken::new()).value(), Some(4));
/// assert!(invoke1(&pipeline, 4, CancelToken::new()).is_none());
/// ```
pub struct Transducer<A, B> {
    pub(crate) inner: Arc<dyn Transform<A, B>>,
}

impl<A, B> Clone for Transducer<A, B> {
    fn clone(&self) -> Self {
        Transducer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, B> std::fmt::Debug for Transducer<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transducer").field("graph", &"<nodes>").finish()
    }
}

impl<A, B> Transducer<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    pub(crate) fn from_transform(node: impl Transform<A, B> + 'static) -> Self {
        Transducer {
            inner: Arc::new(node),
        }
    }

    /// Build this node's reducer chain on top of `next`.
    pub(crate) fn reduce_with(&self, next: DynReducer<B>) -> DynReducer<A> {
        self.inner.transform(next)
    }

    /// Feed this transducer's output into `next`. O(1), purely deferred.
    pub fn then<C: Send + 'static>(self, next: Transducer<B, C>) -> Transducer<A, C> {
        compose(self, next)
    }

    /// Transform every produced value.
    pub fn map<C, F>(self, f: F) -> Transducer<A, C>
    where
        C: Send + 'static,
        F: Fn(B) -> C + Send + Sync + 'static,
    {
        self.then(lift(f))
    }

    /// Forward only values satisfying `pred`; a failing value continues the
    /// chain without being forwarded.
    pub fn filter<P>(self, pred: P) -> Transducer<A, B>
    where
        P: Fn(&B) -> bool + Send + Sync + 'static,
    {
        self.then(filter(pred))
    }

    /// For each produced value, derive a continuation transducer and re-run
    /// it against the original input.
    pub fn bind<C, F>(self, f: F) -> Transducer<A, C>
    where
        A: Clone + Sync,
        C: Send + 'static,
        F: Fn(B) -> Transducer<A, C> + Send + Sync + 'static,
    {
        bind(self, f)
    }

    /// Accumulate produced values, emitting the aggregate when `pred` stops
    /// holding. Fold-then-test: the triggering value is included in the
    /// emitted aggregate, and the accumulator resets afterwards.
    pub fn fold_while<S, F, P>(
        self,
        schedule: Schedule,
        init: S,
        folder: F,
        pred: P,
    ) -> Transducer<A, S>
    where
        B: Clone,
        S: Clone + Send + Sync + 'static,
        F: Fn(S, B) -> S + Send + Sync + 'static,
        P: Fn(&S, &B) -> bool + Send + Sync + 'static,
    {
        self.then(fold_while(schedule, init, folder, pred))
    }

    /// Accumulate produced values, emitting the aggregate once `pred` starts
    /// holding. Dual of [`Transducer::fold_while`].
    pub fn fold_until<S, F, P>(
        self,
        schedule: Schedule,
        init: S,
        folder: F,
        pred: P,
    ) -> Transducer<A, S>
    where
        B: Clone,
        S: Clone + Send + Sync + 'static,
        F: Fn(S, B) -> S + Send + Sync + 'static,
        P: Fn(&S, &B) -> bool + Send + Sync + 'static,
    {
        self.then(fold_until(schedule, init, folder, pred))
    }

    /// Pair this transducer's outputs element-wise with `other`'s, for the
    /// same input.
    pub fn zip<C>(self, other: Transducer<A, C>) -> Transducer<A, (B, C)>
    where
        A: Clone,
        C: Send + 'static,
    {
        zip(self, other)
    }

    /// Re-invoke on failure, paced and bounded by `schedule`.
    pub fn retry(self, schedule: Schedule) -> Transducer<A, B>
    where
        A: Clone,
    {
        retry(schedule, self)
    }

    /// Re-invoke on failure while `pred` holds for the error.
    pub fn retry_while<P>(self, schedule: Schedule, pred: P) -> Transducer<A, B>
    where
        A: Clone,
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        retry_while(schedule, self, pred)
    }

    /// Re-invoke on failure until `pred` holds for the error.
    pub fn retry_until<P>(self, schedule: Schedule, pred: P) -> Transducer<A, B>
    where
        A: Clone,
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        retry_until(schedule, self, pred)
    }

    /// Re-invoke a successful run until the schedule is exhausted, yielding
    /// the last produced value.
    pub fn repeat(self, schedule: Schedule) -> Transducer<A, B>
    where
        A: Clone,
    {
        repeat(schedule, self)
    }

    /// Re-invoke a successful run until `stop` holds for the last value or
    /// the schedule is exhausted.
    pub fn repeat_until<P>(self, schedule: Schedule, stop: P) -> Transducer<A, B>
    where
        A: Clone,
        P: Fn(&B) -> bool + Send + Sync + 'static,
    {
        repeat_until(schedule, self, stop)
    }

    /// Cache the outputs for the most recent input, replaying them without
    /// re-running the chain.
    pub fn memo(self) -> Transducer<A, B>
    where
        A: Clone + PartialEq + Sync,
        B: Clone + Sync,
    {
        memo(self)
    }

    /// Run in the background on its own thread, with a child cancellation
    /// token and its own resource registry. The returned handle awaits or
    /// cancels the work; an await timeout fails the await only.
    pub fn fork(self, timeout: Option<Duration>) -> Transducer<A, TFork<B>>
    where
        B: Clone,
    {
        fork(self, timeout)
    }

    /// Run on the invocation's captured [`PostContext`](crate::PostContext),
    /// marshalling the result back; runs inline when none was captured.
    pub fn post(self) -> Transducer<A, B> {
        post(self)
    }

    /// Intercept failures matching `pred` and run `handler` with the error
    /// as input. Failures not matching propagate unchanged.
    pub fn try_catch<P>(self, pred: P, handler: Transducer<Error, B>) -> Transducer<A, B>
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        try_catch(self, pred, handler)
    }

    /// Track every produced value as a disposable resource in the active
    /// invocation's registry.
    pub fn use_resource<D>(self, dispose: D) -> Transducer<A, Arc<B>>
    where
        B: Sync,
        D: Fn(&B) + Send + Sync + 'static,
    {
        use_resource(self, dispose)
    }

    /// Execute against `input`: see [`invoke`](crate::invoke).
    pub fn invoke<S, R>(&self, input: A, init: S, reducer: R, token: CancelToken) -> TResult<S>
    where
        S: Send + 'static,
        R: Reducer<S, B> + 'static,
    {
        crate::invoke::invoke(self, input, init, reducer, token)
    }

    /// Execute against `input`, collapsing output to the last value: see
    /// [`invoke1`](crate::invoke1).
    pub fn invoke1(&self, input: A, token: CancelToken) -> TResult<B> {
        crate::invoke::invoke1(self, input, token)
    }
}

impl<A, B> Transducer<A, Transducer<A, B>>
where
    A: Clone + Send + Sync + 'static,
    B: Send + 'static,
{
    /// Collapse a transducer-producing transducer by re-running each
    /// produced graph against the original input.
    pub fn flatten(self) -> Transducer<A, B> {
        flatten(self)
    }
}

impl<A, X, B> Transducer<A, Sum<X, B>>
where
    A: Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
{
    /// Transform the `Right` channel, forwarding `Left` untouched.
    pub fn map_right<C, F>(self, f: F) -> Transducer<A, Sum<X, C>>
    where
        C: Send + 'static,
        F: Fn(B) -> C + Send + Sync + 'static,
    {
        self.map(move |sum| sum.map(&f))
    }

    /// Transform the `Left` channel, forwarding `Right` untouched.
    pub fn map_left<Y, F>(self, f: F) -> Transducer<A, Sum<Y, B>>
    where
        Y: Send + 'static,
        F: Fn(X) -> Y + Send + Sync + 'static,
    {
        self.map(move |sum| sum.map_left(&f))
    }

    /// Transform both channels at once.
    pub fn bimap<Y, C, FL, FR>(self, left: FL, right: FR) -> Transducer<A, Sum<Y, C>>
    where
        Y: Send + 'static,
        C: Send + 'static,
        FL: Fn(X) -> Y + Send + Sync + 'static,
        FR: Fn(B) -> C + Send + Sync + 'static,
    {
        self.map(move |sum| sum.bimap(&left, &right))
    }

    /// Filter the `Right` channel; `Left` is forwarded before the predicate
    /// is ever consulted.
    pub fn filter_sum<P>(self, pred: P) -> Transducer<A, Sum<X, B>>
    where
        P: Fn(&B) -> bool + Send + Sync + 'static,
    {
        self.then(filter_sum(pred))
    }

    /// Bind over the `Right` channel; `Left` is forwarded untouched.
    pub fn bind_sum<C, F>(self, f: F) -> Transducer<A, Sum<X, C>>
    where
        A: Clone + Sync,
        C: Send + 'static,
        F: Fn(B) -> Transducer<A, Sum<X, C>> + Send + Sync + 'static,
    {
        bind_sum(self, f)
    }

    /// Re-invoke while the run settles on `Left`, treating `Left` as the
    /// failure channel instead of thrown or data errors.
    pub fn retry_sum(self, schedule: Schedule) -> Transducer<A, Sum<X, B>>
    where
        A: Clone,
    {
        retry_sum(schedule, self)
    }

    /// [`Transducer::retry_sum`] with an early-stop predicate over `Left`.
    pub fn retry_sum_while<P>(self, schedule: Schedule, pred: P) -> Transducer<A, Sum<X, B>>
    where
        A: Clone,
        P: Fn(&X) -> bool + Send + Sync + 'static,
    {
        retry_sum_while(schedule, self, pred)
    }
}
