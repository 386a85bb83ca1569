//! Schedule-driven re-invocation on failure.
//!
//! Retry is one of the two combinators (with `try_catch`) permitted to
//! inspect and recover from a failed run; everything else propagates `Fail`
//! unchanged. Each attempt is an isolated re-run of the inner transducer
//! against the same input; the attempt loop itself is expressed through the
//! trampoline, so unbounded attempt counts cannot grow the call stack.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::reducer::{dyn_reducer, DynReducer, StateCell};
use crate::result::TResult;
use crate::schedule::Schedule;
use crate::state::TState;
use crate::sum::Sum;
use crate::transducer::support::{drain, emit_drained, Drained};
use crate::transducer::{Transducer, Transform};

pub(crate) struct Retry<A, B, P> {
    inner: Transducer<A, B>,
    schedule: Schedule,
    keep_trying: Arc<P>,
    _marker: PhantomData<fn(A, B)>,
}

impl<A, B, P> Transform<A, B> for Retry<A, B, P>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    P: Fn(&Error) -> bool + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<A> {
        let inner = self.inner.clone();
        let schedule = self.schedule.clone();
        let keep_trying = Arc::clone(&self.keep_trying);
        dyn_reducer(move |st: &TState, state, value: A| {
            attempt(
                inner.clone(),
                next.clone(),
                schedule.clone(),
                Arc::clone(&keep_trying),
                st.clone(),
                state,
                value,
                0,
                None,
            )
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[allow(clippy::too_many_arguments)]
fn attempt<A, B, P>(
    inner: Transducer<A, B>,
    next: DynReducer<B>,
    schedule: Schedule,
    keep_trying: Arc<P>,
    st: TState,
    state: StateCell,
    input: A,
    step: u32,
    prev_delay: Option<Duration>,
) -> TResult<StateCell>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    P: Fn(&Error) -> bool + Send + Sync + 'static,
{
    match drain(&inner, &st, input.clone()) {
        Drained::Failed(error) => {
            if !keep_trying(&error) {
                return TResult::Fail(error);
            }
            match schedule.delay_with_jitter(step, prev_delay) {
                Some(delay) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt = step + 1, ?delay, %error, "retrying after failure");
                    TResult::recursive(move || {
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                        attempt(
                            inner,
                            next,
                            schedule,
                            keep_trying,
                            st,
                            state,
                            input,
                            step + 1,
                            Some(delay),
                        )
                    })
                }
                None => TResult::Fail(error),
            }
        }
        other => emit_drained(&next, &st, state, other),
    }
}

/// Re-invoke `inner` on failure, paced and bounded by `schedule`.
pub fn retry<A, B>(schedule: Schedule, inner: Transducer<A, B>) -> Transducer<A, B>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
{
    retry_while(schedule, inner, |_| true)
}

/// Re-invoke on failure while `pred` holds for the error; a failing
/// predicate terminates immediately, even with schedule budget left.
pub fn retry_while<A, B, P>(schedule: Schedule, inner: Transducer<A, B>, pred: P) -> Transducer<A, B>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    P: Fn(&Error) -> bool + Send + Sync + 'static,
{
    Transducer::from_transform(Retry {
        inner,
        schedule,
        keep_trying: Arc::new(pred),
        _marker: PhantomData,
    })
}

/// Re-invoke on failure until `pred` holds for the error.
pub fn retry_until<A, B, P>(schedule: Schedule, inner: Transducer<A, B>, pred: P) -> Transducer<A, B>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    P: Fn(&Error) -> bool + Send + Sync + 'static,
{
    retry_while(schedule, inner, move |e| !pred(e))
}

pub(crate) struct RetrySum<A, X, B, P> {
    inner: Transducer<A, Sum<X, B>>,
    schedule: Schedule,
    keep_trying: Arc<P>,
    _marker: PhantomData<fn(A, B)>,
}

impl<A, X, B, P> Transform<A, Sum<X, B>> for RetrySum<A, X, B, P>
where
    A: Clone + Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
    P: Fn(&X) -> bool + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<Sum<X, B>>) -> DynReducer<A> {
        let inner = self.inner.clone();
        let schedule = self.schedule.clone();
        let keep_trying = Arc::clone(&self.keep_trying);
        dyn_reducer(move |st: &TState, state, value: A| {
            attempt_sum(
                inner.clone(),
                next.clone(),
                schedule.clone(),
                Arc::clone(&keep_trying),
                st.clone(),
                state,
                value,
                0,
                None,
            )
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[allow(clippy::too_many_arguments)]
fn attempt_sum<A, X, B, P>(
    inner: Transducer<A, Sum<X, B>>,
    next: DynReducer<Sum<X, B>>,
    schedule: Schedule,
    keep_trying: Arc<P>,
    st: TState,
    state: StateCell,
    input: A,
    step: u32,
    prev_delay: Option<Duration>,
) -> TResult<StateCell>
where
    A: Clone + Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
    P: Fn(&X) -> bool + Send + Sync + 'static,
{
    match drain(&inner, &st, input.clone()) {
        Drained::Values { values, complete } => {
            // Left is the failure channel here; a run settling on Left is a
            // failed attempt. Data errors still fail fast below.
            let retriable = match values.last() {
                Some(Sum::Left(x)) => keep_trying(x),
                _ => false,
            };
            if retriable {
                if let Some(delay) = schedule.delay_with_jitter(step, prev_delay) {
                    return TResult::recursive(move || {
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                        attempt_sum(
                            inner,
                            next,
                            schedule,
                            keep_trying,
                            st,
                            state,
                            input,
                            step + 1,
                            Some(delay),
                        )
                    });
                }
            }
            emit_drained(&next, &st, state, Drained::Values { values, complete })
        }
        other => emit_drained(&next, &st, state, other),
    }
}

/// Sum-aware retry: a run settling on `Left` counts as a failed attempt and
/// is re-invoked per `schedule`; once exhausted, the last `Left` is
/// forwarded as data.
pub fn retry_sum<A, X, B>(
    schedule: Schedule,
    inner: Transducer<A, Sum<X, B>>,
) -> Transducer<A, Sum<X, B>>
where
    A: Clone + Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
{
    retry_sum_while(schedule, inner, |_| true)
}

/// [`retry_sum`] with an early-stop predicate over the `Left` value.
pub fn retry_sum_while<A, X, B, P>(
    schedule: Schedule,
    inner: Transducer<A, Sum<X, B>>,
    pred: P,
) -> Transducer<A, Sum<X, B>>
where
    A: Clone + Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
    P: Fn(&X) -> bool + Send + Sync + 'static,
{
    Transducer::from_transform(RetrySum {
        inner,
        schedule,
        keep_trying: Arc::new(pred),
        _marker: PhantomData,
    })
}
