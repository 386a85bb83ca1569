//! Schedule-driven re-invocation on success.
//!
//! The mirror image of retry: each successful run is re-invoked per the
//! schedule until it is exhausted or a stop predicate accepts the produced
//! value. Only the final run's value reaches downstream; intermediate runs
//! are observed solely through their side effects.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::reducer::{dyn_reducer, DynReducer, StateCell};
use crate::result::TResult;
use crate::schedule::Schedule;
use crate::state::TState;
use crate::transducer::support::{drain, drive, emit_drained, Drained};
use crate::transducer::{Transducer, Transform};

pub(crate) struct Repeat<A, B, P> {
    inner: Transducer<A, B>,
    schedule: Schedule,
    stop: Arc<P>,
    _marker: PhantomData<fn(A, B)>,
}

impl<A, B, P> Transform<A, B> for Repeat<A, B, P>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    P: Fn(&B) -> bool + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<A> {
        let inner = self.inner.clone();
        let schedule = self.schedule.clone();
        let stop = Arc::clone(&self.stop);
        dyn_reducer(move |st: &TState, state, value: A| {
            iterate(
                inner.clone(),
                next.clone(),
                schedule.clone(),
                Arc::clone(&stop),
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
fn iterate<A, B, P>(
    inner: Transducer<A, B>,
    next: DynReducer<B>,
    schedule: Schedule,
    stop: Arc<P>,
    st: TState,
    state: StateCell,
    input: A,
    step: u32,
    prev_delay: Option<Duration>,
) -> TResult<StateCell>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    P: Fn(&B) -> bool + Send + Sync + 'static,
{
    match drain(&inner, &st, input.clone()) {
        Drained::Values { mut values, .. } => {
            let last = match values.pop() {
                Some(b) => b,
                None => return TResult::None,
            };
            if stop(&last) {
                return drive(&st, next.step(&st, state, last));
            }
            match schedule.delay_with_jitter(step, prev_delay) {
                Some(delay) => TResult::recursive(move || {
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    iterate(
                        inner,
                        next,
                        schedule,
                        stop,
                        st,
                        state,
                        input,
                        step + 1,
                        Some(delay),
                    )
                }),
                // Budget exhausted: the last run's value is the result.
                None => drive(&st, next.step(&st, state, last)),
            }
        }
        other => emit_drained(&next, &st, state, other),
    }
}

/// Re-invoke `inner` on success until `schedule` is exhausted, then forward
/// the final run's value.
pub fn repeat<A, B>(schedule: Schedule, inner: Transducer<A, B>) -> Transducer<A, B>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
{
    repeat_until(schedule, inner, |_| false)
}

/// Re-invoke on success until `pred` accepts the produced value or the
/// schedule is exhausted, whichever comes first.
pub fn repeat_until<A, B, P>(
    schedule: Schedule,
    inner: Transducer<A, B>,
    pred: P,
) -> Transducer<A, B>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    P: Fn(&B) -> bool + Send + Sync + 'static,
{
    Transducer::from_transform(Repeat {
        inner,
        schedule,
        stop: Arc::new(pred),
        _marker: PhantomData,
    })
}
