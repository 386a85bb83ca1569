//! Paced, predicate-bounded aggregation of upstream sequences.
//!
//! Both folds are fold-then-test: each incoming value is folded into the
//! accumulator first, then the predicate is consulted on the new aggregate.
//! `fold_while` emits once the predicate stops holding, `fold_until` once it
//! starts holding; either way the triggering value is included in the
//! emitted aggregate and the accumulator resets afterwards. The schedule
//! paces emissions and bounds their count.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::schedule::Schedule;
use crate::transducer::{Transducer, Transform};

pub(crate) struct Fold<V, S, F, P> {
    schedule: Schedule,
    init: S,
    folder: Arc<F>,
    pred: Arc<P>,
    emit_when_pred: bool,
    _marker: PhantomData<fn(V)>,
}

impl<V, S, F, P> Transform<V, S> for Fold<V, S, F, P>
where
    V: Clone + Send + 'static,
    S: Clone + Send + Sync + 'static,
    F: Fn(S, V) -> S + Send + Sync + 'static,
    P: Fn(&S, &V) -> bool + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<S>) -> DynReducer<V> {
        let folder = Arc::clone(&self.folder);
        let pred = Arc::clone(&self.pred);
        let init = self.init.clone();
        let schedule = self.schedule.clone();
        let emit_when_pred = self.emit_when_pred;
        // Accumulation is invocation-scoped: the chain is built fresh per
        // invoke, so this slot never leaks across calls.
        let slot = Mutex::new((init.clone(), 0u32));
        dyn_reducer(move |st, state, value: V| {
            let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            let (acc, emissions) = &mut *guard;
            let current = std::mem::replace(acc, init.clone());
            let folded = folder(current, value.clone());
            if pred(&folded, &value) == emit_when_pred {
                let emission = *emissions;
                *emissions += 1;
                drop(guard);
                // The first emission is never schedule-gated; the schedule
                // paces and bounds the ones after it, so attempts(n) means
                // n emissions in total.
                if emission == 0 {
                    return next.step(st, state, folded);
                }
                match schedule.delay_with_jitter(emission - 1, None) {
                    Some(delay) => {
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                        next.step(st, state, folded)
                    }
                    // Emission budget exhausted: the fold stops accepting.
                    None => TResult::Complete(state),
                }
            } else {
                *acc = folded;
                TResult::Continue(state)
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn fold_node<V, S, F, P>(
    schedule: Schedule,
    init: S,
    folder: F,
    pred: P,
    emit_when_pred: bool,
) -> Transducer<V, S>
where
    V: Clone + Send + 'static,
    S: Clone + Send + Sync + 'static,
    F: Fn(S, V) -> S + Send + Sync + 'static,
    P: Fn(&S, &V) -> bool + Send + Sync + 'static,
{
    Transducer::from_transform(Fold {
        schedule,
        init,
        folder: Arc::new(folder),
        pred: Arc::new(pred),
        emit_when_pred,
        _marker: PhantomData,
    })
}

/// Accumulate upstream values while `pred` holds for the aggregate, emitting
/// the aggregate (triggering value included) once it stops holding.
pub fn fold_while<V, S, F, P>(schedule: Schedule, init: S, folder: F, pred: P) -> Transducer<V, S>
where
    V: Clone + Send + 'static,
    S: Clone + Send + Sync + 'static,
    F: Fn(S, V) -> S + Send + Sync + 'static,
    P: Fn(&S, &V) -> bool + Send + Sync + 'static,
{
    fold_node(schedule, init, folder, pred, false)
}

/// Accumulate upstream values until `pred` holds for the aggregate, emitting
/// the aggregate (triggering value included) once it starts holding.
pub fn fold_until<V, S, F, P>(schedule: Schedule, init: S, folder: F, pred: P) -> Transducer<V, S>
where
    V: Clone + Send + 'static,
    S: Clone + Send + Sync + 'static,
    F: Fn(S, V) -> S + Send + Sync + 'static,
    P: Fn(&S, &V) -> bool + Send + Sync + 'static,
{
    fold_node(schedule, init, folder, pred, true)
}
