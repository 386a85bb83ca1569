//! Failure interception and recovery.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::Error;
use crate::reducer::{dyn_reducer, DynReducer};
use crate::transducer::support::{drain, emit_drained, Drained};
use crate::transducer::{Transducer, Transform};

pub(crate) struct TryCatch<A, B, P> {
    inner: Transducer<A, B>,
    matches: Arc<P>,
    handler: Transducer<Error, B>,
    _marker: PhantomData<fn(A)>,
}

impl<A, B, P> Transform<A, B> for TryCatch<A, B, P>
where
    A: Send + 'static,
    B: Send + 'static,
    P: Fn(&Error) -> bool + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<A> {
        let inner = self.inner.clone();
        let matches = Arc::clone(&self.matches);
        let handler = self.handler.clone();
        dyn_reducer(move |st, state, value: A| {
            match drain(&inner, st, value) {
                // Only failures the predicate accepts reach the handler;
                // everything else, cancellation included, passes through.
                Drained::Failed(error) if matches(&error) => {
                    emit_drained(&next, st, state, drain(&handler, st, error))
                }
                other => emit_drained(&next, st, state, other),
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Intercept failures of `inner` matching `pred` and recover by running
/// `handler` with the error as input. A failing handler fails the run with
/// the handler's error.
pub fn try_catch<A, B, P>(
    inner: Transducer<A, B>,
    pred: P,
    handler: Transducer<Error, B>,
) -> Transducer<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
    P: Fn(&Error) -> bool + Send + Sync + 'static,
{
    Transducer::from_transform(TryCatch {
        inner,
        matches: Arc::new(pred),
        handler,
        _marker: PhantomData,
    })
}
