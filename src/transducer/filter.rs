//! Predicate-guarded forwarding.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::transducer::{Transducer, Transform};

pub(crate) struct Filter<B, P> {
    pred: Arc<P>,
    _marker: PhantomData<fn(B)>,
}

impl<B, P> Transform<B, B> for Filter<B, P>
where
    B: Send + 'static,
    P: Fn(&B) -> bool + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<B> {
        let pred = Arc::clone(&self.pred);
        dyn_reducer(move |st, state, value: B| {
            if pred(&value) {
                next.step(st, state, value)
            } else {
                // A failing predicate continues without forwarding; it never
                // ends the pipeline.
                TResult::Continue(state)
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Forward only values satisfying `pred`.
pub fn filter<B, P>(pred: P) -> Transducer<B, B>
where
    B: Send + 'static,
    P: Fn(&B) -> bool + Send + Sync + 'static,
{
    Transducer::from_transform(Filter {
        pred: Arc::new(pred),
        _marker: PhantomData,
    })
}
