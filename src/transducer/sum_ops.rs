//! Sum-aware filtering and binding.
//!
//! The composition rule from [`Sum`]: `Left` is forwarded untouched, and
//! only `Right` is subject to transformation, applied here before the
//! predicate or continuation function is ever invoked.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::state::TState;
use crate::sum::Sum;
use crate::transducer::{Transducer, Transform};

pub(crate) struct FilterSum<X, B, P> {
    pred: Arc<P>,
    _marker: PhantomData<fn(X, B)>,
}

impl<X, B, P> Transform<Sum<X, B>, Sum<X, B>> for FilterSum<X, B, P>
where
    X: Send + 'static,
    B: Send + 'static,
    P: Fn(&B) -> bool + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<Sum<X, B>>) -> DynReducer<Sum<X, B>> {
        let pred = Arc::clone(&self.pred);
        dyn_reducer(move |st, state, value: Sum<X, B>| match value {
            Sum::Left(x) => next.step(st, state, Sum::Left(x)),
            Sum::Right(b) => {
                if pred(&b) {
                    next.step(st, state, Sum::Right(b))
                } else {
                    TResult::Continue(state)
                }
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Filter the `Right` channel; `Left` passes through unexamined.
pub fn filter_sum<X, B, P>(pred: P) -> Transducer<Sum<X, B>, Sum<X, B>>
where
    X: Send + 'static,
    B: Send + 'static,
    P: Fn(&B) -> bool + Send + Sync + 'static,
{
    Transducer::from_transform(FilterSum {
        pred: Arc::new(pred),
        _marker: PhantomData,
    })
}

pub(crate) struct BindSum<A, X, B, C, F> {
    inner: Transducer<A, Sum<X, B>>,
    f: Arc<F>,
    _marker: PhantomData<fn(C)>,
}

impl<A, X, B, C, F> Transform<A, Sum<X, C>> for BindSum<A, X, B, C, F>
where
    A: Clone + Send + Sync + 'static,
    X: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    F: Fn(B) -> Transducer<A, Sum<X, C>> + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<Sum<X, C>>) -> DynReducer<A> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        dyn_reducer(move |st: &TState, state, value: A| {
            let f = Arc::clone(&f);
            let next = next.clone();
            let original = value.clone();
            let bridge = dyn_reducer(move |st2: &TState, inner_state, produced: Sum<X, B>| {
                match produced {
                    // Left never reaches the continuation function.
                    Sum::Left(x) => next.step(st2, inner_state, Sum::Left(x)),
                    Sum::Right(b) => {
                        // Deferred, as in `bind`: recursive continuations
                        // unwind on the trampoline.
                        let continuation = f(b);
                        let chain = continuation.reduce_with(next.clone());
                        let st2 = st2.clone();
                        let input = original.clone();
                        TResult::recursive(move || chain.step(&st2, inner_state, input))
                    }
                }
            });
            inner.reduce_with(bridge).step(st, state, value)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Bind over the `Right` channel, re-running the continuation against the
/// original input; `Left` is forwarded untouched.
pub fn bind_sum<A, X, B, C, F>(inner: Transducer<A, Sum<X, B>>, f: F) -> Transducer<A, Sum<X, C>>
where
    A: Clone + Send + Sync + 'static,
    X: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    F: Fn(B) -> Transducer<A, Sum<X, C>> + Send + Sync + 'static,
{
    Transducer::from_transform(BindSum {
        inner,
        f: Arc::new(f),
        _marker: PhantomData,
    })
}
