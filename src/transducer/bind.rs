//! Monadic continuation: re-run a derived graph against the original input.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::state::TState;
use crate::transducer::{Transducer, Transform};

pub(crate) struct Bind<A, B, C, F> {
    inner: Transducer<A, B>,
    f: Arc<F>,
    _marker: PhantomData<fn(C)>,
}

impl<A, B, C, F> Transform<A, C> for Bind<A, B, C, F>
where
    A: Clone + Send + Sync + 'static,
    B: Send + 'static,
    C: Send + 'static,
    F: Fn(B) -> Transducer<A, C> + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<C>) -> DynReducer<A> {
        let inner = self.inner.clone();
        let f = Arc::clone(&self.f);
        dyn_reducer(move |st: &TState, state, value: A| {
            let f = Arc::clone(&f);
            let next = next.clone();
            let original = value.clone();
            // For each value the inner chain produces, derive a continuation
            // and re-run it against the input that produced it. The outer
            // graph is never re-derived. The re-run is deferred so that a
            // continuation which binds again unwinds on the trampoline
            // instead of the call stack.
            let bridge = dyn_reducer(move |st2: &TState, inner_state, produced: B| {
                let continuation = f(produced);
                let chain = continuation.reduce_with(next.clone());
                let st2 = st2.clone();
                let input = original.clone();
                TResult::recursive(move || chain.step(&st2, inner_state, input))
            });
            inner.reduce_with(bridge).step(st, state, value)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// For each value `inner` produces, derive a continuation transducer with
/// `f` and re-run it against the same input.
pub fn bind<A, B, C, F>(inner: Transducer<A, B>, f: F) -> Transducer<A, C>
where
    A: Clone + Send + Sync + 'static,
    B: Send + 'static,
    C: Send + 'static,
    F: Fn(B) -> Transducer<A, C> + Send + Sync + 'static,
{
    Transducer::from_transform(Bind {
        inner,
        f: Arc::new(f),
        _marker: PhantomData,
    })
}

/// Collapse a transducer-producing transducer by re-running each produced
/// graph against the original input.
pub fn flatten<A, B>(t: Transducer<A, Transducer<A, B>>) -> Transducer<A, B>
where
    A: Clone + Send + Sync + 'static,
    B: Send + 'static,
{
    bind(t, |inner| inner)
}
