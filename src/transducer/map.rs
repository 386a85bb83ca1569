//! Lift a plain function into the graph.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::reducer::{dyn_reducer, DynReducer};
use crate::transducer::{Transducer, Transform};

pub(crate) struct Map<A, B, F> {
    f: Arc<F>,
    _marker: PhantomData<fn(A) -> B>,
}

impl<A, B, F> Transform<A, B> for Map<A, B, F>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<A> {
        let f = Arc::clone(&self.f);
        dyn_reducer(move |st, state, value: A| next.step(st, state, f(value)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lift a pure function into a transducer: the downstream reducer receives
/// the pre-mapped value.
///
/// # Example
///
/// ```rust
/// use millrace::{lift, invoke1, CancelToken};
///
/// let double = lift(|x: i32| x * 2);
/// assert_eq!(invoke1(&double, 21, CancelToken::new()).value(), Some(42));
/// ```
pub fn lift<A, B, F>(f: F) -> Transducer<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    Transducer::from_transform(Map {
        f: Arc::new(f),
        _marker: PhantomData,
    })
}
