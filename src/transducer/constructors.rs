//! Leaf transducers: the starting points of every graph.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::Error;
use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::sum::Sum;
use crate::transducer::{lift, Transducer, Transform};

pub(crate) struct Identity<A> {
    _marker: PhantomData<fn(A)>,
}

impl<A: Send + 'static> Transform<A, A> for Identity<A> {
    fn transform(&self, next: DynReducer<A>) -> DynReducer<A> {
        next
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The identity transducer: forwards every value untouched.
///
/// Structural identity of composition: `identity().then(t)` and
/// `t.then(identity())` reduce exactly as `t`.
pub fn identity<A: Send + 'static>() -> Transducer<A, A> {
    Transducer::from_transform(Identity {
        _marker: PhantomData,
    })
}

/// Produce `value` for every input, ignoring the input itself.
pub fn constant<A, B>(value: B) -> Transducer<A, B>
where
    A: Send + 'static,
    B: Clone + Send + Sync + 'static,
{
    lift(move |_| value.clone())
}

pub(crate) struct Fail<A, B> {
    error: Error,
    _marker: PhantomData<fn(A) -> B>,
}

impl<A, B> Transform<A, B> for Fail<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    fn transform(&self, _next: DynReducer<B>) -> DynReducer<A> {
        let error = self.error.clone();
        dyn_reducer(move |_st, _state, _value: A| TResult::Fail(error.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A transducer that fails every input with `error`.
///
/// This is how combinators signal failure explicitly: failure is data in the
/// chain, never a panic.
pub fn fail<A, B>(error: impl Into<Error>) -> Transducer<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    Transducer::from_transform(Fail {
        error: error.into(),
        _marker: PhantomData,
    })
}

pub(crate) struct LiftResult<A, B, F> {
    f: Arc<F>,
    _marker: PhantomData<fn(A) -> B>,
}

impl<A, B, F> Transform<A, B> for LiftResult<A, B, F>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> Result<B, Error> + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<A> {
        let f = Arc::clone(&self.f);
        dyn_reducer(move |st, state, value: A| match f(value) {
            Ok(produced) => next.step(st, state, produced),
            Err(e) => TResult::Fail(e),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lift a fallible function: `Err` becomes a data-carried failure.
pub fn lift_result<A, B, F>(f: F) -> Transducer<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> Result<B, Error> + Send + Sync + 'static,
{
    Transducer::from_transform(LiftResult {
        f: Arc::new(f),
        _marker: PhantomData,
    })
}

/// Lift a function producing a [`Sum`], routing it into the two-channel
/// pipeline form the Sum-aware combinators consume.
pub fn lift_sum<A, X, B, F>(f: F) -> Transducer<A, Sum<X, B>>
where
    A: Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> Sum<X, B> + Send + Sync + 'static,
{
    lift(f)
}

pub(crate) struct EmitEach<I, A> {
    _marker: PhantomData<fn(I) -> A>,
}

impl<I, A> Transform<I, A> for EmitEach<I, A>
where
    I: IntoIterator<Item = A> + Send + 'static,
    A: Send + 'static,
{
    fn transform(&self, next: DynReducer<A>) -> DynReducer<I> {
        dyn_reducer(move |st, state, input: I| {
            crate::transducer::support::emit_all(&next, st, state, input.into_iter().collect())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Fan an iterable input out element by element, strictly in order. Each
/// element fully resolves downstream before the next is considered.
///
/// # Example
///
/// ```rust
/// use millrace::{emit_each, invoke, CancelToken};
/// use millrace::reducer::collect;
///
/// let each = emit_each::<Vec<i32>, i32>().map(|x| x * 2);
/// let out = invoke(&each, vec![1, 2, 3], Vec::new(), collect(), CancelToken::new());
/// assert_eq!(out.value(), Some(vec![2, 4, 6]));
/// ```
pub fn emit_each<I, A>() -> Transducer<I, A>
where
    I: IntoIterator<Item = A> + Send + 'static,
    A: Send + 'static,
{
    Transducer::from_transform(EmitEach {
        _marker: PhantomData,
    })
}

pub(crate) struct FromAsync<A, B, F> {
    f: Arc<F>,
    _marker: PhantomData<fn(A) -> B>,
}

impl<A, B, F, Fut> Transform<A, B> for FromAsync<A, B, F>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<B, Error>> + Send,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<A> {
        let f = Arc::clone(&self.f);
        dyn_reducer(move |st, state, value: A| {
            // An async-lifted leaf is a suspension point: the reduction
            // blocks here until the future resolves.
            match futures::executor::block_on(f(value)) {
                Ok(produced) => next.step(st, state, produced),
                Err(e) => TResult::Fail(e),
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lift an async computation as a leaf. The reduction suspends on it; the
/// rest of the chain stays synchronous and strictly sequential.
///
/// # Example
///
/// ```rust
/// use millrace::{from_async, invoke1, CancelToken};
///
/// let fetch = from_async(|x: i32| async move { Ok(x * 2) });
/// assert_eq!(invoke1(&fetch, 21, CancelToken::new()).value(), Some(42));
/// ```
pub fn from_async<A, B, F, Fut>(f: F) -> Transducer<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<B, Error>> + Send + 'static,
{
    Transducer::from_transform(FromAsync {
        f: Arc::new(f),
        _marker: PhantomData,
    })
}
