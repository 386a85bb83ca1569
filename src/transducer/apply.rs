//! Applicative combination of a function-producing and an argument-producing
//! transducer over the same input.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::sum::Sum;
use crate::transducer::support::{drain, drive, Drained};
use crate::transducer::{Transducer, Transform};

/// Shared function value, the shape `apply` expects from its function side.
pub type SharedFn<A, B> = Arc<dyn Fn(A) -> B + Send + Sync>;

pub(crate) struct Apply<A, B, C> {
    func: Transducer<A, SharedFn<B, C>>,
    arg: Transducer<A, B>,
    _marker: PhantomData<fn(C)>,
}

impl<A, B, C> Transform<A, C> for Apply<A, B, C>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    fn transform(&self, next: DynReducer<C>) -> DynReducer<A> {
        let func = self.func.clone();
        let arg = self.arg.clone();
        dyn_reducer(move |st, state, value: A| {
            // The function side runs first and fails fast; the argument side
            // is only consulted once a function value exists.
            let f = match drain(&func, st, value.clone()) {
                Drained::Values { values, .. } => match values.into_iter().last() {
                    Some(f) => f,
                    None => return TResult::Continue(state),
                },
                Drained::None => return TResult::Continue(state),
                Drained::Cancelled => return TResult::Cancelled,
                Drained::Failed(e) => return TResult::Fail(e),
            };
            match drain(&arg, st, value) {
                Drained::Values { values, .. } => match values.into_iter().last() {
                    Some(b) => drive(st, next.step(st, state, f(b))),
                    None => TResult::Continue(state),
                },
                Drained::None => TResult::Continue(state),
                Drained::Cancelled => TResult::Cancelled,
                Drained::Failed(e) => TResult::Fail(e),
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Apply the function produced by `func` to the value produced by `arg`,
/// both evaluated against the same input. Nothing is forwarded until both
/// sides have produced a value.
pub fn apply<A, B, C>(func: Transducer<A, SharedFn<B, C>>, arg: Transducer<A, B>) -> Transducer<A, C>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    Transducer::from_transform(Apply {
        func,
        arg,
        _marker: PhantomData,
    })
}

pub(crate) struct ApplySum<A, X, B, C> {
    func: Transducer<A, Sum<X, SharedFn<B, C>>>,
    arg: Transducer<A, Sum<X, B>>,
    _marker: PhantomData<fn(C)>,
}

impl<A, X, B, C> Transform<A, Sum<X, C>> for ApplySum<A, X, B, C>
where
    A: Clone + Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    fn transform(&self, next: DynReducer<Sum<X, C>>) -> DynReducer<A> {
        let func = self.func.clone();
        let arg = self.arg.clone();
        dyn_reducer(move |st, state, value: A| {
            // Left short-circuits before the function or argument is used.
            let f = match drain(&func, st, value.clone()) {
                Drained::Values { values, .. } => match values.into_iter().last() {
                    Some(Sum::Right(f)) => f,
                    Some(Sum::Left(x)) => return drive(st, next.step(st, state, Sum::Left(x))),
                    None => return TResult::Continue(state),
                },
                Drained::None => return TResult::Continue(state),
                Drained::Cancelled => return TResult::Cancelled,
                Drained::Failed(e) => return TResult::Fail(e),
            };
            match drain(&arg, st, value) {
                Drained::Values { values, .. } => match values.into_iter().last() {
                    Some(Sum::Right(b)) => drive(st, next.step(st, state, Sum::Right(f(b)))),
                    Some(Sum::Left(x)) => drive(st, next.step(st, state, Sum::Left(x))),
                    None => TResult::Continue(state),
                },
                Drained::None => TResult::Continue(state),
                Drained::Cancelled => TResult::Cancelled,
                Drained::Failed(e) => TResult::Fail(e),
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Sum-aware [`apply`]: a `Left` from either side is forwarded untouched
/// before the function is ever invoked.
pub fn apply_sum<A, X, B, C>(
    func: Transducer<A, Sum<X, SharedFn<B, C>>>,
    arg: Transducer<A, Sum<X, B>>,
) -> Transducer<A, Sum<X, C>>
where
    A: Clone + Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    Transducer::from_transform(ApplySum {
        func,
        arg,
        _marker: PhantomData,
    })
}
