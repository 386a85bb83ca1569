//! The universal consumer interface every transducer targets.
//!
//! A [`Reducer`] folds one value into running state and reports how the
//! chain proceeds via a [`TResult`]. Callers hand a terminal reducer to
//! [`invoke`](crate::invoke); combinators build their internal reducers by
//! wrapping the downstream one.
//!
//! Internally the chain threads a type-erased state cell so the immutable
//! transducer graph stays independent of any particular state type; only the
//! invoke boundary boxes and unboxes the caller's state. No combinator ever
//! inspects the cell.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::Error;
use crate::result::TResult;
use crate::state::TState;

/// Folds one value into running state.
///
/// Implementations must be pure with respect to the chain: failure is
/// reported as [`TResult::Fail`], never by panicking.
pub trait Reducer<S, A>: Send + Sync {
    /// Fold `value` into `state`, reporting how the chain proceeds.
    fn step(&self, ctx: &TState, state: S, value: A) -> TResult<S>;
}

/// Shared reducer handle, the form combinators pass downstream.
pub type ArcReducer<S, A> = Arc<dyn Reducer<S, A>>;

/// Type-erased state threaded through internal chains.
pub(crate) type StateCell = Box<dyn Any + Send>;

/// Internal reducer form: the caller's state type is erased into a cell.
pub(crate) type DynReducer<A> = ArcReducer<StateCell, A>;

/// Closure adapter for [`Reducer`].
pub struct FnReducer<F> {
    f: F,
}

impl<F> FnReducer<F> {
    /// Wrap a step closure.
    pub fn new(f: F) -> Self {
        FnReducer { f }
    }
}

impl<F> std::fmt::Debug for FnReducer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnReducer").field("f", &"<closure>").finish()
    }
}

impl<S, A, F> Reducer<S, A> for FnReducer<F>
where
    F: Fn(&TState, S, A) -> TResult<S> + Send + Sync,
{
    fn step(&self, ctx: &TState, state: S, value: A) -> TResult<S> {
        (self.f)(ctx, state, value)
    }
}

/// Build a reducer from a step closure.
///
/// # Example
///
/// ```rust
/// use millrace::reducer::from_fn;
/// use millrace::{lift, invoke, CancelToken, TResult};
///
/// let sum = from_fn(|_ctx, acc: i64, v: i64| TResult::Continue(acc + v));
/// let r = invoke(&lift(|x: i64| x * 2), 21, 0i64, sum, CancelToken::new());
/// assert_eq!(r.value(), Some(42));
/// ```
pub fn from_fn<S, A, F>(f: F) -> FnReducer<F>
where
    F: Fn(&TState, S, A) -> TResult<S> + Send + Sync,
{
    FnReducer::new(f)
}

/// Terminal reducer: last value wins, into `Option<A>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastValue;

impl<A: Send + 'static> Reducer<Option<A>, A> for LastValue {
    fn step(&self, _ctx: &TState, _state: Option<A>, value: A) -> TResult<Option<A>> {
        TResult::Continue(Some(value))
    }
}

/// Terminal reducer collapsing a produced sequence to its last value.
pub fn last_value() -> LastValue {
    LastValue
}

/// Terminal reducer: accumulate every produced value into a `Vec`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collect;

impl<A: Send + 'static> Reducer<Vec<A>, A> for Collect {
    fn step(&self, _ctx: &TState, mut state: Vec<A>, value: A) -> TResult<Vec<A>> {
        state.push(value);
        TResult::Continue(state)
    }
}

/// Terminal reducer accumulating produced values in order.
pub fn collect() -> Collect {
    Collect
}

/// Terminal reducer: count produced values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl<A: Send + 'static> Reducer<usize, A> for Count {
    fn step(&self, _ctx: &TState, state: usize, _value: A) -> TResult<usize> {
        TResult::Continue(state + 1)
    }
}

/// Terminal reducer counting produced values.
pub fn count() -> Count {
    Count
}

/// Arc a step closure into the internal erased-reducer form.
pub(crate) fn dyn_reducer<A>(
    f: impl Fn(&TState, StateCell, A) -> TResult<StateCell> + Send + Sync + 'static,
) -> DynReducer<A> {
    Arc::new(FnReducer::new(f))
}

/// Adapter placed at the bottom of every chain: unboxes the caller's state,
/// runs the terminal reducer, boxes the state back up.
pub(crate) struct ErasedTerminal<S, A, R> {
    inner: R,
    _marker: PhantomData<fn(S, A)>,
}

impl<S, A, R> ErasedTerminal<S, A, R> {
    pub(crate) fn new(inner: R) -> Self {
        ErasedTerminal {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<S, A, R> Reducer<StateCell, A> for ErasedTerminal<S, A, R>
where
    S: Send + 'static,
    A: Send + 'static,
    R: Reducer<S, A>,
{
    fn step(&self, ctx: &TState, state: StateCell, value: A) -> TResult<StateCell> {
        match state.downcast::<S>() {
            Ok(state) => self
                .inner
                .step(ctx, *state, value)
                .map(|s| Box::new(s) as StateCell),
            Err(_) => TResult::Fail(Error::StateMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;

    fn ctx() -> TState {
        TState::new(CancelToken::new())
    }

    #[test]
    fn last_value_keeps_latest() {
        let r = last_value();
        let st = ctx();
        let s = r.step(&st, None, 1).value().flatten();
        assert_eq!(s, Some(1));
        let s = r.step(&st, Some(1), 2).value().flatten();
        assert_eq!(s, Some(2));
    }

    #[test]
    fn collect_accumulates_in_order() {
        let r = collect();
        let st = ctx();
        let s = r.step(&st, vec![1], 2).value().unwrap_or_default();
        assert_eq!(s, vec![1, 2]);
    }

    #[test]
    fn count_counts() {
        let r = count();
        let st = ctx();
        assert_eq!(r.step(&st, 3, "anything").value(), Some(4));
    }

    #[test]
    fn erased_terminal_round_trips_state() {
        let st = ctx();
        let erased = ErasedTerminal::<i32, i32, _>::new(from_fn(|_, s: i32, v: i32| {
            TResult::Continue(s + v)
        }));
        let out = erased.step(&st, Box::new(40i32), 2);
        let cell = out.value().expect("value");
        assert_eq!(*cell.downcast::<i32>().expect("i32 state"), 42);
    }

    #[test]
    fn erased_terminal_rejects_foreign_state() {
        let st = ctx();
        let erased =
            ErasedTerminal::<i32, i32, _>::new(from_fn(|_, s: i32, _v: i32| TResult::Continue(s)));
        let out = erased.step(&st, Box::new("not an i32"), 1);
        assert!(out.is_fail());
    }
}
