//! The single execution boundary.
//!
//! `invoke` is the only place a transducer graph runs: it allocates the
//! per-call [`TState`], builds the reducer chain bottom-up from the caller's
//! terminal reducer, drives the trampoline to a terminal result, and
//! guarantees the state is disposed exactly once on every exit path:
//! value, empty, failure, cancellation or escaped panic alike.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::reducer::{last_value, DynReducer, ErasedTerminal, Reducer, StateCell};
use crate::result::TResult;
use crate::state::{PostContext, TState};
use crate::transducer::support::drive;
use crate::transducer::Transducer;

/// Execute `t` against `input`, folding produced values into `init` with
/// `reducer` under cooperative cancellation via `token`.
///
/// The graph is untouched: it can be invoked again, concurrently, with any
/// other state type. Cancellation is observed between trampoline steps and
/// before the first one; an already-cancelled token yields
/// [`TResult::Cancelled`] without running the chain.
///
/// # Example
///
/// ```rust
/// use millrace::reducer::collect;
/// use millrace::{lift, invoke, CancelToken};
///
/// let double = lift(|x: i32| x * 2);
/// let out = invoke(&double, 21, Vec::new(), collect(), CancelToken::new());
/// assert_eq!(out.value(), Some(vec![42]));
/// ```
pub fn invoke<A, B, S, R>(
    t: &Transducer<A, B>,
    input: A,
    init: S,
    reducer: R,
    token: CancelToken,
) -> TResult<S>
where
    A: Send + 'static,
    B: Send + 'static,
    S: Send + 'static,
    R: Reducer<S, B> + 'static,
{
    run(t, input, init, reducer, TState::new(token))
}

/// [`invoke`] with a captured [`PostContext`] for `post` stages to marshal
/// work onto.
pub fn invoke_in<A, B, S, R>(
    t: &Transducer<A, B>,
    input: A,
    init: S,
    reducer: R,
    token: CancelToken,
    context: Arc<dyn PostContext>,
) -> TResult<S>
where
    A: Send + 'static,
    B: Send + 'static,
    S: Send + 'static,
    R: Reducer<S, B> + 'static,
{
    run(t, input, init, reducer, TState::with_context(token, context))
}

/// [`invoke`] collapsed to the last produced value.
///
/// A run that produces nothing yields [`TResult::None`] rather than a value.
pub fn invoke1<A, B>(t: &Transducer<A, B>, input: A, token: CancelToken) -> TResult<B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    match invoke(t, input, None, last_value(), token) {
        TResult::Continue(Some(b)) => TResult::Continue(b),
        TResult::Complete(Some(b)) => TResult::Complete(b),
        TResult::Continue(None) | TResult::Complete(None) | TResult::None => TResult::None,
        TResult::Cancelled => TResult::Cancelled,
        TResult::Fail(e) => TResult::Fail(e),
        TResult::Recursive(_) => TResult::Fail(Error::StateMismatch),
    }
}

fn run<A, B, S, R>(t: &Transducer<A, B>, input: A, init: S, reducer: R, st: TState) -> TResult<S>
where
    A: Send + 'static,
    B: Send + 'static,
    S: Send + 'static,
    R: Reducer<S, B> + 'static,
{
    if st.is_cancelled() {
        st.dispose();
        return TResult::Cancelled;
    }

    let terminal: DynReducer<B> = Arc::new(ErasedTerminal::<S, B, R>::new(reducer));
    let chain = t.reduce_with(terminal);

    let run_state = st.clone();
    let outcome = catch_unwind(AssertUnwindSafe(move || {
        drive(
            &run_state,
            chain.step(&run_state, Box::new(init) as StateCell, input),
        )
    }));

    // The sole disposal point: every exit path above funnels through here.
    st.dispose();

    match outcome {
        Ok(result) => reify::<S>(result),
        Err(payload) => {
            let err = Error::Panic(panic_message(payload).into());
            #[cfg(feature = "tracing")]
            tracing::error!(%err, "panic intercepted at invoke boundary");
            TResult::Fail(err)
        }
    }
}

/// Unbox the erased state cell back into the caller's state type.
fn reify<S: Send + 'static>(result: TResult<StateCell>) -> TResult<S> {
    match result {
        TResult::Continue(cell) => unbox(cell, TResult::Continue),
        TResult::Complete(cell) => unbox(cell, TResult::Complete),
        TResult::None => TResult::None,
        TResult::Cancelled => TResult::Cancelled,
        TResult::Fail(e) => TResult::Fail(e),
        // drive never returns Recursive; kept total rather than asserted.
        TResult::Recursive(_) => TResult::Fail(Error::StateMismatch),
    }
}

fn unbox<S: 'static>(cell: StateCell, wrap: fn(S) -> TResult<S>) -> TResult<S> {
    match cell.downcast::<S>() {
        Ok(state) => wrap(*state),
        Err(_) => TResult::Fail(Error::StateMismatch),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::{collect, count};
    use crate::transducer::{fail, identity, lift};

    #[test]
    fn invoke_folds_with_the_terminal_reducer() {
        let t = lift(|x: i32| x + 1);
        let out = invoke(&t, 1, Vec::new(), collect(), CancelToken::new());
        assert_eq!(out.value(), Some(vec![2]));
    }

    #[test]
    fn invoke1_collapses_to_last_value() {
        let t = lift(|x: i32| x * 10);
        assert_eq!(invoke1(&t, 4, CancelToken::new()).value(), Some(40));
    }

    #[test]
    fn invoke1_of_filtered_out_input_is_none() {
        let t = identity::<i32>().filter(|_| false);
        assert!(invoke1(&t, 1, CancelToken::new()).is_none());
    }

    #[test]
    fn pre_cancelled_token_short_circuits() {
        let token = CancelToken::new();
        token.cancel();
        let t = lift(|x: i32| x);
        assert!(invoke1(&t, 1, token).is_cancelled());
    }

    #[test]
    fn failure_is_data_not_panic() {
        let t = fail::<i32, i32>("nope");
        let out = invoke(&t, 1, 0usize, count(), CancelToken::new());
        match out {
            TResult::Fail(e) => assert_eq!(e, Error::message("nope")),
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[test]
    fn escaped_panic_becomes_error_panic() {
        let t = lift(|_: i32| -> i32 { panic!("kaboom") });
        let out = invoke1(&t, 1, CancelToken::new());
        match out {
            TResult::Fail(Error::Panic(msg)) => assert!(msg.contains("kaboom")),
            other => panic!("expected Fail(Panic), got {other:?}"),
        }
    }

    #[test]
    fn graph_is_reusable_across_invocations() {
        let t = lift(|x: i32| x + 1);
        for i in 0..4 {
            assert_eq!(invoke1(&t, i, CancelToken::new()).value(), Some(i + 1));
        }
    }
}
