//! Shared plumbing for control combinators.
//!
//! Retry, repeat, choice, zip and friends all isolate an inner run: the
//! inner chain is driven to a terminal result against a private collector,
//! then the surviving values are re-emitted downstream with the real
//! invocation state. [`drain`] performs the isolated run, [`emit_all`]
//! re-emits, and [`drive`] is the trampoline loop both share with the
//! invoke driver.

use crate::error::Error;
use crate::reducer::{dyn_reducer, DynReducer, StateCell};
use crate::result::TResult;
use crate::state::TState;
use crate::transducer::Transducer;

/// Terminal-only view of an isolated inner run.
pub(crate) enum Drained<B> {
    /// The run ended in `Continue` or `Complete`; `values` may be empty.
    Values {
        values: Vec<B>,
        complete: bool,
    },
    /// The run ended in an explicit empty result.
    None,
    Cancelled,
    Failed(Error),
}

/// Unwind deferred steps until a terminal variant, checking cancellation
/// before every step. Call-stack depth stays O(1) regardless of how many
/// steps the chain defers.
pub(crate) fn drive<T: Send + 'static>(st: &TState, mut result: TResult<T>) -> TResult<T> {
    loop {
        match result {
            TResult::Recursive(step) => {
                if st.is_cancelled() {
                    return TResult::Cancelled;
                }
                result = step.run();
            }
            terminal => return terminal,
        }
    }
}

/// Run `t` against `input` in isolation, collecting every produced value.
pub(crate) fn drain<A, B>(t: &Transducer<A, B>, st: &TState, input: A) -> Drained<B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    let collector: DynReducer<B> = dyn_reducer(|_st, cell: StateCell, value: B| {
        match cell.downcast::<Vec<B>>() {
            Ok(mut values) => {
                values.push(value);
                TResult::Continue(values as StateCell)
            }
            Err(_) => TResult::Fail(Error::StateMismatch),
        }
    });
    let chain = t.reduce_with(collector);
    let first = chain.step(st, Box::new(Vec::<B>::new()), input);
    match drive(st, first) {
        TResult::Continue(cell) => unpack(cell, false),
        TResult::Complete(cell) => unpack(cell, true),
        TResult::None => Drained::None,
        TResult::Cancelled => Drained::Cancelled,
        TResult::Fail(e) => Drained::Failed(e),
        TResult::Recursive(_) => Drained::Failed(Error::StateMismatch),
    }
}

fn unpack<B: 'static>(cell: StateCell, complete: bool) -> Drained<B> {
    match cell.downcast::<Vec<B>>() {
        Ok(values) => Drained::Values {
            values: *values,
            complete,
        },
        Err(_) => Drained::Failed(Error::StateMismatch),
    }
}

/// Feed `values` downstream strictly in sequence: each value, including any
/// deferred steps it triggers, fully resolves before the next is considered.
pub(crate) fn emit_all<B>(
    next: &DynReducer<B>,
    st: &TState,
    mut state: StateCell,
    values: Vec<B>,
) -> TResult<StateCell>
where
    B: Send + 'static,
{
    for value in values {
        if st.is_cancelled() {
            return TResult::Cancelled;
        }
        match drive(st, next.step(st, state, value)) {
            TResult::Continue(s) => state = s,
            terminal => return terminal,
        }
    }
    TResult::Continue(state)
}

/// Re-emit an isolated run downstream, preserving its terminal variant.
pub(crate) fn emit_drained<B>(
    next: &DynReducer<B>,
    st: &TState,
    state: StateCell,
    drained: Drained<B>,
) -> TResult<StateCell>
where
    B: Send + 'static,
{
    match drained {
        Drained::Values { values, complete } => match emit_all(next, st, state, values) {
            TResult::Continue(s) if complete => TResult::Complete(s),
            other => other,
        },
        Drained::None => TResult::None,
        Drained::Cancelled => TResult::Cancelled,
        Drained::Failed(e) => TResult::Fail(e),
    }
}
