//! Background execution with await/cancel handles.
//!
//! `fork` runs its inner transducer on a dedicated OS thread under a child
//! cancellation token and a fresh resource registry, and emits a [`TFork`]
//! handle downstream. The handle is itself a pair of transducers, so
//! awaiting and cancelling compose like everything else. An await timeout
//! fails only the await; the background work keeps running and a later
//! await can still observe its result.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::Error;
use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::state::TState;
use crate::transducer::support::{drain, Drained};
use crate::transducer::{Transducer, Transform};

/// Handle to a forked computation: a pair of transducers over `()`.
///
/// `awaiting` blocks for the worker's result (replaying it on repeated
/// awaits); `cancel` signals the fork's child token. Both are ordinary
/// transducers and compose into larger graphs.
pub struct TFork<B> {
    cancel: Transducer<(), ()>,
    awaiting: Transducer<(), B>,
}

impl<B> TFork<B> {
    /// Transducer that cancels the forked work when stepped.
    pub fn cancel(&self) -> Transducer<(), ()> {
        self.cancel.clone()
    }

    /// Transducer that awaits the forked result when stepped.
    pub fn awaiting(&self) -> Transducer<(), B> {
        self.awaiting.clone()
    }
}

impl<B> Clone for TFork<B> {
    fn clone(&self) -> Self {
        TFork {
            cancel: self.cancel.clone(),
            awaiting: self.awaiting.clone(),
        }
    }
}

impl<B> std::fmt::Debug for TFork<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TFork").finish_non_exhaustive()
    }
}

/// What the worker thread settled on.
#[derive(Clone)]
enum ForkOutcome<B> {
    Value(B),
    Empty,
    Cancelled,
    Failed(Error),
}

enum AwaitSlot<B> {
    Pending(mpsc::Receiver<ForkOutcome<B>>),
    Done(ForkOutcome<B>),
}

struct AwaitFork<B> {
    slot: Arc<Mutex<AwaitSlot<B>>>,
    timeout: Option<Duration>,
}

impl<B> Transform<(), B> for AwaitFork<B>
where
    B: Clone + Send + 'static,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<()> {
        let slot = Arc::clone(&self.slot);
        let timeout = self.timeout;
        dyn_reducer(move |st, state, _value: ()| {
            let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            let outcome = match &mut *guard {
                AwaitSlot::Done(outcome) => outcome.clone(),
                AwaitSlot::Pending(rx) => match timeout {
                    Some(limit) => match rx.recv_timeout(limit) {
                        Ok(outcome) => outcome,
                        // The slot stays Pending: the work continues and a
                        // later await may still see its result.
                        Err(RecvTimeoutError::Timeout) => {
                            return TResult::Fail(Error::AwaitTimeout(limit))
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            ForkOutcome::Failed(Error::ForkDisconnected)
                        }
                    },
                    None => match rx.recv() {
                        Ok(outcome) => outcome,
                        Err(_) => ForkOutcome::Failed(Error::ForkDisconnected),
                    },
                },
            };
            *guard = AwaitSlot::Done(outcome.clone());
            drop(guard);
            match outcome {
                ForkOutcome::Value(b) => next.step(st, state, b),
                ForkOutcome::Empty => TResult::None,
                ForkOutcome::Cancelled => TResult::Cancelled,
                ForkOutcome::Failed(e) => TResult::Fail(e),
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct CancelFork {
    token: CancelToken,
}

impl Transform<(), ()> for CancelFork {
    fn transform(&self, next: DynReducer<()>) -> DynReducer<()> {
        let token = self.token.clone();
        dyn_reducer(move |st, state, _value: ()| {
            token.cancel();
            next.step(st, state, ())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct Fork<A, B> {
    inner: Transducer<A, B>,
    timeout: Option<Duration>,
    _marker: PhantomData<fn(A, B)>,
}

impl<A, B> Transform<A, TFork<B>> for Fork<A, B>
where
    A: Send + 'static,
    B: Clone + Send + 'static,
{
    fn transform(&self, next: DynReducer<TFork<B>>) -> DynReducer<A> {
        let inner = self.inner.clone();
        let timeout = self.timeout;
        dyn_reducer(move |st: &TState, state, value: A| {
            let child = st.child();
            let token = child.token().clone();
            let (tx, rx) = mpsc::channel();

            let worker_chain = inner.clone();
            let worker_state = child;
            let spawned = thread::Builder::new()
                .name("millrace-fork".into())
                .spawn(move || {
                    let outcome = match drain(&worker_chain, &worker_state, value) {
                        Drained::Values { mut values, .. } => match values.pop() {
                            Some(b) => ForkOutcome::Value(b),
                            None => ForkOutcome::Empty,
                        },
                        Drained::None => ForkOutcome::Empty,
                        Drained::Cancelled => ForkOutcome::Cancelled,
                        Drained::Failed(e) => ForkOutcome::Failed(e),
                    };
                    // The fork owns its registry; sweep before reporting so
                    // the awaiter observes fully-released resources.
                    worker_state.dispose();
                    let _ = tx.send(outcome);
                });
            if let Err(e) = spawned {
                return TResult::Fail(Error::message(format!(
                    "failed to spawn fork worker: {e}"
                )));
            }

            let handle = TFork {
                cancel: Transducer::from_transform(CancelFork { token }),
                awaiting: Transducer::from_transform(AwaitFork {
                    slot: Arc::new(Mutex::new(AwaitSlot::Pending(rx))),
                    timeout,
                }),
            };
            next.step(st, state, handle)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Run `inner` on a background thread per input, emitting a [`TFork`]
/// handle. `timeout` bounds each await; `None` awaits indefinitely.
pub fn fork<A, B>(inner: Transducer<A, B>, timeout: Option<Duration>) -> Transducer<A, TFork<B>>
where
    A: Send + 'static,
    B: Clone + Send + 'static,
{
    Transducer::from_transform(Fork {
        inner,
        timeout,
        _marker: PhantomData,
    })
}
