//! Cross-context marshalling.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::mpsc;

use crate::error::Error;
use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::state::TState;
use crate::transducer::support::{drain, emit_drained};
use crate::transducer::{Transducer, Transform};

pub(crate) struct Post<A, B> {
    inner: Transducer<A, B>,
    _marker: PhantomData<fn(A, B)>,
}

impl<A, B> Transform<A, B> for Post<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<A> {
        let inner = self.inner.clone();
        dyn_reducer(move |st: &TState, state, value: A| {
            let context = match st.context() {
                Some(ctx) => ctx,
                // No captured context: run inline, same semantics.
                None => return emit_drained(&next, st, state, drain(&inner, st, value)),
            };
            let (tx, rx) = mpsc::channel();
            let job_chain = inner.clone();
            let job_state = st.clone();
            context.post(Box::new(move || {
                let _ = tx.send(drain(&job_chain, &job_state, value));
            }));
            match rx.recv() {
                Ok(drained) => emit_drained(&next, st, state, drained),
                // The context dropped the job without running it.
                Err(_) => TResult::Fail(Error::PostAbandoned),
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Run `inner` on the invocation's captured [`PostContext`](crate::PostContext)
/// and marshal the result back to the calling thread. Emission downstream
/// happens on the caller's side; with no captured context the inner chain
/// runs inline.
pub fn post<A, B>(inner: Transducer<A, B>) -> Transducer<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    Transducer::from_transform(Post {
        inner,
        _marker: PhantomData,
    })
}
