//! Tracked resource acquisition and early release.
//!
//! Every resource produced by the inner transducer is registered with the
//! run's [`TState`] together with its disposer. Disposal fires exactly once:
//! either through an explicit [`release`] stage or during the end-of-run
//! sweep, whichever comes first.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::transducer::support::{drain, drive, Drained};
use crate::transducer::{Transducer, Transform};

pub(crate) struct UseResource<A, R, D> {
    inner: Transducer<A, R>,
    dispose: Arc<D>,
    _marker: PhantomData<fn(A)>,
}

impl<A, R, D> Transform<A, Arc<R>> for UseResource<A, R, D>
where
    A: Send + 'static,
    R: Send + Sync + 'static,
    D: Fn(&R) + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<Arc<R>>) -> DynReducer<A> {
        let inner = self.inner.clone();
        let dispose = Arc::clone(&self.dispose);
        dyn_reducer(move |st, state, value: A| {
            let (resources, complete) = match drain(&inner, st, value) {
                Drained::Values { values, complete } => (values, complete),
                Drained::None => return TResult::None,
                Drained::Cancelled => return TResult::Cancelled,
                Drained::Failed(e) => return TResult::Fail(e),
            };
            let mut state = state;
            for raw in resources {
                if st.is_cancelled() {
                    return TResult::Cancelled;
                }
                let resource = Arc::new(raw);
                let d = Arc::clone(&dispose);
                // Registered before downstream sees it, so a failing
                // downstream still gets the disposer swept.
                st.acquire(&resource, move |r| d(r));
                match drive(st, next.step(st, state, resource)) {
                    TResult::Continue(s) => state = s,
                    other => return other,
                }
            }
            if complete {
                TResult::Complete(state)
            } else {
                TResult::Continue(state)
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Track each resource the inner transducer produces, attaching `dispose` to
/// run at most once: on explicit [`release`] or at end of run.
pub fn use_resource<A, R, D>(inner: Transducer<A, R>, dispose: D) -> Transducer<A, Arc<R>>
where
    A: Send + 'static,
    R: Send + Sync + 'static,
    D: Fn(&R) + Send + Sync + 'static,
{
    Transducer::from_transform(UseResource {
        inner,
        dispose: Arc::new(dispose),
        _marker: PhantomData,
    })
}

pub(crate) struct Release<R> {
    _marker: PhantomData<fn(R)>,
}

impl<R> Transform<Arc<R>, ()> for Release<R>
where
    R: Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<()>) -> DynReducer<Arc<R>> {
        dyn_reducer(move |st, state, resource: Arc<R>| {
            // An already-released (or never-tracked) resource is a no-op;
            // the end-of-run sweep is unaffected either way.
            st.release(&resource);
            next.step(st, state, ())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Eagerly dispose a tracked resource, removing it from the end-of-run
/// sweep. Releasing an untracked resource is a no-op.
pub fn release<R>() -> Transducer<Arc<R>, ()>
where
    R: Send + Sync + 'static,
{
    Transducer::from_transform(Release {
        _marker: PhantomData,
    })
}
