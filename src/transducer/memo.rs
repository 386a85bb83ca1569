//! Single-slot memoization of an inner run.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use crate::reducer::{dyn_reducer, DynReducer};
use crate::transducer::support::{emit_drained, Drained};
use crate::transducer::{Transducer, Transform};

type Slot<A, B> = Arc<Mutex<Option<(A, Vec<B>, bool)>>>;

pub(crate) struct Memo<A, B> {
    inner: Transducer<A, B>,
    // Owned by the node, not the built chain, so the cache survives
    // across invokes of any graph sharing this node.
    cache: Slot<A, B>,
}

impl<A, B> Transform<A, B> for Memo<A, B>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    fn transform(&self, next: DynReducer<B>) -> DynReducer<A> {
        let inner = self.inner.clone();
        let cache = Arc::clone(&self.cache);
        dyn_reducer(move |st, state, value: A| {
            let hit = {
                let guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
                guard
                    .as_ref()
                    .filter(|(key, _, _)| *key == value)
                    .map(|(_, values, complete)| (values.clone(), *complete))
            };
            if let Some((values, complete)) = hit {
                return emit_drained(&next, st, state, Drained::Values { values, complete });
            }
            match crate::transducer::support::drain(&inner, st, value.clone()) {
                // Only settled runs are cached; None, Cancelled and Failed
                // pass through and leave the slot untouched.
                Drained::Values { values, complete } => {
                    let mut guard = cache.lock().unwrap_or_else(PoisonError::into_inner);
                    *guard = Some((value, values.clone(), complete));
                    drop(guard);
                    emit_drained(&next, st, state, Drained::Values { values, complete })
                }
                other => emit_drained(&next, st, state, other),
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Cache the inner run's output for the most recent input; a repeated input
/// replays the cached values without re-running `inner`.
pub fn memo<A, B>(inner: Transducer<A, B>) -> Transducer<A, B>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    Transducer::from_transform(Memo {
        inner,
        cache: Arc::new(Mutex::new(None)),
    })
}
