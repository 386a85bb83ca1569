//! Element-wise pairing of two branches over the same input.

use std::any::Any;

use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::transducer::support::{drain, emit_all, Drained};
use crate::transducer::{Transducer, Transform};

pub(crate) struct Zip<A, B, C> {
    left: Transducer<A, B>,
    right: Transducer<A, C>,
}

impl<A, B, C> Transform<A, (B, C)> for Zip<A, B, C>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    fn transform(&self, next: DynReducer<(B, C)>) -> DynReducer<A> {
        let left = self.left.clone();
        let right = self.right.clone();
        dyn_reducer(move |st, state, value: A| {
            // Strictly sequential: the left branch fully resolves (and fails
            // fast) before the right branch runs.
            let (lhs, left_complete) = match drain(&left, st, value.clone()) {
                Drained::Values { values, complete } => (values, complete),
                Drained::None => return TResult::Continue(state),
                Drained::Cancelled => return TResult::Cancelled,
                Drained::Failed(e) => return TResult::Fail(e),
            };
            let (rhs, right_complete) = match drain(&right, st, value) {
                Drained::Values { values, complete } => (values, complete),
                Drained::None => return TResult::Continue(state),
                Drained::Cancelled => return TResult::Cancelled,
                Drained::Failed(e) => return TResult::Fail(e),
            };
            let pairs: Vec<(B, C)> = lhs.into_iter().zip(rhs).collect();
            match emit_all(&next, st, state, pairs) {
                TResult::Continue(s) if left_complete || right_complete => TResult::Complete(s),
                other => other,
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Pair the outputs of two transducers element-wise for the same input.
/// Unmatched surplus on either side is dropped.
pub fn zip<A, B, C>(left: Transducer<A, B>, right: Transducer<A, C>) -> Transducer<A, (B, C)>
where
    A: Clone + Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    Transducer::from_transform(Zip { left, right })
}
