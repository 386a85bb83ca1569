//! Sequential composition - the algebraic core.

use std::any::Any;

use crate::reducer::DynReducer;
use crate::transducer::{Transducer, Transform};

pub(crate) struct Compose<A, B, C> {
    first: Transducer<A, B>,
    second: Transducer<B, C>,
}

impl<A, B, C> Transform<A, C> for Compose<A, B, C>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    fn transform(&self, next: DynReducer<C>) -> DynReducer<A> {
        // The first node's step targets the second node's transformed
        // reducer: O(1) at construction, purely deferred until invoke.
        self.first.reduce_with(self.second.reduce_with(next))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Feed `first`'s output into `second`.
///
/// Associativity and identity hold structurally:
/// `compose(compose(f, g), h)` and `compose(f, compose(g, h))` build chains
/// that reduce identically, and composing with [`identity`] on either side
/// is observationally `f` itself.
///
/// [`identity`]: crate::identity
pub fn compose<A, B, C>(first: Transducer<A, B>, second: Transducer<B, C>) -> Transducer<A, C>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    Transducer::from_transform(Compose { first, second })
}
