//! Ordered alternatives over the `Sum` channel.

use std::any::Any;

use crate::reducer::{dyn_reducer, DynReducer};
use crate::result::TResult;
use crate::sum::Sum;
use crate::transducer::support::{drain, drive, Drained};
use crate::transducer::{Transducer, Transform};

pub(crate) struct Choice<A, X, B> {
    items: Vec<Transducer<A, Sum<X, B>>>,
}

impl<A, X, B> Transform<A, Sum<X, B>> for Choice<A, X, B>
where
    A: Clone + Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
{
    fn transform(&self, next: DynReducer<Sum<X, B>>) -> DynReducer<A> {
        let items = self.items.clone();
        dyn_reducer(move |st, state, value: A| {
            let mut last_left: Option<X> = None;
            for item in &items {
                match drain(item, st, value.clone()) {
                    Drained::Values { values, .. } => match values.into_iter().last() {
                        // First Right wins; the remaining alternatives are
                        // never evaluated.
                        Some(Sum::Right(b)) => {
                            return drive(st, next.step(st, state, Sum::Right(b)))
                        }
                        Some(Sum::Left(x)) => last_left = Some(x),
                        None => {}
                    },
                    Drained::None => {}
                    Drained::Cancelled => return TResult::Cancelled,
                    Drained::Failed(e) => return TResult::Fail(e),
                }
            }
            match last_left {
                Some(x) => match drive(st, next.step(st, state, Sum::Left(x))) {
                    TResult::Continue(s) => TResult::Complete(s),
                    other => other,
                },
                None => TResult::None,
            }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Try each alternative against the same input in order. The first `Right`
/// short-circuits evaluation of the rest; if every alternative yields
/// `Left`, the combinator completes with the last `Left`.
///
/// Nested choices are flattened into one alternative list at construction,
/// before any execution occurs.
pub fn choice<A, X, B>(
    items: impl IntoIterator<Item = Transducer<A, Sum<X, B>>>,
) -> Transducer<A, Sum<X, B>>
where
    A: Clone + Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
{
    let mut flat = Vec::new();
    for item in items {
        flatten_into(item, &mut flat);
    }
    Transducer::from_transform(Choice { items: flat })
}

fn flatten_into<A, X, B>(item: Transducer<A, Sum<X, B>>, out: &mut Vec<Transducer<A, Sum<X, B>>>)
where
    A: Clone + Send + 'static,
    X: Send + 'static,
    B: Send + 'static,
{
    let nested = item
        .inner
        .as_any()
        .downcast_ref::<Choice<A, X, B>>()
        .map(|choice| choice.items.clone());
    match nested {
        Some(items) => {
            for inner in items {
                flatten_into(inner, out);
            }
        }
        None => out.push(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transducer::lift;

    fn alt(n: i32) -> Transducer<i32, Sum<String, i32>> {
        lift(move |_| Sum::Right(n))
    }

    #[test]
    fn nested_choices_flatten_at_construction() {
        let inner = choice([alt(1), alt(2)]);
        let outer = choice([inner, alt(3)]);
        let flattened = outer
            .inner
            .as_any()
            .downcast_ref::<Choice<i32, String, i32>>()
            .expect("choice node")
            .items
            .len();
        assert_eq!(flattened, 3);
    }
}
