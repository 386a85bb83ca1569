//! Two-case sum type used as the short-circuiting channel through chains.
//!
//! `Sum<X, A>` is right-biased: `map` and friends operate on `Right`, and
//! every combinator in the crate forwards `Left` untouched unless it is
//! explicitly Sum-aware (`bimap`, `map_left`, the `*_sum` combinators).
//! `Right` is the ordinary data path; `Left` is whatever the caller routes
//! around the pipeline, typically an error channel, but nothing here
//! assumes that.

/// A value that is either `Left(X)` or `Right(A)`.
///
/// # Example
///
/// ```rust
/// use millrace::Sum;
///
/// let r: Sum<&str, i32> = Sum::Right(20);
/// assert_eq!(r.map(|x| x * 2), Sum::Right(40));
///
/// // Left passes through map untouched.
/// let l: Sum<&str, i32> = Sum::Left("skipped");
/// assert_eq!(l.map(|x| x * 2), Sum::Left("skipped"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sum<X, A> {
    /// The forwarded-untouched case.
    Left(X),
    /// The ordinary data case.
    Right(A),
}

impl<X, A> Sum<X, A> {
    /// Create a `Left` value.
    #[inline]
    pub fn left(value: X) -> Self {
        Sum::Left(value)
    }

    /// Create a `Right` value.
    #[inline]
    pub fn right(value: A) -> Self {
        Sum::Right(value)
    }

    /// True for `Left`.
    #[inline]
    pub fn is_left(&self) -> bool {
        matches!(self, Sum::Left(_))
    }

    /// True for `Right`.
    #[inline]
    pub fn is_right(&self) -> bool {
        matches!(self, Sum::Right(_))
    }

    /// Transform the `Right` value, forwarding `Left` untouched.
    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> Sum<X, B> {
        match self {
            Sum::Left(x) => Sum::Left(x),
            Sum::Right(a) => Sum::Right(f(a)),
        }
    }

    /// Transform the `Left` value, forwarding `Right` untouched.
    pub fn map_left<Y>(self, f: impl FnOnce(X) -> Y) -> Sum<Y, A> {
        match self {
            Sum::Left(x) => Sum::Left(f(x)),
            Sum::Right(a) => Sum::Right(a),
        }
    }

    /// Transform both cases at once.
    pub fn bimap<Y, B>(self, left: impl FnOnce(X) -> Y, right: impl FnOnce(A) -> B) -> Sum<Y, B> {
        match self {
            Sum::Left(x) => Sum::Left(left(x)),
            Sum::Right(a) => Sum::Right(right(a)),
        }
    }

    /// Chain a continuation over the `Right` value.
    pub fn bind<B>(self, f: impl FnOnce(A) -> Sum<X, B>) -> Sum<X, B> {
        match self {
            Sum::Left(x) => Sum::Left(x),
            Sum::Right(a) => f(a),
        }
    }

    /// Collapse both cases into one value.
    pub fn fold<R>(self, left: impl FnOnce(X) -> R, right: impl FnOnce(A) -> R) -> R {
        match self {
            Sum::Left(x) => left(x),
            Sum::Right(a) => right(a),
        }
    }

    /// Swap the cases.
    pub fn swap(self) -> Sum<A, X> {
        match self {
            Sum::Left(x) => Sum::Right(x),
            Sum::Right(a) => Sum::Left(a),
        }
    }

    /// Extract the `Left` value, if any.
    pub fn left_value(self) -> Option<X> {
        match self {
            Sum::Left(x) => Some(x),
            Sum::Right(_) => None,
        }
    }

    /// Extract the `Right` value, if any.
    pub fn right_value(self) -> Option<A> {
        match self {
            Sum::Left(_) => None,
            Sum::Right(a) => Some(a),
        }
    }

    /// Borrowing view of both cases.
    pub fn as_ref(&self) -> Sum<&X, &A> {
        match self {
            Sum::Left(x) => Sum::Left(x),
            Sum::Right(a) => Sum::Right(a),
        }
    }

    /// View as a `Result` with `Left` in the error position.
    pub fn into_result(self) -> Result<A, X> {
        match self {
            Sum::Left(x) => Err(x),
            Sum::Right(a) => Ok(a),
        }
    }
}

impl<X, A> From<Result<A, X>> for Sum<X, A> {
    fn from(r: Result<A, X>) -> Self {
        match r {
            Ok(a) => Sum::Right(a),
            Err(x) => Sum::Left(x),
        }
    }
}

#[cfg(feature = "proptest")]
impl<X, A> proptest::arbitrary::Arbitrary for Sum<X, A>
where
    X: proptest::arbitrary::Arbitrary + 'static,
    A: proptest::arbitrary::Arbitrary + 'static,
{
    type Parameters = ();
    type Strategy = proptest::strategy::BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        use proptest::prelude::*;
        prop_oneof![
            any::<X>().prop_map(Sum::Left),
            any::<A>().prop_map(Sum::Right),
        ]
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_is_right_biased() {
        assert_eq!(Sum::<&str, i32>::Right(2).map(|x| x + 1), Sum::Right(3));
        assert_eq!(Sum::<&str, i32>::Left("l").map(|x| x + 1), Sum::Left("l"));
    }

    #[test]
    fn map_left_only_touches_left() {
        assert_eq!(
            Sum::<i32, &str>::Left(1).map_left(|x| x * 10),
            Sum::Left(10)
        );
        assert_eq!(
            Sum::<i32, &str>::Right("r").map_left(|x| x * 10),
            Sum::Right("r")
        );
    }

    #[test]
    fn bimap_touches_both() {
        assert_eq!(
            Sum::<i32, i32>::Left(1).bimap(|x| x + 1, |a| a - 1),
            Sum::Left(2)
        );
        assert_eq!(
            Sum::<i32, i32>::Right(1).bimap(|x| x + 1, |a| a - 1),
            Sum::Right(0)
        );
    }

    #[test]
    fn bind_short_circuits_on_left() {
        let r = Sum::<&str, i32>::Left("stop").bind(|x| Sum::Right(x + 1));
        assert_eq!(r, Sum::Left("stop"));
    }

    #[test]
    fn fold_collapses() {
        let desc = Sum::<&str, i32>::Right(7).fold(|l| l.to_string(), |r| format!("got {r}"));
        assert_eq!(desc, "got 7");
    }

    #[test]
    fn swap_round_trips() {
        let s = Sum::<&str, i32>::Right(1);
        assert_eq!(s.swap().swap(), s);
    }

    #[test]
    fn result_conversions() {
        assert_eq!(Sum::<&str, i32>::from(Ok(1)), Sum::Right(1));
        assert_eq!(Sum::<&str, i32>::from(Err("e")), Sum::Left("e"));
        assert_eq!(Sum::<&str, i32>::Right(1).into_result(), Ok(1));
    }
}
