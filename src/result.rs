//! The closed result algebra and trampoline runner.
//!
//! Every reducer step produces a [`TResult`]. Five of its variants are
//! terminal with respect to a single trampoline drive; [`TResult::Recursive`]
//! wraps a deferred step ([`TRecursive`]) that the invoke driver unwinds
//! iteratively, so arbitrarily long combinator chains never grow the call
//! stack.
//!
//! `map` and `bind` are absorbing for `Fail`, `Cancelled` and `None`: the
//! variant is preserved and the transformation is a no-op. Applied to a
//! `Recursive` result they compose lazily onto the pending runner instead of
//! recursing eagerly.

use crate::error::Error;

/// One step of a deferred computation.
///
/// Wraps a zero-argument thunk producing a new [`TResult`], which may itself
/// be `Recursive`. [`TRecursive::run`] performs exactly one step; driving a
/// chain to a terminal variant is the invoke driver's job.
pub struct TRecursive<A> {
    step: Box<dyn FnOnce() -> TResult<A> + Send>,
}

impl<A: Send + 'static> TRecursive<A> {
    /// Wrap a thunk as a deferred step.
    pub fn new(step: impl FnOnce() -> TResult<A> + Send + 'static) -> Self {
        TRecursive {
            step: Box::new(step),
        }
    }

    /// Perform one step of the deferred computation.
    pub fn run(self) -> TResult<A> {
        (self.step)()
    }

    /// Lazily compose a transformation onto the pending runner.
    pub fn map<B, F>(self, f: F) -> TRecursive<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        TRecursive::new(move || self.run().map(f))
    }

    /// Lazily compose a continuation onto the pending runner.
    pub fn bind<B, F>(self, f: F) -> TRecursive<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> TResult<B> + Send + 'static,
    {
        TRecursive::new(move || self.run().bind(f))
    }
}

impl<A> std::fmt::Debug for TRecursive<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TRecursive").field("step", &"<deferred>").finish()
    }
}

/// Result of one reducer step.
///
/// Exactly one variant holds at a time. `Continue`, `Complete`, `None`,
/// `Cancelled` and `Fail` are terminal for a single trampoline drive;
/// `Recursive` defers the next step.
///
/// # Example
///
/// ```rust
/// use millrace::{Error, TResult};
///
/// let r: TResult<i32> = TResult::Continue(2).map(|x| x * 3);
/// assert_eq!(r.value(), Some(6));
///
/// // Fail is absorbing: map never touches it.
/// let f: TResult<i32> = TResult::Fail(Error::message("boom"));
/// assert!(f.map(|x| x + 1).is_fail());
/// ```
#[derive(Debug)]
pub enum TResult<A> {
    /// A value was produced and reduction may continue.
    Continue(A),
    /// A final value was produced; reduction stops here.
    Complete(A),
    /// Valid empty result: the chain finished without producing a value.
    None,
    /// Cooperative cancellation was observed.
    Cancelled,
    /// Data-carried failure.
    Fail(Error),
    /// A deferred step for the trampoline to unwind.
    Recursive(TRecursive<A>),
}

impl<A: Send + 'static> TResult<A> {
    /// Defer a step for the trampoline.
    pub fn recursive(step: impl FnOnce() -> TResult<A> + Send + 'static) -> Self {
        TResult::Recursive(TRecursive::new(step))
    }

    /// Build a [`TResult::Fail`] from anything error-like.
    pub fn fail(err: impl Into<Error>) -> Self {
        TResult::Fail(err.into())
    }

    /// Transform the carried value. Absorbing for `None`, `Cancelled` and
    /// `Fail`; lazy for `Recursive`.
    pub fn map<B, F>(self, f: F) -> TResult<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        match self {
            TResult::Continue(v) => TResult::Continue(f(v)),
            TResult::Complete(v) => TResult::Complete(f(v)),
            TResult::None => TResult::None,
            TResult::Cancelled => TResult::Cancelled,
            TResult::Fail(e) => TResult::Fail(e),
            TResult::Recursive(r) => TResult::Recursive(r.map(f)),
        }
    }

    /// Chain a continuation over the carried value. Absorbing for `None`,
    /// `Cancelled` and `Fail`; lazy for `Recursive`. A `Complete` value is
    /// passed to the continuation like a `Continue` one; the continuation
    /// decides how the chain ends.
    pub fn bind<B, F>(self, f: F) -> TResult<B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> TResult<B> + Send + 'static,
    {
        match self {
            TResult::Continue(v) | TResult::Complete(v) => f(v),
            TResult::None => TResult::None,
            TResult::Cancelled => TResult::Cancelled,
            TResult::Fail(e) => TResult::Fail(e),
            TResult::Recursive(r) => TResult::Recursive(r.bind(f)),
        }
    }

    /// True unless the result is `Recursive`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TResult::Recursive(_))
    }

    /// True for `Continue` or `Complete`.
    pub fn is_value(&self) -> bool {
        matches!(self, TResult::Continue(_) | TResult::Complete(_))
    }

    /// True for `Fail`.
    pub fn is_fail(&self) -> bool {
        matches!(self, TResult::Fail(_))
    }

    /// True for `Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TResult::Cancelled)
    }

    /// True for `None`.
    pub fn is_none(&self) -> bool {
        matches!(self, TResult::None)
    }

    /// Extract the carried value from `Continue` or `Complete`.
    pub fn value(self) -> Option<A> {
        match self {
            TResult::Continue(v) | TResult::Complete(v) => Some(v),
            _ => Option::None,
        }
    }

    /// View a terminal result as a `Result`: values map to `Ok(Some)`,
    /// `None` to `Ok(None)`, `Fail` and `Cancelled` to `Err`. A `Recursive`
    /// result has no terminal view and surfaces as a state-threading error.
    pub fn to_result(self) -> Result<Option<A>, Error> {
        match self {
            TResult::Continue(v) | TResult::Complete(v) => Ok(Some(v)),
            TResult::None => Ok(Option::None),
            TResult::Cancelled => Err(Error::Cancelled),
            TResult::Fail(e) => Err(e),
            TResult::Recursive(_) => Err(Error::StateMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_transforms_values() {
        assert_eq!(TResult::Continue(2).map(|x| x * 2).value(), Some(4));
        assert_eq!(TResult::Complete(2).map(|x| x * 2).value(), Some(4));
    }

    #[test]
    fn map_preserves_variant() {
        assert!(matches!(
            TResult::Complete(1).map(|x: i32| x),
            TResult::Complete(1)
        ));
    }

    #[test]
    fn map_absorbs_fail() {
        let r: TResult<i32> = TResult::Fail(Error::message("x"));
        match r.map(|v| v + 1) {
            TResult::Fail(e) => assert_eq!(e, Error::message("x")),
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[test]
    fn map_absorbs_none_and_cancelled() {
        assert!(TResult::<i32>::None.map(|v| v).is_none());
        assert!(TResult::<i32>::Cancelled.map(|v| v).is_cancelled());
    }

    #[test]
    fn bind_chains() {
        let r = TResult::Continue(2).bind(|x| TResult::Continue(x + 10));
        assert_eq!(r.value(), Some(12));
    }

    #[test]
    fn bind_absorbs_fail() {
        let r: TResult<i32> = TResult::Fail(Error::message("x"));
        assert!(r.bind(|v| TResult::Continue(v)).is_fail());
    }

    #[test]
    fn recursive_map_is_lazy() {
        let r = TResult::recursive(|| TResult::Continue(1)).map(|x| x + 1);
        // Still deferred: nothing ran yet.
        let TResult::Recursive(step) = r else {
            panic!("expected Recursive");
        };
        assert_eq!(step.run().value(), Some(2));
    }

    #[test]
    fn recursive_runs_one_step_at_a_time() {
        let r = TResult::recursive(|| TResult::recursive(|| TResult::Continue(7)));
        let TResult::Recursive(s1) = r else {
            panic!("expected Recursive")
        };
        let TResult::Recursive(s2) = s1.run() else {
            panic!("expected second Recursive")
        };
        assert_eq!(s2.run().value(), Some(7));
    }

    #[test]
    fn to_result_views() {
        assert_eq!(TResult::Continue(1).to_result(), Ok(Some(1)));
        assert_eq!(TResult::<i32>::None.to_result(), Ok(None));
        assert_eq!(TResult::<i32>::Cancelled.to_result(), Err(Error::Cancelled));
    }
}
