//! The failure channel carried through transducer graphs.
//!
//! Inside a graph, failure is data: combinators construct and propagate
//! [`Error`] values through [`TResult::Fail`](crate::TResult::Fail) rather
//! than panicking or returning `Result` mid-chain. The only place a panic is
//! ever intercepted is the [`invoke`](crate::invoke) boundary, which converts
//! it into [`Error::Panic`].

use std::sync::Arc;
use std::time::Duration;

/// Failure value threaded through [`TResult::Fail`](crate::TResult::Fail).
///
/// `Error` is cheap to clone (message payloads are `Arc`-backed) so retry
/// loops and fork handles can replay it without ownership gymnastics.
///
/// # Example
///
/// ```rust
/// use millrace::Error;
///
/// let err = Error::message("upstream unavailable");
/// assert_eq!(err.to_string(), "upstream unavailable");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Data-carried failure raised by user code or a failing transducer.
    #[error("{0}")]
    Message(Arc<str>),

    /// A panic escaped the reducer chain and was intercepted by the invoke
    /// driver. This is the sole panic-to-data conversion point in the crate.
    #[error("panic escaped the reducer chain: {0}")]
    Panic(Arc<str>),

    /// Cooperative cancellation was observed. Used only by the
    /// [`TResult::to_result`](crate::TResult::to_result) view; within the
    /// engine cancellation travels as its own terminal variant.
    #[error("operation cancelled")]
    Cancelled,

    /// Awaiting a forked computation timed out. The background work keeps
    /// running; only the await failed.
    #[error("fork await timed out after {0:?}")]
    AwaitTimeout(Duration),

    /// The forked worker disappeared without reporting a result.
    #[error("forked worker disconnected before reporting a result")]
    ForkDisconnected,

    /// A posted job was dropped by the target context before completing.
    #[error("posted job was abandoned by the target context")]
    PostAbandoned,

    /// Invocation state was not threaded back to the driver. Unreachable by
    /// construction; kept as data so the engine stays total.
    #[error("invocation state was not threaded back to the driver")]
    StateMismatch,
}

impl Error {
    /// Build a [`Error::Message`] from anything string-like.
    pub fn message(msg: impl Into<String>) -> Self {
        Error::Message(msg.into().into())
    }

    /// True for [`Error::AwaitTimeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::AwaitTimeout(_))
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::message(msg)
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::message(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_display() {
        let err = Error::message("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn message_equality() {
        assert_eq!(Error::message("a"), Error::from("a"));
        assert_ne!(Error::message("a"), Error::message("b"));
    }

    #[test]
    fn timeout_predicate() {
        assert!(Error::AwaitTimeout(Duration::from_secs(1)).is_timeout());
        assert!(!Error::message("x").is_timeout());
    }

    #[test]
    fn clone_is_cheap_and_equal() {
        let err = Error::message("shared");
        assert_eq!(err.clone(), err);
    }
}
