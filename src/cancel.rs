//! Cooperative cancellation signal threaded through an invocation.
//!
//! One [`CancelToken`] is handed to [`invoke`](crate::invoke) and observed at
//! every trampoline step. Cancellation is cooperative, never preemptive:
//! signalling the token makes the next step short-circuit to
//! [`TResult::Cancelled`](crate::TResult::Cancelled), it does not interrupt a
//! step already running.
//!
//! Forked sub-computations get a [`child`](CancelToken::child) token: it
//! observes the parent's signal but can be cancelled on its own without
//! affecting the parent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag with optional parent linkage.
///
/// # Example
///
/// ```rust
/// use millrace::CancelToken;
///
/// let parent = CancelToken::new();
/// let child = parent.child();
///
/// child.cancel();
/// assert!(child.is_cancelled());
/// assert!(!parent.is_cancelled());
///
/// parent.cancel();
/// assert!(parent.child().is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    signalled: AtomicBool,
    parent: Option<CancelToken>,
}

impl CancelToken {
    /// Create a fresh, unsignalled token.
    pub fn new() -> Self {
        CancelToken {
            inner: Arc::new(Inner {
                signalled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// Create a token linked to this one: it observes the parent's signal
    /// but cancelling it leaves the parent untouched.
    pub fn child(&self) -> Self {
        CancelToken {
            inner: Arc::new(Inner {
                signalled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.signalled.store(true, Ordering::SeqCst);
    }

    /// True once this token or any ancestor has been signalled.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.signalled.load(Ordering::SeqCst) {
            return true;
        }
        match &self.inner.parent {
            Some(parent) => parent.is_cancelled(),
            None => false,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
