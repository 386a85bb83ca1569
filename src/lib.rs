//! # Millrace
//!
//! A push-based, composable transducer engine.
//!
//! ## Model
//!
//! - **Describe** a transformation as an immutable [`Transducer<A, B>`]
//!   graph. Combinators nest structurally; building a graph performs no
//!   work and the graph is freely shareable and reusable.
//! - **Execute** through the single [`invoke`] boundary: the graph is
//!   compiled into a reducer chain ending in the caller's [`Reducer`], then
//!   driven by an iterative trampoline. Recursion depth never tracks chain
//!   length or retry counts.
//! - **Fail as data**: errors travel as [`TResult::Fail`] values through
//!   the chain; the invoke boundary is the only place panics are converted.
//! - **Cancel cooperatively**: a [`CancelToken`] is observed between
//!   trampoline steps, and every invocation's [`TState`] is disposed exactly
//!   once on every exit path, releasing tracked resources.
//!
//! ## Quick Example
//!
//! ```rust
//! use millrace::{invoke1, lift, CancelToken, Schedule};
//!
//! let pipeline = lift(|x: i32| x + 1)
//!     .filter(|x| x % 2 == 0)
//!     .map(|x| x * 10)
//!     .retry(Schedule::attempts(3));
//!
//! assert_eq!(invoke1(&pipeline, 3, CancelToken::new()).value(), Some(40));
//! assert!(invoke1(&pipeline, 4, CancelToken::new()).is_none());
//! ```
//!
//! Two-channel pipelines route recoverable domain failures through
//! [`Sum::Left`] while data flows through [`Sum::Right`]; the `*_sum`
//! combinators transform only the `Right` channel and forward `Left`
//! untouched.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cancel;
pub mod error;
pub mod invoke;
pub mod reducer;
pub mod result;
pub mod schedule;
pub mod state;
pub mod sum;
pub mod testing;
pub mod transducer;

// Re-exports
pub use cancel::CancelToken;
pub use error::Error;
pub use invoke::{invoke, invoke1, invoke_in};
pub use reducer::{ArcReducer, Reducer};
pub use result::{TRecursive, TResult};
pub use schedule::{Backoff, Jitter, Schedule};
pub use state::{PostContext, TState};
pub use sum::Sum;
pub use transducer::{
    apply, apply_sum, bind, bind_sum, choice, compose, constant, emit_each, fail, filter,
    filter_sum, flatten, fold_until, fold_while, fork, from_async, identity, lift, lift_result,
    lift_sum, memo, post,
    release, repeat, repeat_until, retry, retry_sum, retry_sum_while, retry_until, retry_while,
    try_catch, use_resource, zip, SharedFn, TFork, Transducer,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::error::Error;
    pub use crate::invoke::{invoke, invoke1, invoke_in};
    pub use crate::reducer::{collect, count, from_fn, last_value, Reducer};
    pub use crate::result::TResult;
    pub use crate::schedule::{Backoff, Jitter, Schedule};
    pub use crate::state::{PostContext, TState};
    pub use crate::sum::Sum;
    pub use crate::transducer::{
        choice, fail, identity, lift, lift_result, lift_sum, TFork, Transducer,
    };
}
