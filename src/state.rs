//! Per-invocation execution context.
//!
//! A [`TState`] is allocated at the start of every [`invoke`](crate::invoke)
//! call and disposed exactly once at the end, on every path. It owns three
//! things: the cancellation token for the call graph, an optional captured
//! [`PostContext`] for cross-context marshalling, and the resource-disposal
//! registry behind the `use_resource`/`release` combinators.
//!
//! The transducer graph itself stays immutable and shareable; all mutable,
//! invocation-scoped bookkeeping lives here and is passed explicitly through
//! the reducer chain.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::cancel::CancelToken;

/// A foreign executor that posted jobs can be marshalled onto.
///
/// Captured into a [`TState`] via [`invoke_in`](crate::invoke_in) and
/// consumed by the `post` combinator, which runs its inner chain on the
/// context and marshals the result back to the calling thread.
pub trait PostContext: Send + Sync {
    /// Run `job` on this context. The job owns everything it needs; the
    /// caller blocks on a channel for the result, not on this method.
    fn post(&self, job: Box<dyn FnOnce() + Send>);
}

type Disposer = Box<dyn Fn() + Send + Sync>;

struct Entry {
    fired: AtomicBool,
    dispose: Disposer,
}

impl Entry {
    /// At-most-once firing, safe under a release/teardown race.
    fn fire(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            (self.dispose)();
        }
    }
}

/// Invocation-scoped execution context.
///
/// Cheap to clone: all innards are shared, so fork thunks and deferred
/// trampoline steps can carry it across threads.
#[derive(Clone)]
pub struct TState {
    cancel: CancelToken,
    context: Option<Arc<dyn PostContext>>,
    registry: Arc<Mutex<HashMap<usize, Entry>>>,
}

impl std::fmt::Debug for TState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TState")
            .field("cancel", &self.cancel)
            .field("context", &self.context.as_ref().map(|_| "<context>"))
            .field("registered", &self.registered())
            .finish()
    }
}

impl TState {
    /// Create a context owning `cancel`, with no captured post context.
    pub fn new(cancel: CancelToken) -> Self {
        TState {
            cancel,
            context: None,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a context with a captured [`PostContext`] for `post`.
    pub fn with_context(cancel: CancelToken, context: Arc<dyn PostContext>) -> Self {
        TState {
            cancel,
            context: Some(context),
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Derive the context for a forked sub-computation: a child cancellation
    /// token and a fresh registry, disposed by the fork's own teardown.
    pub fn child(&self) -> Self {
        TState {
            cancel: self.cancel.child(),
            context: self.context.clone(),
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The cancellation token for this invocation.
    pub fn token(&self) -> &CancelToken {
        &self.cancel
    }

    /// True once cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The captured post context, if any.
    pub fn context(&self) -> Option<Arc<dyn PostContext>> {
        self.context.clone()
    }

    /// Register a disposer for `resource`, keyed by `Arc` pointer identity.
    /// Registering the same resource twice fires the displaced disposer
    /// before the new one takes its place, so no disposer is ever lost.
    pub fn acquire<R, D>(&self, resource: &Arc<R>, dispose: D)
    where
        R: Send + Sync + 'static,
        D: Fn(&R) + Send + Sync + 'static,
    {
        let key = Arc::as_ptr(resource) as usize;
        let held = Arc::clone(resource);
        let entry = Entry {
            fired: AtomicBool::new(false),
            dispose: Box::new(move || dispose(&held)),
        };
        let displaced = self.lock_registry().insert(key, entry);
        if let Some(previous) = displaced {
            // Disposers never run under the lock.
            previous.fire();
        }
    }

    /// Atomically remove and fire the disposer registered for exactly this
    /// resource. Returns `false` if nothing was registered, so a second
    /// release is a no-op.
    pub fn release<R>(&self, resource: &Arc<R>) -> bool {
        let key = Arc::as_ptr(resource) as usize;
        let entry = self.lock_registry().remove(&key);
        match entry {
            Some(entry) => {
                entry.fire();
                true
            }
            None => false,
        }
    }

    /// Number of still-registered resources.
    pub fn registered(&self) -> usize {
        self.lock_registry().len()
    }

    /// Fire every still-registered disposer, exactly once each. Invoked by
    /// the driver on every exit path; idempotent.
    pub fn dispose(&self) {
        let entries: Vec<Entry> = self.lock_registry().drain().map(|(_, e)| e).collect();
        for entry in entries {
            entry.fire();
        }
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, HashMap<usize, Entry>> {
        // Disposers never run under the lock, so a poisoned mutex only means
        // a panicking thread died elsewhere; the map itself is still sound.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn dispose_fires_registered_disposers() {
        let st = TState::new(CancelToken::new());
        let fired = counter();
        let resource = Arc::new("conn");

        let observed = fired.clone();
        st.acquire(&resource, move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(st.registered(), 1);

        st.dispose();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(st.registered(), 0);
    }

    #[test]
    fn release_fires_once_and_teardown_skips_it() {
        let st = TState::new(CancelToken::new());
        let fired = counter();
        let resource = Arc::new(42u32);

        let observed = fired.clone();
        st.acquire(&resource, move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        assert!(st.release(&resource));
        assert!(!st.release(&resource));
        st.dispose();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispose_is_idempotent() {
        let st = TState::new(CancelToken::new());
        let fired = counter();
        let resource = Arc::new(());

        let observed = fired.clone();
        st.acquire(&resource, move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        st.dispose();
        st.dispose();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reacquiring_fires_the_displaced_disposer() {
        let st = TState::new(CancelToken::new());
        let fired = counter();
        let resource = Arc::new(5u8);

        let observed = fired.clone();
        st.acquire(&resource, move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });
        let observed = fired.clone();
        st.acquire(&resource, move |_| {
            observed.fetch_add(10, Ordering::SeqCst);
        });

        // The first disposer fired on displacement; only the second remains.
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(st.registered(), 1);
        st.dispose();
        assert_eq!(fired.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn identity_keying_distinguishes_equal_resources() {
        let st = TState::new(CancelToken::new());
        let fired = counter();
        let a = Arc::new(1u8);
        let b = Arc::new(1u8); // equal value, distinct identity

        for resource in [&a, &b] {
            let observed = fired.clone();
            st.acquire(resource, move |_| {
                observed.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(st.registered(), 2);
        st.dispose();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn child_state_has_linked_token_and_fresh_registry() {
        let st = TState::new(CancelToken::new());
        let resource = Arc::new(());
        st.acquire(&resource, |_| {});

        let child = st.child();
        assert_eq!(child.registered(), 0);

        st.token().cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn concurrent_release_and_dispose_fire_exactly_once() {
        let st = TState::new(CancelToken::new());
        let fired = counter();
        let resource = Arc::new(0u64);

        let observed = fired.clone();
        st.acquire(&resource, move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        let st2 = st.clone();
        let res2 = resource.clone();
        let releaser = std::thread::spawn(move || {
            st2.release(&res2);
        });
        st.dispose();
        releaser.join().expect("releaser thread panicked");

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
