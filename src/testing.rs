//! Test utilities for transducer pipelines.
//!
//! Everything here is plain library code usable from unit tests,
//! integration tests and doctests alike: evaluation probes for asserting
//! how often a stage ran, deterministic flaky stages for retry scenarios,
//! and a thread-backed [`PostContext`] for exercising `post`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;

use crate::error::Error;
use crate::state::PostContext;
use crate::transducer::{lift, lift_result, Transducer};

/// Counts how many times a pipeline stage was evaluated.
///
/// # Example
///
/// ```rust
/// use millrace::testing::Probe;
/// use millrace::{invoke1, CancelToken};
///
/// let probe = Probe::new();
/// let t = probe.tap::<i32>().map(|x| x + 1);
/// invoke1(&t, 1, CancelToken::new());
/// assert_eq!(probe.calls(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Probe {
    calls: Arc<AtomicUsize>,
}

impl Probe {
    /// A fresh probe with a zeroed counter.
    pub fn new() -> Self {
        Probe::default()
    }

    /// A pass-through stage that bumps the counter on every evaluation.
    pub fn tap<A: Send + 'static>(&self) -> Transducer<A, A> {
        let calls = Arc::clone(&self.calls);
        lift(move |value: A| {
            calls.fetch_add(1, Ordering::SeqCst);
            value
        })
    }

    /// How many times any stage from this probe has been evaluated.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// A stage failing its first `failures` evaluations, then passing values
/// through. The counter is shared across clones of the returned graph, so a
/// retried stage converges rather than failing forever.
pub fn flaky<A: Send + 'static>(failures: usize) -> Transducer<A, A> {
    let seen = Arc::new(AtomicUsize::new(0));
    lift_result(move |value: A| {
        let attempt = seen.fetch_add(1, Ordering::SeqCst);
        if attempt < failures {
            Err(Error::message(format!("flaky failure #{}", attempt + 1)))
        } else {
            Ok(value)
        }
    })
}

enum Job {
    Run(Box<dyn FnOnce() + Send>),
    Shutdown,
}

/// A [`PostContext`] backed by a single worker thread, for `post` tests.
///
/// Jobs run in submission order on the worker; [`ThreadContext::posted`]
/// reports how many were accepted. Dropping the context shuts the worker
/// down after in-flight jobs finish.
pub struct ThreadContext {
    sender: Mutex<mpsc::Sender<Job>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    posted: AtomicUsize,
}

impl std::fmt::Debug for ThreadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadContext")
            .field("posted", &self.posted())
            .finish_non_exhaustive()
    }
}

impl ThreadContext {
    /// Start a worker thread and hand back the shareable context.
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name("millrace-post-test".into())
            .spawn(move || {
                while let Ok(Job::Run(job)) = receiver.recv() {
                    job();
                }
            })
            .ok();
        Arc::new(ThreadContext {
            sender: Mutex::new(sender),
            worker: Mutex::new(worker),
            posted: AtomicUsize::new(0),
        })
    }

    /// Number of jobs accepted so far.
    pub fn posted(&self) -> usize {
        self.posted.load(Ordering::SeqCst)
    }
}

impl PostContext for ThreadContext {
    fn post(&self, job: Box<dyn FnOnce() + Send>) {
        self.posted.fetch_add(1, Ordering::SeqCst);
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        // A send after shutdown drops the job, which surfaces to the
        // poster as PostAbandoned.
        let _ = sender.send(Job::Run(job));
    }
}

impl Drop for ThreadContext {
    fn drop(&mut self) {
        {
            let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = sender.send(Job::Shutdown);
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::invoke::invoke1;
    use crate::schedule::Schedule;

    #[test]
    fn probe_counts_evaluations() {
        let probe = Probe::new();
        let t = probe.tap::<u8>();
        invoke1(&t, 1, CancelToken::new());
        invoke1(&t, 2, CancelToken::new());
        assert_eq!(probe.calls(), 2);
    }

    #[test]
    fn flaky_recovers_under_retry() {
        let t = flaky::<i32>(2).retry(Schedule::attempts(3));
        assert_eq!(invoke1(&t, 7, CancelToken::new()).value(), Some(7));
    }

    #[test]
    fn flaky_without_retry_fails() {
        let t = flaky::<i32>(1);
        assert!(invoke1(&t, 7, CancelToken::new()).is_fail());
    }
}
