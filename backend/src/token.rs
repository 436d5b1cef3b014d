//! Stage completion signaling.
//!
//! Every submitted stage gets a fresh [`StageSignal`]; the handle the caller
//! sees is a [`CompletionToken`], which supports exactly two things: blocking
//! until the stage finishes, and being passed as a dependency to a later
//! submission. This mirrors the one-event-per-enqueue discipline of
//! command-queue hardware APIs while keeping the backend pluggable.
//!
//! Waiting uses an atomic fast path and a condvar slow path. A failed stage
//! poisons its signal: completion still wakes waiters, but `wait` reports the
//! recorded failure instead of success.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, StageFailedSnafu};

/// Completion state of one submitted stage.
///
/// Owned by the backend executing the stage; observed through
/// [`CompletionToken`] clones. The signal fires exactly once, either
/// successfully ([`complete`](Self::complete)) or with a recorded failure
/// ([`fail`](Self::fail)).
#[derive(Debug, Default)]
pub struct StageSignal {
    /// Set once the stage has finished (successfully or not).
    done: AtomicBool,
    /// Failure recorded before `done` is set, if the stage failed.
    failure: Mutex<Option<String>>,
    /// Pairs with `condvar`; held across the fire so waiters cannot park
    /// between their `done` check and the notification.
    mutex: Mutex<()>,
    /// Condvar for waiting threads.
    condvar: Condvar,
}

impl StageSignal {
    /// Create a new, not-yet-fired signal.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark the stage as successfully finished and wake all waiters.
    pub fn complete(&self) {
        // The mutex must be held across the store so a waiter cannot check
        // `done` and park between the store and the notification.
        let _guard = self.mutex.lock();
        self.done.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Record a failure, then mark the stage finished and wake all waiters.
    ///
    /// Waiters observe the failure through [`CompletionToken::wait`].
    pub fn fail(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
        self.complete();
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }
}

/// Opaque handle to the future completion of one submitted stage.
///
/// Cheap to clone; all clones observe the same underlying signal. Tokens are
/// single-cycle: the scheduler overwrites a slot's tokens on every reuse, so
/// a token never outlives the pipeline pass that produced it.
#[derive(Debug, Clone)]
pub struct CompletionToken {
    signal: Arc<StageSignal>,
}

impl CompletionToken {
    /// Create a token observing `signal`.
    pub fn new(signal: Arc<StageSignal>) -> Self {
        Self { signal }
    }

    /// Block the calling thread until the stage finishes.
    ///
    /// Returns `Err(StageFailed)` if the backend recorded a failure for the
    /// stage. There is no timeout: a stuck stage blocks forever, and
    /// hardware-level watchdogs are the backend's responsibility.
    pub fn wait(&self) -> Result<()> {
        // Fast path: already fired.
        if !self.signal.is_done() {
            let mut guard = self.signal.mutex.lock();
            while !self.signal.is_done() {
                self.signal.condvar.wait(&mut guard);
            }
        }

        match self.signal.failure() {
            Some(reason) => StageFailedSnafu { reason }.fail(),
            None => Ok(()),
        }
    }

    /// Check whether the stage has finished, without blocking.
    pub fn is_complete(&self) -> bool {
        self.signal.is_done()
    }

    /// Whether two tokens observe the same stage completion.
    ///
    /// Identity, not equality of state: used to assert on dependency graph
    /// structure (e.g. that a phase-1 submission depends on exactly the
    /// previous slot's phase-2 completion).
    pub fn same_completion(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.signal, &other.signal)
    }
}
