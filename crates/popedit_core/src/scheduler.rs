//! One-shot "run once the host is stable" scheduling.
//!
//! A task registered with a [`StabilizationScheduler`] runs at most once, after
//! pending synchronous work has settled. The returned [`StableRegistration`]
//! cancels the task when released or dropped before it fires.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Deferred continuation accepted by schedulers.
pub type StableTask = Box<dyn FnOnce() + Send + 'static>;

/// Primitive that runs a task once the surrounding host has stabilized.
pub trait StabilizationScheduler {
    /// Register `task` to run once on the next stabilization.
    ///
    /// # Returns
    /// A registration that cancels `task` if released before it fires.
    fn on_stable(&self, task: StableTask) -> StableRegistration;
}

/// Handle for a task registered with a [`StabilizationScheduler`].
///
/// The registration counts as released once the task fired or was cancelled.
#[derive(Debug)]
pub struct StableRegistration {
    released: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl StableRegistration {
    fn new(released: Arc<AtomicBool>, abort: Option<AbortHandle>) -> Self {
        Self { released, abort }
    }

    /// Return `true` when the task already fired or was cancelled.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Cancel the task if it has not fired yet.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StableRegistration {
    fn drop(&mut self) {
        self.released.store(true, Ordering::Release);
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
    }
}

/// Claim the right to run; only the first claimant (task or release) wins.
fn claim(released: &AtomicBool) -> bool {
    !released.swap(true, Ordering::AcqRel)
}

struct PendingTask {
    released: Arc<AtomicBool>,
    task: StableTask,
}

/// Cooperative scheduler driven by the host.
///
/// Tasks queue until the host calls [`StableTick::stabilize`], typically after
/// it finished applying a batch of synchronous updates.
#[derive(Default)]
pub struct StableTick {
    pending: Mutex<VecDeque<PendingTask>>,
}

impl StableTick {
    /// Create a scheduler with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<PendingTask>> {
        // The queue is only pushed to and swapped out; poisoning leaves it usable.
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run every queued task that has not been released, in registration order.
    ///
    /// Tasks registered while stabilizing wait for the next call.
    ///
    /// # Returns
    /// Number of tasks that ran.
    pub fn stabilize(&self) -> usize {
        let batch = std::mem::take(&mut *self.queue());
        let mut ran = 0;
        for pending in batch {
            if claim(&pending.released) {
                (pending.task)();
                ran += 1;
            }
        }
        ran
    }

    /// Count queued tasks that are still waiting to fire.
    ///
    /// Cancelled tasks are pruned from the queue as a side effect.
    pub fn pending(&self) -> usize {
        let mut queue = self.queue();
        queue.retain(|pending| !pending.released.load(Ordering::Acquire));
        queue.len()
    }
}

impl StabilizationScheduler for StableTick {
    fn on_stable(&self, task: StableTask) -> StableRegistration {
        let released = Arc::new(AtomicBool::new(false));
        let mut queue = self.queue();
        // Drop cancelled tasks (and what they captured) without waiting for a
        // stabilize that may never come.
        queue.retain(|pending| !pending.released.load(Ordering::Acquire));
        queue.push_back(PendingTask {
            released: Arc::clone(&released),
            task,
        });
        StableRegistration::new(released, None)
    }
}

/// Scheduler that defers tasks onto a tokio runtime.
///
/// The spawned task yields once so work already queued on the runtime runs
/// first, then fires the continuation.
#[derive(Debug, Clone)]
pub struct TokioStable {
    handle: Handle,
}

impl TokioStable {
    /// Create a scheduler spawning onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create a scheduler for the runtime the caller is running on.
    ///
    /// # Returns
    /// `None` when called outside a tokio runtime.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl StabilizationScheduler for TokioStable {
    fn on_stable(&self, task: StableTask) -> StableRegistration {
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);
        let join = self.handle.spawn(async move {
            tokio::task::yield_now().await;
            if claim(&flag) {
                task();
            }
        });
        StableRegistration::new(released, Some(join.abort_handle()))
    }
}
