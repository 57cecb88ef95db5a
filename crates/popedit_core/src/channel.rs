//! Multicast notification streams with explicit completion.
//!
//! Every subscriber owns its own unbounded `crossbeam-channel` receiver. The
//! stream keeps the matching senders; completing the stream drops them, which
//! subscribers observe as disconnection once their queue is drained.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

struct MulticastState<T> {
    subscribers: Vec<Sender<T>>,
    completed: bool,
}

/// Hot multicast stream: subscribers only see values emitted after they
/// subscribed, and late subscribers of a completed stream see only completion.
pub struct Multicast<T> {
    name: &'static str,
    inner: Mutex<MulticastState<T>>,
    completed: Arc<AtomicBool>,
}

impl<T: Clone> Multicast<T> {
    /// Create an open stream with no subscribers.
    ///
    /// # Arguments
    /// - `name`: Stream label used in log output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(MulticastState {
                subscribers: Vec::new(),
                completed: false,
            }),
            completed: Arc::new(AtomicBool::new(false)),
        }
    }

    // Subscriber lists hold no invariants a panicking sender could break, so a
    // poisoned lock is still safe to reuse.
    fn state(&self) -> MutexGuard<'_, MulticastState<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new subscriber.
    ///
    /// # Returns
    /// A [`Subscription`] receiving every later emission. When the stream is
    /// already complete the subscription is born completed and yields nothing.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        let mut state = self.state();
        if !state.completed {
            state.subscribers.push(tx);
        }
        Subscription {
            rx,
            completed: Arc::clone(&self.completed),
        }
    }

    /// Deliver `value` to every live subscriber.
    ///
    /// # Returns
    /// The number of subscribers reached. Emitting on a completed stream is
    /// ignored and returns `0`.
    pub fn emit(&self, value: T) -> usize {
        let mut state = self.state();
        if state.completed {
            tracing::debug!(stream = self.name, "Ignoring emit on completed stream");
            return 0;
        }
        state
            .subscribers
            .retain(|tx| tx.send(value.clone()).is_ok());
        state.subscribers.len()
    }

    /// Mark the stream complete and release every subscriber.
    ///
    /// Values already delivered stay readable; afterwards subscribers observe
    /// completion. Completing twice is a no-op.
    pub fn complete(&self) {
        let mut state = self.state();
        if state.completed {
            return;
        }
        state.completed = true;
        self.completed.store(true, Ordering::Release);
        state.subscribers.clear();
    }

    /// Return `true` once [`Multicast::complete`] has run.
    pub fn is_complete(&self) -> bool {
        self.state().completed
    }

    /// Count subscribers that have not been pruned yet.
    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }
}

/// Receiving half of a [`Multicast`] stream.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: Receiver<T>,
    completed: Arc<AtomicBool>,
}

impl<T> Subscription<T> {
    /// Take the next queued value without blocking.
    pub fn try_next(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next value.
    ///
    /// # Errors
    /// Returns [`RecvTimeoutError::Disconnected`] when the stream completed and
    /// nothing is left to read, or [`RecvTimeoutError::Timeout`] otherwise.
    pub fn next_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Take every queued value without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Return `true` when the stream completed and every value was consumed.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire) && self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Multicast;
    use crossbeam_channel::RecvTimeoutError;
    use std::time::Duration;

    #[test]
    fn emit_reaches_every_current_subscriber() {
        let stream = Multicast::new("test");
        let first = stream.subscribe();
        let second = stream.subscribe();

        assert_eq!(stream.emit(7), 2);
        assert_eq!(first.drain(), vec![7]);
        assert_eq!(second.drain(), vec![7]);
    }

    #[test]
    fn subscribers_do_not_see_earlier_emissions() {
        let stream = Multicast::new("test");
        stream.emit("early");
        let late = stream.subscribe();
        assert!(late.try_next().is_none());
        assert!(!late.is_completed());
    }

    #[test]
    fn completion_keeps_queued_values_then_disconnects() {
        let stream = Multicast::new("test");
        let sub = stream.subscribe();
        stream.emit("x".to_string());
        stream.complete();

        assert!(!sub.is_completed(), "queued value must be read first");
        assert_eq!(sub.try_next().as_deref(), Some("x"));
        assert!(sub.is_completed());
        assert!(matches!(
            sub.next_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn late_subscriber_of_completed_stream_sees_only_completion() {
        let stream = Multicast::new("test");
        stream.emit(1);
        stream.complete();

        let late = stream.subscribe();
        assert!(late.drain().is_empty());
        assert!(late.is_completed());
        assert_eq!(stream.emit(2), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned_on_emit() {
        let stream = Multicast::new("test");
        let kept = stream.subscribe();
        drop(stream.subscribe());
        assert_eq!(stream.subscriber_count(), 2);

        assert_eq!(stream.emit(()), 1);
        assert_eq!(stream.subscriber_count(), 1);
        assert_eq!(kept.drain().len(), 1);
    }

    #[test]
    fn complete_is_idempotent() {
        let stream = Multicast::<u8>::new("test");
        stream.complete();
        stream.complete();
        assert!(stream.is_complete());
        assert_eq!(stream.subscriber_count(), 0);
    }
}
