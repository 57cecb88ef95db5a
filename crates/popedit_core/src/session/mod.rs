//! Lifecycle of a single open inline edit.
//!
//! A session is constructed when a lens opens and immediately becomes the
//! registry's active entry. It owns the revert snapshot while the lens is
//! open and publishes the form's final value exactly once on disposal.

use crate::blank::{Blank, ResetPolicy};
use crate::channel::{Multicast, Subscription};
use crate::constants::SESSION_ID_PREFIX;
use crate::error::EditError;
use crate::provider::FormValueProvider;
use crate::registry::ActiveEditRegistry;
use crate::scheduler::{StabilizationScheduler, StableRegistration};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

#[cfg(test)]
mod tests;

/// Process-unique identity of an edit session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    fn next() -> Self {
        static NEXT_SESSION_SEQ: AtomicU64 = AtomicU64::new(1);
        let seq = NEXT_SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{}-{}-{}",
            SESSION_ID_PREFIX,
            std::process::id(),
            seq
        ))
    }

    /// Return this id as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry shared by every session of one table.
pub type SessionRegistry = ActiveEditRegistry<SessionId>;

/// Coarse lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Registered, `init` not called yet.
    Constructed,
    /// `init` called, waiting for the host to stabilize.
    Initializing,
    /// Revert snapshot captured; the lens is editable.
    Open,
    /// `close` asked the host to dismantle the lens.
    CloseRequested,
    /// Torn down; terminal.
    Disposed,
}

struct SessionState<V> {
    phase: SessionPhase,
    revert_value: Option<V>,
    init_called: bool,
    pending_init: Option<StableRegistration>,
}

struct SessionShared<V> {
    id: SessionId,
    provider: Arc<dyn FormValueProvider<V>>,
    policy: ResetPolicy,
    state: Mutex<SessionState<V>>,
    // Held for the whole init continuation and while dispose flips the phase,
    // so a running continuation always finishes before teardown starts.
    init_gate: Mutex<()>,
}

impl<V> SessionShared<V>
where
    V: Clone + Blank + Send + 'static,
{
    fn state(&self) -> MutexGuard<'_, SessionState<V>> {
        // Every update is a plain field assignment, so a panic elsewhere cannot
        // leave the state half-written.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_live(&self) -> Result<(), EditError> {
        if self.state().phase == SessionPhase::Disposed {
            tracing::warn!(session = %self.id, "Edit session used after dispose");
            return Err(EditError::Disposed(self.id.to_string()));
        }
        Ok(())
    }

    fn capture_revert_value(&self) {
        // Read outside the lock; the provider may call back into the host.
        let value = self.provider.current_value();
        self.state().revert_value = Some(value);
    }

    fn apply_reset(&self, value: Option<V>) -> Result<(), EditError> {
        let target = match self.policy.resolve(value) {
            Some(value) => value,
            None => self
                .state()
                .revert_value
                .clone()
                .ok_or(EditError::RevertValueUnset)?,
        };
        self.provider.apply_value(target);
        Ok(())
    }

    fn init_gate(&self) -> MutexGuard<'_, ()> {
        self.init_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish_init(&self, previous: Option<V>) {
        let _gate = self.init_gate();
        if self.state().phase == SessionPhase::Disposed {
            tracing::debug!(session = %self.id, "Skipping init continuation for disposed session");
            return;
        }
        self.capture_revert_value();
        if let Some(previous) = self.policy.resolve(previous) {
            self.provider.apply_value(previous);
        }
        let mut state = self.state();
        if state.phase == SessionPhase::Initializing {
            state.phase = SessionPhase::Open;
        }
        tracing::debug!(session = %self.id, phase = ?state.phase, "Edit session initialized");
    }
}

/// Coordinates one open lens with the shared [`SessionRegistry`].
///
/// The host drives every call from a single logical owner and must call
/// [`EditSession::dispose`] when the lens is dismantled. Dropping an
/// undisposed session performs the same teardown.
pub struct EditSession<V>
where
    V: Clone + Blank + Send + 'static,
{
    shared: Arc<SessionShared<V>>,
    registry: Arc<SessionRegistry>,
    final_values: Multicast<V>,
    blurs: Multicast<()>,
}

impl<V> EditSession<V>
where
    V: Clone + Blank + Send + 'static,
{
    /// Open a session and make it the registry's active entry.
    ///
    /// Nothing is read from `provider` yet; it may still be initializing.
    ///
    /// # Arguments
    /// - `provider`: Live form backing the lens.
    /// - `registry`: Registry shared by all lenses of the table.
    ///
    /// # Returns
    /// A session in [`SessionPhase::Constructed`].
    ///
    /// # Errors
    /// Returns [`EditError::Registry`] when the registry is poisoned.
    pub fn new(
        provider: Arc<dyn FormValueProvider<V>>,
        registry: Arc<SessionRegistry>,
    ) -> Result<Self, EditError> {
        Self::with_policy(provider, registry, ResetPolicy::default())
    }

    /// Open a session with an explicit reset resolution policy.
    ///
    /// # Errors
    /// Returns [`EditError::Registry`] when the registry is poisoned.
    pub fn with_policy(
        provider: Arc<dyn FormValueProvider<V>>,
        registry: Arc<SessionRegistry>,
        policy: ResetPolicy,
    ) -> Result<Self, EditError> {
        let id = SessionId::next();
        let superseded = registry.set_active(id.clone())?;
        tracing::debug!(session = %id, ?superseded, %policy, "Edit session opened");
        Ok(Self {
            shared: Arc::new(SessionShared {
                id,
                provider,
                policy,
                state: Mutex::new(SessionState {
                    phase: SessionPhase::Constructed,
                    revert_value: None,
                    init_called: false,
                    pending_init: None,
                }),
                init_gate: Mutex::new(()),
            }),
            registry,
            final_values: Multicast::new("final-value"),
            blurs: Multicast::new("blurred"),
        })
    }

    /// Identity used in the registry.
    pub fn id(&self) -> &SessionId {
        &self.shared.id
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.shared.state().phase
    }

    /// Resolution policy applied by [`EditSession::reset`] and `init`.
    pub fn policy(&self) -> ResetPolicy {
        self.shared.policy
    }

    /// Snapshot a bare [`EditSession::reset`] restores, once captured.
    pub fn revert_value(&self) -> Option<V> {
        self.shared.state().revert_value.clone()
    }

    /// Check whether this session is still the registry's active entry.
    ///
    /// # Errors
    /// Returns [`EditError::Registry`] when the registry is poisoned.
    pub fn is_active(&self) -> Result<bool, EditError> {
        Ok(self.registry.is_active(self.id())?)
    }

    /// Schedule initialization for when the host form has stabilized.
    ///
    /// The continuation captures the live value as the revert snapshot and
    /// then, if `previous` resolves to a value, applies it to the form while
    /// leaving the snapshot untouched. It holds only a weak reference to the
    /// session and does nothing once the session is disposed.
    ///
    /// # Arguments
    /// - `previous`: Previously saved content to restore, if any.
    /// - `scheduler`: Primitive signalling stabilization.
    ///
    /// # Errors
    /// Returns [`EditError::AlreadyInitialized`] on a second call, or
    /// [`EditError::Disposed`] after teardown.
    pub fn init<S>(&self, previous: Option<V>, scheduler: &S) -> Result<(), EditError>
    where
        S: StabilizationScheduler + ?Sized,
    {
        {
            let mut state = self.shared.state();
            if state.phase == SessionPhase::Disposed {
                return Err(EditError::Disposed(self.id().to_string()));
            }
            if state.init_called {
                return Err(EditError::AlreadyInitialized(self.id().to_string()));
            }
            state.init_called = true;
            if state.phase == SessionPhase::Constructed {
                state.phase = SessionPhase::Initializing;
            }
        }

        let weak: Weak<SessionShared<V>> = Arc::downgrade(&self.shared);
        let registration = scheduler.on_stable(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.finish_init(previous);
            }
        }));
        let mut state = self.shared.state();
        if state.phase != SessionPhase::Disposed {
            state.pending_init = Some(registration);
        }
        tracing::debug!(session = %self.id(), "Edit init deferred until stable");
        Ok(())
    }

    /// Validity reported by the provider; `None` while undetermined.
    pub fn is_valid(&self) -> Option<bool> {
        self.shared.provider.current_validity()
    }

    /// Replace the revert snapshot with the form's live value.
    ///
    /// # Errors
    /// Returns [`EditError::Disposed`] after teardown.
    pub fn update_revert_value(&self) -> Result<(), EditError> {
        self.shared.ensure_live()?;
        self.shared.capture_revert_value();
        Ok(())
    }

    /// Ask the host to stop editing.
    ///
    /// Pushes the close marker on the registry's change stream. The session
    /// stays alive until the host disposes it.
    ///
    /// # Errors
    /// Returns [`EditError::Disposed`] after teardown, or
    /// [`EditError::Registry`] when the registry is poisoned.
    pub fn close(&self) -> Result<(), EditError> {
        self.shared.ensure_live()?;
        self.registry.request_close()?;
        let mut state = self.shared.state();
        if state.phase != SessionPhase::Disposed {
            state.phase = SessionPhase::CloseRequested;
        }
        tracing::debug!(session = %self.id(), "Edit close requested");
        Ok(())
    }

    /// Announce a blur to focus-tracking subscribers.
    ///
    /// # Errors
    /// Returns [`EditError::Disposed`] after teardown.
    pub fn blur(&self) -> Result<(), EditError> {
        self.shared.ensure_live()?;
        self.blurs.emit(());
        Ok(())
    }

    /// Reset the form to `value`, or to the revert snapshot.
    ///
    /// `value` is resolved through the session's [`ResetPolicy`]; with the
    /// default policy a blank value behaves like `None`.
    ///
    /// # Errors
    /// Returns [`EditError::RevertValueUnset`] when falling back before a
    /// snapshot exists, or [`EditError::Disposed`] after teardown.
    pub fn reset(&self, value: Option<V>) -> Result<(), EditError> {
        self.shared.ensure_live()?;
        self.shared.apply_reset(value)
    }

    /// Subscribe to the final value published on disposal.
    ///
    /// Subscribing after disposal yields only completion.
    pub fn final_values(&self) -> Subscription<V> {
        self.final_values.subscribe()
    }

    /// Subscribe to blur notifications.
    pub fn blurs(&self) -> Subscription<()> {
        self.blurs.subscribe()
    }

    /// Tear the session down.
    ///
    /// Releases a pending init continuation, clears this session from the
    /// registry if it is still active, publishes the live form value on
    /// [`EditSession::final_values`], then completes both streams. Calling it
    /// again is a no-op. An init continuation already running elsewhere
    /// completes first; one that has not started never runs.
    ///
    /// Must not be called from inside the provider while it serves the init
    /// continuation.
    ///
    /// # Errors
    /// Returns [`EditError::Registry`] when the registry is poisoned; the
    /// final value is still published in that case.
    pub fn dispose(&self) -> Result<(), EditError> {
        let pending_init = {
            // Waits for an init continuation already running on another thread.
            let _gate = self.shared.init_gate();
            let mut state = self.shared.state();
            if state.phase == SessionPhase::Disposed {
                tracing::debug!(session = %self.id(), "Ignoring repeated dispose");
                return Ok(());
            }
            state.phase = SessionPhase::Disposed;
            state.pending_init.take()
        };
        if let Some(registration) = pending_init {
            registration.release();
        }

        let unset = self.registry.unset_active(self.id());
        let final_value = self.shared.provider.current_value();
        self.final_values.emit(final_value);
        self.final_values.complete();
        self.blurs.complete();

        let was_active = unset?;
        tracing::debug!(session = %self.id(), was_active, "Edit session disposed");
        Ok(())
    }
}

impl<V> Drop for EditSession<V>
where
    V: Clone + Blank + Send + 'static,
{
    fn drop(&mut self) {
        if self.phase() == SessionPhase::Disposed {
            return;
        }
        tracing::warn!(session = %self.id(), "Edit session dropped without dispose");
        if let Err(err) = self.dispose() {
            tracing::error!(session = %self.id(), "Teardown on drop failed: {}", err);
        }
    }
}

impl<V> fmt::Debug for EditSession<V>
where
    V: Clone + Blank + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSession")
            .field("id", self.id())
            .field("phase", &self.phase())
            .field("policy", &self.shared.policy)
            .finish()
    }
}
