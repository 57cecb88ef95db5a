//! Shared registry tracking which edit session is currently active.

use crate::channel::{Multicast, Subscription};
use crate::error::RegistryError;
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard};

/// Change announced on [`ActiveEditRegistry::changes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveChange<S> {
    /// `entry` became the active session, superseding any previous one.
    Activated(S),
    /// No session should be considered editing any more.
    Closed,
}

impl<S> ActiveChange<S> {
    /// Return the newly active entry, or `None` for the close marker.
    pub fn active(&self) -> Option<&S> {
        match self {
            Self::Activated(entry) => Some(entry),
            Self::Closed => None,
        }
    }
}

/// Tracks at most one active entry and announces changes to it.
///
/// Each operation takes the inner lock once, so concurrent
/// `set_active`/`unset_active` calls are serialized.
pub struct ActiveEditRegistry<S> {
    active: Mutex<Option<S>>,
    changes: Multicast<ActiveChange<S>>,
}

impl<S> Default for ActiveEditRegistry<S>
where
    S: Clone + PartialEq + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ActiveEditRegistry<S>
where
    S: Clone + PartialEq + Debug,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
            changes: Multicast::new("active-edit-changes"),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, Option<S>>, RegistryError> {
        self.active.lock().map_err(|_| RegistryError::Poisoned)
    }

    /// Make `entry` the active one.
    ///
    /// The previous entry is superseded, not destroyed.
    ///
    /// # Arguments
    /// - `entry`: Identity of the session becoming active.
    ///
    /// # Returns
    /// The superseded entry, if another one was active.
    ///
    /// # Errors
    /// Returns [`RegistryError::Poisoned`] when registry state is poisoned.
    pub fn set_active(&self, entry: S) -> Result<Option<S>, RegistryError> {
        let mut active = self.state()?;
        let previous = active.replace(entry.clone());
        if let Some(previous) = previous.as_ref() {
            tracing::debug!(superseded = ?previous, active = ?entry, "Active edit superseded");
        }
        // Announce under the lock so change order matches state order.
        self.changes.emit(ActiveChange::Activated(entry));
        Ok(previous)
    }

    /// Clear the active entry if it is `entry`.
    ///
    /// Unsetting an entry that is not active is expected (a newer session has
    /// superseded it) and leaves the registry untouched.
    ///
    /// # Returns
    /// `Ok(true)` when `entry` was active and has been cleared.
    ///
    /// # Errors
    /// Returns [`RegistryError::Poisoned`] when registry state is poisoned.
    pub fn unset_active(&self, entry: &S) -> Result<bool, RegistryError> {
        let mut active = self.state()?;
        if active.as_ref() == Some(entry) {
            *active = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Announce that nothing should be editing.
    ///
    /// Only pushes [`ActiveChange::Closed`]; the lens host reacts by
    /// dismantling the lens, which disposes the session and clears the entry.
    ///
    /// # Errors
    /// Returns [`RegistryError::Poisoned`] when registry state is poisoned.
    pub fn request_close(&self) -> Result<(), RegistryError> {
        let _active = self.state()?;
        self.changes.emit(ActiveChange::Closed);
        Ok(())
    }

    /// Return the active entry, if any.
    ///
    /// # Errors
    /// Returns [`RegistryError::Poisoned`] when registry state is poisoned.
    pub fn active(&self) -> Result<Option<S>, RegistryError> {
        Ok(self.state()?.clone())
    }

    /// Check whether `entry` is the active one.
    ///
    /// # Errors
    /// Returns [`RegistryError::Poisoned`] when registry state is poisoned.
    pub fn is_active(&self, entry: &S) -> Result<bool, RegistryError> {
        Ok(self.state()?.as_ref() == Some(entry))
    }

    /// Subscribe to activation and close announcements.
    pub fn changes(&self) -> Subscription<ActiveChange<S>> {
        self.changes.subscribe()
    }
}
