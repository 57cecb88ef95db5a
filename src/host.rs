//! Minimal lens host reacting to registry announcements.
//!
//! The host owns the open sessions of one table. It dismantles lenses when the
//! registry announces a close, or when a newer lens supersedes them.

use popedit_core::{
    ActiveChange, Blank, EditError, EditSession, FormValueProvider, ResetPolicy, SessionId,
    SessionRegistry, Subscription,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Owns open lenses and disposes them in response to registry changes.
pub struct LensHost<V>
where
    V: Clone + Blank + Send + 'static,
{
    registry: Arc<SessionRegistry>,
    changes: Subscription<ActiveChange<SessionId>>,
    lenses: HashMap<SessionId, EditSession<V>>,
    policy: ResetPolicy,
}

impl<V> LensHost<V>
where
    V: Clone + Blank + Send + 'static,
{
    /// Create a host with its own registry.
    pub fn new(policy: ResetPolicy) -> Self {
        Self::with_registry(Arc::new(SessionRegistry::new()), policy)
    }

    /// Create a host sharing an existing registry.
    pub fn with_registry(registry: Arc<SessionRegistry>, policy: ResetPolicy) -> Self {
        let changes = registry.changes();
        Self {
            registry,
            changes,
            lenses: HashMap::new(),
            policy,
        }
    }

    /// Registry shared by this host's lenses.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Open a lens over `provider`; the new session becomes active.
    ///
    /// # Returns
    /// Id of the new session.
    ///
    /// # Errors
    /// Returns [`EditError::Registry`] when the registry is poisoned.
    pub fn open(&mut self, provider: Arc<dyn FormValueProvider<V>>) -> Result<SessionId, EditError> {
        let session = EditSession::with_policy(provider, Arc::clone(&self.registry), self.policy)?;
        let id = session.id().clone();
        self.lenses.insert(id.clone(), session);
        Ok(id)
    }

    /// Look up an open lens.
    pub fn session(&self, id: &SessionId) -> Option<&EditSession<V>> {
        self.lenses.get(id)
    }

    /// Number of lenses still open.
    pub fn open_count(&self) -> usize {
        self.lenses.len()
    }

    /// Apply every pending registry announcement.
    ///
    /// Announcements are emitted in registry order, so the last one pending
    /// describes the current state: after an activation every other lens is
    /// dismantled, after a close marker all of them are.
    ///
    /// # Returns
    /// Ids of the lenses dismantled.
    ///
    /// # Errors
    /// Returns the first disposal error; remaining lenses are still dismantled.
    pub fn pump(&mut self) -> Result<Vec<SessionId>, EditError> {
        let keep = match self.changes.drain().pop() {
            Some(ActiveChange::Activated(id)) => Some(id),
            Some(ActiveChange::Closed) => None,
            None => return Ok(Vec::new()),
        };
        let doomed: Vec<SessionId> = self
            .lenses
            .keys()
            .filter(|id| keep.as_ref() != Some(*id))
            .cloned()
            .collect();

        let mut dismantled = Vec::with_capacity(doomed.len());
        let mut first_error = None;
        for id in doomed {
            if let Some(session) = self.lenses.remove(&id) {
                if let Err(err) = session.dispose() {
                    tracing::warn!(session = %id, "Lens teardown failed: {}", err);
                    first_error.get_or_insert(err);
                }
                dismantled.push(id);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(dismantled),
        }
    }

    /// Dispose every open lens.
    ///
    /// # Errors
    /// Returns the first disposal error; remaining lenses are still disposed.
    pub fn shutdown(&mut self) -> Result<(), EditError> {
        let mut first_error = None;
        for (id, session) in self.lenses.drain() {
            if let Err(err) = session.dispose() {
                tracing::warn!(session = %id, "Lens teardown failed: {}", err);
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
