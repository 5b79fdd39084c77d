//! In-memory tab store
//!
//! Maps tab ids to their state for the session that is currently mounted.
//! Iteration follows insertion order, but the tab bar order is owned by the
//! location, never by this map.
//!
//! Every mutation except [`TabStateStore::import`] flags the store as needing
//! a write. Whoever owns persistence drains that flag with
//! [`TabStateStore::take_pending_write`] and saves a full snapshot.

use indexmap::IndexMap;

use crate::{Result, TabError, TabId, TabPatch, TabState};

#[derive(Clone, Debug, Default)]
pub struct TabStateStore {
    states: IndexMap<TabId, TabState>,
    pending_write: bool,
}

impl TabStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &TabId) -> Option<&TabState> {
        self.states.get(id)
    }

    pub fn contains(&self, id: &TabId) -> bool {
        self.states.contains_key(id)
    }

    /// Insert a new tab. Creating an id that already exists is an error.
    pub fn create(&mut self, state: TabState) -> Result<()> {
        self.insert(state)?;
        self.pending_write = true;
        Ok(())
    }

    /// Insert a tab that already exists in durable storage, without
    /// scheduling a write for it.
    pub fn import(&mut self, state: TabState) -> Result<()> {
        self.insert(state)
    }

    fn insert(&mut self, state: TabState) -> Result<()> {
        let id = state.id().clone();
        if self.states.contains_key(&id) {
            return Err(TabError::DuplicateId(id));
        }
        tracing::trace!(tab_id = %id, kind = %state.kind(), "tab added to store");
        self.states.insert(id, state);
        Ok(())
    }

    pub fn remove(&mut self, id: &TabId) -> Result<TabState> {
        let state = self
            .states
            .shift_remove(id)
            .ok_or_else(|| TabError::NotFound(id.clone()))?;
        self.pending_write = true;
        tracing::trace!(tab_id = %id, "tab removed from store");
        Ok(state)
    }

    /// Apply a partial update. Returns whether the tab changed.
    pub fn update(&mut self, id: &TabId, patch: &TabPatch) -> Result<bool> {
        let state = self
            .states
            .get_mut(id)
            .ok_or_else(|| TabError::NotFound(id.clone()))?;
        let changed = state.apply(patch);
        if changed {
            self.pending_write = true;
        }
        Ok(changed)
    }

    pub fn list_all(&self) -> &IndexMap<TabId, TabState> {
        &self.states
    }

    pub fn ids(&self) -> impl Iterator<Item = &TabId> {
        self.states.keys()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drop every tab without scheduling a write. Used when the session key
    /// changes and the old tab set must not leak into the new one.
    pub fn reset(&mut self) {
        self.states.clear();
        self.pending_write = false;
    }

    /// Full copy of the current states, as written to durable storage
    pub fn snapshot(&self) -> IndexMap<TabId, TabState> {
        self.states.clone()
    }

    /// Whether a mutation happened since the last call, clearing the flag
    pub fn take_pending_write(&mut self) -> bool {
        std::mem::take(&mut self.pending_write)
    }
}

#[cfg(test)]
mod tests;
