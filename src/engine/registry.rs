//! Player registry: one [`PlaybackSession`] per connected player

use std::collections::HashMap;

use crate::session::PlaybackSession;
use crate::types::SessionId;

/// Sessions keyed by bus sender
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SessionId, PlaybackSession>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `id`, creating a stopped one if it is unknown.
    pub fn upsert(&mut self, id: &SessionId) -> &mut PlaybackSession {
        self.sessions.entry(id.clone()).or_default()
    }

    /// Evict a session
    pub fn remove(&mut self, id: &SessionId) -> Option<PlaybackSession> {
        self.sessions.remove(id)
    }

    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<&PlaybackSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut PlaybackSession> {
        self.sessions.get_mut(id)
    }

    /// Snapshot of the current ids, sorted.
    ///
    /// Callers iterate the snapshot so sessions can be removed mid-pass.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
