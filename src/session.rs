//! Per-session favorites and notes
//!
//! Session state is created empty on first use, lives only for the session,
//! and is never persisted. The registry gives each session exclusive
//! ownership of its state: no session id can reach another's favorites or
//! notes.

use std::collections::BTreeSet;
use std::sync::RwLock;

use rustc_hash::FxHashMap;

/// Favorites and notes for one interactive session.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SessionState {
    favorites: BTreeSet<String>,
    notes: FxHashMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::default()
    }

    /// Flip favorite membership; returns the state after the flip.
    /// Toggling twice restores the original state.
    pub fn toggle_favorite(&mut self, name: &str) -> bool {
        if self.favorites.remove(name) {
            false
        } else {
            self.favorites.insert(name.to_string());
            true
        }
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.contains(name)
    }

    /// Favorites in alphabetical order, ready for display.
    pub fn favorites(&self) -> impl Iterator<Item = &str> + '_ {
        self.favorites.iter().map(String::as_str)
    }

    pub fn favorite_count(&self) -> usize {
        self.favorites.len()
    }

    /// Upsert the note for a strain. Empty text is a saved note, distinct
    /// from never having saved one.
    pub fn set_note(&mut self, name: &str, text: &str) {
        self.notes.insert(name.to_string(), text.to_string());
    }

    pub fn note(&self, name: &str) -> Option<&str> {
        self.notes.get(name).map(String::as_str)
    }

    pub fn notes(&self) -> &FxHashMap<String, String> {
        &self.notes
    }
}

/// Process-wide registry of live sessions, keyed by session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<FxHashMap<String, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Run `op` against the session's state, creating the session empty on
    /// first use.
    pub fn with_session<T>(&self, id: &str, op: impl FnOnce(&mut SessionState) -> T) -> T {
        let mut sessions = self.sessions.write().expect("session registry poisoned");
        op(sessions.entry(id.to_string()).or_default())
    }

    /// Clone the session's current state, if the session exists.
    pub fn snapshot(&self, id: &str) -> Option<SessionState> {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .get(id)
            .cloned()
    }

    /// Discard the session's state. Returns whether a session existed.
    pub fn end(&self, id: &str) -> bool {
        self.sessions
            .write()
            .expect("session registry poisoned")
            .remove(id)
            .is_some()
    }
}
