//! In-memory session history store backed by `DashMap`.
//!
//! Each session key maps to an ordered `Vec<Turn>`. Every operation touches
//! exactly one map entry, so the shard lock taken by `DashMap` serializes
//! operations on the same key while leaving other keys independent.
//! Reads clone the requested turns so no `DashMap` guard outlives a call.

use dashmap::DashMap;
use recall_types::chat::{Session, Turn};
use tracing::{debug, info};

/// Process-wide mapping from session key to its transcript.
///
/// Construct one at startup and share it (e.g. behind an `Arc`) with every
/// component that needs session access.
#[derive(Debug, Default)]
pub struct SessionHistoryStore {
    sessions: DashMap<String, Vec<Turn>>,
}

impl SessionHistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Append a turn to the end of a session, creating the session if absent.
    pub fn append(&self, session_key: &str, turn: Turn) {
        let mut turns = self.sessions.entry(session_key.to_string()).or_default();
        turns.push(turn);
        debug!(session_key, len = turns.len(), "appended turn");
    }

    /// Append several turns as one atomic step.
    ///
    /// No concurrent `window` on the same key observes a prefix of `turns`.
    pub fn extend(&self, session_key: &str, turns: impl IntoIterator<Item = Turn>) {
        let mut existing = self.sessions.entry(session_key.to_string()).or_default();
        let before = existing.len();
        existing.extend(turns);
        debug!(
            session_key,
            added = existing.len() - before,
            len = existing.len(),
            "appended turns"
        );
    }

    /// The last `k` turns of a session in chronological order.
    ///
    /// Returns every turn when the session holds fewer than `k`, and an empty
    /// vector for `k == 0` or an unknown key. Never creates a session.
    pub fn window(&self, session_key: &str, k: usize) -> Vec<Turn> {
        if k == 0 {
            return Vec::new();
        }

        match self.sessions.get(session_key) {
            Some(turns) => {
                let start = turns.len().saturating_sub(k);
                let window = turns[start..].to_vec();
                debug!(session_key, k, returned = window.len(), "windowed history");
                window
            }
            None => Vec::new(),
        }
    }

    /// Clear a session's turns while keeping its key. Idempotent.
    pub fn reset(&self, session_key: &str) {
        let mut turns = self.sessions.entry(session_key.to_string()).or_default();
        let dropped = turns.len();
        turns.clear();
        info!(session_key, dropped, "session reset");
    }

    /// Drop a session key entirely. Returns `true` if the key existed.
    pub fn remove(&self, session_key: &str) -> bool {
        let removed = self.sessions.remove(session_key).is_some();
        if removed {
            info!(session_key, "session removed");
        }
        removed
    }

    /// Number of turns currently stored for a session (0 if unknown).
    pub fn len(&self, session_key: &str) -> usize {
        self.sessions.get(session_key).map_or(0, |turns| turns.len())
    }

    /// Whether the key has been created by `append`, `extend` or `reset`.
    ///
    /// This and [`session_keys`](Self::session_keys) are the only views
    /// that tell a never-used key apart from a freshly reset one; `window`,
    /// `len` and `full_history` treat both as an empty session.
    pub fn contains(&self, session_key: &str) -> bool {
        self.sessions.contains_key(session_key)
    }

    /// All known session keys, sorted. Includes reset sessions, which
    /// [`contains`](Self::contains) also reports.
    pub fn session_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Every turn of a session, oldest first.
    pub fn full_history(&self, session_key: &str) -> Vec<Turn> {
        self.sessions
            .get(session_key)
            .map(|turns| turns.value().clone())
            .unwrap_or_default()
    }

    /// Copy of every session, sorted by key.
    ///
    /// Each session is copied under its own lock, so the snapshot is
    /// per-session consistent but not a global point-in-time view.
    pub fn snapshot(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .map(|r| Session {
                key: r.key().clone(),
                turns: r.value().clone(),
            })
            .collect();
        sessions.sort_by(|a, b| a.key.cmp(&b.key));
        sessions
    }

    /// Replace the store's contents with the given sessions.
    ///
    /// Sessions sharing a key are concatenated in the order given. Meant for
    /// startup; concurrent writers may interleave with the reload.
    pub fn restore(&self, sessions: Vec<Session>) {
        self.sessions.clear();
        let count = sessions.len();
        for session in sessions {
            self.sessions
                .entry(session.key)
                .or_default()
                .extend(session.turns);
        }
        info!(sessions = count, "history restored");
    }
}
