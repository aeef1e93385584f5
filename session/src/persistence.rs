//! Persistence contract between a session and an external store.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};

use merge_forge_core::{BoardSnapshot, Mission, Reward, Stats, Tier};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a persisted session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps the provided identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secondary rewards accumulated from claimed missions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Secondary currency.
    pub currency: u64,
    /// Experience points.
    pub experience: u64,
}

impl Wallet {
    /// Adds the non-score parts of a reward.
    pub fn credit(&mut self, reward: &Reward) {
        self.currency = self
            .currency
            .saturating_add(reward.currency.unwrap_or(0));
        self.experience = self.experience.saturating_add(reward.experience);
    }
}

/// Owned point-in-time copy of everything a session persists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    /// Board, score and highest tier.
    pub board: BoardSnapshot,
    /// Mission progress.
    #[serde(default)]
    pub missions: Vec<Mission>,
    /// Cumulative statistics.
    #[serde(default)]
    pub stats: Stats,
    /// Claimed secondary rewards.
    #[serde(default)]
    pub wallet: Wallet,
    /// Milliseconds since the Unix epoch when the copy was taken.
    #[serde(default)]
    pub last_saved_ms: u64,
}

/// One row of the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Session the score belongs to.
    pub session: SessionId,
    /// Board score.
    pub score: u64,
    /// Highest tier reached.
    pub highest_tier: Tier,
}

/// Failures reported by a [`SessionStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A partial update targeted a session that was never saved.
    #[error("session {0} has not been saved yet")]
    MissingSession(SessionId),
    /// The store was closed.
    #[error("store is closed")]
    Closed,
    /// Reading or writing the backing medium failed.
    #[error("store i/o failed")]
    Io(#[from] io::Error),
    /// Stored data could not be encoded or decoded.
    #[error("stored data is malformed: {0}")]
    Malformed(String),
}

/// External store for session state.
///
/// Partial updates leave every other field of the saved session alone.
pub trait SessionStore: Send {
    /// Writes the full session, replacing any previous copy.
    fn save(&mut self, id: &SessionId, session: &SavedSession) -> Result<(), StoreError>;

    /// Reads the full session, `None` when nothing was saved.
    fn load(&self, id: &SessionId) -> Result<Option<SavedSession>, StoreError>;

    /// Overwrites the score and highest tier of a saved session.
    fn update_score(
        &mut self,
        id: &SessionId,
        score: u64,
        highest_tier: Tier,
    ) -> Result<(), StoreError>;

    /// Overwrites the statistics of a saved session.
    fn update_stats(&mut self, id: &SessionId, stats: Stats) -> Result<(), StoreError>;

    /// Best sessions ordered by descending score, ties by identifier.
    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;

    /// Releases the store. Later operations fail with [`StoreError::Closed`].
    fn close(&mut self) -> Result<(), StoreError>;
}

/// Orders saved sessions into leaderboard rows.
pub fn rank_sessions<'a, I>(sessions: I, limit: usize) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = (&'a SessionId, &'a SavedSession)>,
{
    let mut entries: Vec<LeaderboardEntry> = sessions
        .into_iter()
        .map(|(id, saved)| LeaderboardEntry {
            session: id.clone(),
            score: saved.board.score,
            highest_tier: saved.board.highest_tier,
        })
        .collect();
    entries.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => a.session.cmp(&b.session),
        other => other,
    });
    entries.truncate(limit);
    entries
}

#[derive(Debug, Default)]
struct MemoryState {
    sessions: BTreeMap<SessionId, SavedSession>,
    closed: bool,
}

/// In-process store. Clones share the same contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(
        &self,
        operation: impl FnOnce(&mut MemoryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Malformed("memory store lock poisoned".to_owned()))?;
        if state.closed {
            return Err(StoreError::Closed);
        }
        operation(&mut state)
    }

    fn with_saved(
        &self,
        id: &SessionId,
        update: impl FnOnce(&mut SavedSession),
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            let saved = state
                .sessions
                .get_mut(id)
                .ok_or_else(|| StoreError::MissingSession(id.clone()))?;
            update(saved);
            Ok(())
        })
    }
}

impl SessionStore for MemoryStore {
    fn save(&mut self, id: &SessionId, session: &SavedSession) -> Result<(), StoreError> {
        self.with_state(|state| {
            let _ = state.sessions.insert(id.clone(), session.clone());
            Ok(())
        })
    }

    fn load(&self, id: &SessionId) -> Result<Option<SavedSession>, StoreError> {
        self.with_state(|state| Ok(state.sessions.get(id).cloned()))
    }

    fn update_score(
        &mut self,
        id: &SessionId,
        score: u64,
        highest_tier: Tier,
    ) -> Result<(), StoreError> {
        self.with_saved(id, |saved| {
            saved.board.score = score;
            saved.board.highest_tier = highest_tier;
        })
    }

    fn update_stats(&mut self, id: &SessionId, stats: Stats) -> Result<(), StoreError> {
        self.with_saved(id, |saved| saved.stats = stats)
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        self.with_state(|state| Ok(rank_sessions(&state.sessions, limit)))
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.with_state(|state| {
            state.closed = true;
            Ok(())
        })
    }
}
