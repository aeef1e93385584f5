#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! JSON file store for Merge Forge sessions.
//!
//! Every session lives in its own pretty-printed document inside a single
//! directory, which is created when the store is opened.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use merge_forge_core::{Stats, Tier};
use merge_forge_session::{
    rank_sessions, LeaderboardEntry, SavedSession, SessionId, SessionStore, StoreError,
};
use serde::{Deserialize, Serialize};

const EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    id: SessionId,
    #[serde(flatten)]
    session: SavedSession,
}

/// Store keeping one JSON document per session.
#[derive(Debug)]
pub struct JsonFileStore {
    directory: PathBuf,
    closed: bool,
}

impl JsonFileStore {
    /// Opens the store, creating `directory` if needed.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        info!("opened session store at {}", directory.display());
        Ok(Self {
            directory,
            closed: false,
        })
    }

    /// Directory holding the session documents.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.directory
            .join(format!("{}.{EXTENSION}", file_stem(id.as_str())))
    }

    fn read(path: &Path) -> Result<Option<StoredSession>, StoreError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|error| StoreError::Malformed(format!("{}: {error}", path.display())))
    }

    /// Reads the document for `id`, ignoring one that belongs to another session.
    fn read_owned(&self, id: &SessionId) -> Result<Option<StoredSession>, StoreError> {
        let path = self.path_for(id);
        match Self::read(&path)? {
            Some(stored) if stored.id == *id => Ok(Some(stored)),
            Some(stored) => {
                warn!(
                    "{} holds session {} rather than {id}",
                    path.display(),
                    stored.id
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn write(&self, stored: &StoredSession) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(stored)
            .map_err(|error| StoreError::Malformed(error.to_string()))?;
        let path = self.path_for(&stored.id);
        fs::write(&path, json)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    fn update(
        &mut self,
        id: &SessionId,
        apply: impl FnOnce(&mut SavedSession),
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut stored = self
            .read_owned(id)?
            .ok_or_else(|| StoreError::MissingSession(id.clone()))?;
        apply(&mut stored.session);
        self.write(&stored)
    }

    fn stored_sessions(&self) -> Result<Vec<StoredSession>, StoreError> {
        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            match Self::read(&path) {
                Ok(Some(stored)) => sessions.push(stored),
                Ok(None) => {}
                Err(error) => warn!("skipping unreadable session file: {error}"),
            }
        }
        Ok(sessions)
    }
}

impl SessionStore for JsonFileStore {
    fn save(&mut self, id: &SessionId, session: &SavedSession) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.write(&StoredSession {
            id: id.clone(),
            session: session.clone(),
        })
    }

    fn load(&self, id: &SessionId) -> Result<Option<SavedSession>, StoreError> {
        self.ensure_open()?;
        Ok(self.read_owned(id)?.map(|stored| stored.session))
    }

    fn update_score(
        &mut self,
        id: &SessionId,
        score: u64,
        highest_tier: Tier,
    ) -> Result<(), StoreError> {
        self.update(id, |session| {
            session.board.score = score;
            session.board.highest_tier = highest_tier;
        })
    }

    fn update_stats(&mut self, id: &SessionId, stats: Stats) -> Result<(), StoreError> {
        self.update(id, |session| session.stats = stats)
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        self.ensure_open()?;
        let sessions = self.stored_sessions()?;
        Ok(rank_sessions(
            sessions.iter().map(|stored| (&stored.id, &stored.session)),
            limit,
        ))
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.closed = true;
        info!("closed session store at {}", self.directory.display());
        Ok(())
    }
}

/// Turns a session identifier into a file name, one name per identifier.
///
/// Lowercase ASCII letters, digits, `_` and `-` are kept. Every other byte,
/// including uppercase letters for case-insensitive file systems, becomes
/// `%XX`. The empty identifier maps to a lone `%`, which no other identifier
/// produces.
fn file_stem(id: &str) -> String {
    if id.is_empty() {
        return "%".to_owned();
    }
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_' || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}
