use chrono::{DateTime, Utc};
use reversi_engine::{Board, Side};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

pub type MatchId = String;

/// Lifecycle status of a match. Every status other than `Active` is
/// terminal: the record stays queryable but accepts no further actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Active,
    FinishedStalemate,
    Resigned,
    Draw,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MatchStatus::Active)
    }
}

/// The persisted unit of play.
///
/// `player1` always holds the dark stones and `player2` the light ones.
/// `version` increases by one on every committed update and keys the
/// store's conditional writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub player1: String,
    pub player2: String,
    pub board: Board,
    pub turn: Side,
    pub pass_count: u8,
    pub draw_offer_by: Option<String>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl MatchRecord {
    /// The side a participant plays, or `None` for outsiders.
    pub fn participant_side(&self, handle: &str) -> Option<Side> {
        if handle == self.player1 {
            Some(Side::Dark)
        } else if handle == self.player2 {
            Some(Side::Light)
        } else {
            None
        }
    }

    pub fn side_holder(&self, side: Side) -> &str {
        match side {
            Side::Dark => &self.player1,
            Side::Light => &self.player2,
        }
    }

    pub fn involves(&self, handle: &str) -> bool {
        handle == self.player1 || handle == self.player2
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Version conflict updating match {0}")]
    VersionConflict(MatchId),
    #[error("No such match to update: {0}")]
    MissingRecord(MatchId),
    #[error("Duplicate match id on insert: {0}")]
    DuplicateId(MatchId),
    #[error("Corrupt record for match {id}: {reason}")]
    CorruptRecord { id: MatchId, reason: String },
    #[error("Record storage poisoned")]
    StoragePoisoned,
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Keyed record store boundary for match persistence.
///
/// `update` is conditional on the version the caller read; a mismatch
/// yields [`StoreError::VersionConflict`] and writes nothing. Implementations
/// must persist each record as one atomic value.
pub trait MatchStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<MatchRecord>, StoreError>;

    fn insert(&self, record: &MatchRecord) -> Result<(), StoreError>;

    fn update(&self, expected_version: u64, record: &MatchRecord) -> Result<(), StoreError>;

    /// The most recently updated active match involving `handle`, if any.
    fn latest_active_for(&self, handle: &str) -> Result<Option<MatchRecord>, StoreError>;
}

/// In-process store keeping each record as a serialized JSON row, so every
/// read and write exercises the same nested-grid board encoding a real
/// backend would persist.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<MatchId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(id: &str, row: &str) -> Result<MatchRecord, StoreError> {
        serde_json::from_str(row).map_err(|e| StoreError::CorruptRecord {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn encode(record: &MatchRecord) -> Result<String, StoreError> {
        serde_json::to_string(record).map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl MatchStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<MatchRecord>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::StoragePoisoned)?;
        rows.get(id).map(|row| Self::decode(id, row)).transpose()
    }

    fn insert(&self, record: &MatchRecord) -> Result<(), StoreError> {
        let row = Self::encode(record)?;
        let mut rows = self.rows.write().map_err(|_| StoreError::StoragePoisoned)?;
        if rows.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id.clone()));
        }
        rows.insert(record.id.clone(), row);
        Ok(())
    }

    fn update(&self, expected_version: u64, record: &MatchRecord) -> Result<(), StoreError> {
        let row = Self::encode(record)?;
        let mut rows = self.rows.write().map_err(|_| StoreError::StoragePoisoned)?;
        let current = rows
            .get(&record.id)
            .ok_or_else(|| StoreError::MissingRecord(record.id.clone()))?;
        let stored = Self::decode(&record.id, current)?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict(record.id.clone()));
        }
        rows.insert(record.id.clone(), row);
        Ok(())
    }

    fn latest_active_for(&self, handle: &str) -> Result<Option<MatchRecord>, StoreError> {
        let rows = self.rows.read().map_err(|_| StoreError::StoragePoisoned)?;
        let mut latest: Option<MatchRecord> = None;
        for (id, row) in rows.iter() {
            let record = Self::decode(id, row)?;
            if record.status != MatchStatus::Active || !record.involves(handle) {
                continue;
            }
            let newer = latest
                .as_ref()
                .map(|best| record.updated_at > best.updated_at)
                .unwrap_or(true);
            if newer {
                latest = Some(record);
            }
        }
        Ok(latest)
    }
}
