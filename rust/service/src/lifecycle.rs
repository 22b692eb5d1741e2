use crate::errors::{ErrorSeverity, IntoErrorResponse};
use crate::identity::{IdentityDirectory, IdentityError};
use crate::store::{MatchId, MatchRecord, MatchStatus, MatchStore, StoreError};
use chrono::Utc;
use hyper::StatusCode;
use reversi_engine::{Board, BoardError, Score, Side};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// Bounded re-read attempts when a conditional store write conflicts.
const UPDATE_RETRIES: usize = 3;

/// Consecutive auto-passes that force a stalemate finish.
const PASS_LIMIT: u8 = 2;

const PASS_MESSAGE: &str = "No valid moves. Turn passed.";
const STALEMATE_MESSAGE: &str = "No valid moves for either side. Match finished.";

/// Public view of a match, returned by every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    pub game_id: MatchId,
    pub player1: String,
    pub player2: String,
    pub turn: Side,
    pub status: MatchStatus,
    pub pass_count: u8,
    pub draw_offer_by: Option<String>,
    pub board: Board,
    pub score: Score,
}

impl MatchView {
    fn from_record(record: &MatchRecord) -> Self {
        Self {
            game_id: record.id.clone(),
            player1: record.player1.clone(),
            player2: record.player2.clone(),
            turn: record.turn,
            status: record.status,
            pass_count: record.pass_count,
            draw_offer_by: record.draw_offer_by.clone(),
            board: record.board.clone(),
            score: record.board.score(),
        }
    }
}

/// Operation result: the post-operation view plus an optional notice when a
/// side effect (an auto-pass) happened on the caller's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub state: MatchView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Match not found: {0}")]
    NotFound(MatchId),
    #[error("Unknown player: {0}")]
    UnknownPlayer(String),
    #[error("A match needs two distinct players")]
    SamePlayer,
    #[error("{0} already has an active match")]
    AlreadyActive(String),
    #[error("Not a participant in this match")]
    NotParticipant,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Match is not active")]
    MatchNotActive,
    #[error("Illegal move: {0}")]
    IllegalMove(#[from] BoardError),
    #[error("No draw offer to accept")]
    NoDrawOffer,
    #[error("Cannot accept your own draw offer")]
    OwnDrawOffer,
    #[error("Concurrent update conflict; refetch state and retry")]
    UpdateConflict,
    #[error(transparent)]
    Directory(#[from] IdentityError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MatchError {
    /// Whether the caller may safely retry after refetching state.
    /// Terminal rejections (unknown ids, finished matches, malformed moves)
    /// stay failed no matter how often they are retried.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            MatchError::NotYourTurn
                | MatchError::NoDrawOffer
                | MatchError::OwnDrawOffer
                | MatchError::AlreadyActive(_)
                | MatchError::UpdateConflict
        )
    }
}

impl IntoErrorResponse for MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::NotFound(_) | MatchError::UnknownPlayer(_) => StatusCode::NOT_FOUND,
            MatchError::NotParticipant => StatusCode::FORBIDDEN,
            MatchError::SamePlayer | MatchError::IllegalMove(_) | MatchError::MatchNotActive => {
                StatusCode::BAD_REQUEST
            }
            MatchError::NotYourTurn
            | MatchError::NoDrawOffer
            | MatchError::OwnDrawOffer
            | MatchError::AlreadyActive(_)
            | MatchError::UpdateConflict => StatusCode::CONFLICT,
            MatchError::Directory(_) | MatchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            MatchError::NotFound(_) => "match_not_found",
            MatchError::UnknownPlayer(_) => "unknown_player",
            MatchError::SamePlayer => "same_player",
            MatchError::AlreadyActive(_) => "already_in_active_match",
            MatchError::NotParticipant => "not_a_participant",
            MatchError::NotYourTurn => "not_your_turn",
            MatchError::MatchNotActive => "match_not_active",
            MatchError::IllegalMove(_) => "illegal_move",
            MatchError::NoDrawOffer => "no_draw_offer",
            MatchError::OwnDrawOffer => "own_draw_offer",
            MatchError::UpdateConflict => "update_conflict",
            MatchError::Directory(_) => "identity_unavailable",
            MatchError::Store(_) => "storage_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            MatchError::NotFound(id) => Some(serde_json::json!({ "match_id": id })),
            MatchError::UnknownPlayer(handle) => Some(serde_json::json!({ "player": handle })),
            _ => None,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            MatchError::Store(StoreError::CorruptRecord { .. }) => ErrorSeverity::Critical,
            MatchError::Store(_) | MatchError::Directory(_) => ErrorSeverity::Server,
            _ => ErrorSeverity::Client,
        }
    }
}

/// Outcome of one read-validate-mutate attempt against a record.
enum Applied {
    /// Nothing changed; skip the store write entirely.
    Unchanged,
    /// The record was mutated and must be committed, optionally with a
    /// notice for the caller.
    Updated(Option<String>),
}

/// Owns the per-match state machine and mediates all record access.
///
/// Every read-then-write operation runs as one critical section keyed by
/// match id, then commits through a version-conditional store update. The
/// lock covers in-process callers; the version check covers everyone else.
pub struct MatchService {
    store: Arc<dyn MatchStore>,
    directory: Arc<dyn IdentityDirectory>,
    locks: Mutex<HashMap<MatchId, Arc<Mutex<()>>>>,
    create_lock: Mutex<()>,
}

impl std::fmt::Debug for MatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchService").finish_non_exhaustive()
    }
}

impl MatchService {
    pub fn new(store: Arc<dyn MatchStore>, directory: Arc<dyn IdentityDirectory>) -> Self {
        Self {
            store,
            directory,
            locks: Mutex::new(HashMap::new()),
            create_lock: Mutex::new(()),
        }
    }

    /// Starts a match between two registered players. `player1` takes the
    /// dark stones and moves first. Rejected when either player already has
    /// an active match anywhere; terminal matches never block creation.
    pub fn create_match(&self, player1: &str, player2: &str) -> Result<MatchOutcome, MatchError> {
        if player1 == player2 {
            return Err(MatchError::SamePlayer);
        }
        for handle in [player1, player2] {
            if !self.directory.is_registered(handle)? {
                return Err(MatchError::UnknownPlayer(handle.to_string()));
            }
        }

        // Serialize creation so two racing requests cannot both pass the
        // active-match uniqueness check.
        let _guard = self
            .create_lock
            .lock()
            .map_err(|_| StoreError::StoragePoisoned)?;
        for handle in [player1, player2] {
            if self.store.latest_active_for(handle)?.is_some() {
                return Err(MatchError::AlreadyActive(handle.to_string()));
            }
        }

        let now = Utc::now();
        let record = MatchRecord {
            id: Uuid::new_v4().to_string(),
            player1: player1.to_string(),
            player2: player2.to_string(),
            board: Board::new(),
            turn: Side::Dark,
            pass_count: 0,
            draw_offer_by: None,
            status: MatchStatus::Active,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        self.store.insert(&record)?;

        tracing::info!(match_id = %record.id, player1, player2, "match created");
        Ok(MatchOutcome {
            state: MatchView::from_record(&record),
            message: None,
        })
    }

    /// Loads the current state. When the viewer is the participant on turn
    /// and that side has no legal move, the pending auto-pass is applied
    /// and persisted first; the returned state always reflects it. Outside
    /// viewers never trigger the mutation.
    pub fn get_state(
        &self,
        match_id: &str,
        viewer: Option<&str>,
    ) -> Result<MatchOutcome, MatchError> {
        self.with_match(match_id, |record| {
            if record.status != MatchStatus::Active {
                return Ok(Applied::Unchanged);
            }
            let viewer_side = viewer.and_then(|handle| record.participant_side(handle));
            match viewer_side {
                Some(side) if record.turn == side && !record.board.any_legal_move(side) => {
                    Ok(Applied::Updated(Some(auto_pass(record))))
                }
                _ => Ok(Applied::Unchanged),
            }
        })
    }

    /// Applies a placement for the actor. When the actor's side is stuck
    /// with no legal move, the attempt resolves as an auto-pass instead of
    /// an error, mirroring the read path.
    pub fn apply_move(
        &self,
        match_id: &str,
        actor: &str,
        row: usize,
        col: usize,
    ) -> Result<MatchOutcome, MatchError> {
        tracing::debug!(match_id, actor, row, col, "processing move");
        self.with_match(match_id, |record| {
            ensure_active(record)?;
            let side = participant(record, actor)?;
            if record.turn != side {
                return Err(MatchError::NotYourTurn);
            }
            if !record.board.any_legal_move(side) {
                return Ok(Applied::Updated(Some(auto_pass(record))));
            }

            let flipped = record.board.apply_move(row, col, side)?;
            record.turn = side.opponent();
            record.pass_count = 0;
            record.draw_offer_by = None;
            tracing::debug!(match_id = %record.id, actor, row, col, flipped, "move applied");
            Ok(Applied::Updated(None))
        })
    }

    /// Concedes the match; the other participant wins implicitly.
    pub fn resign(&self, match_id: &str, actor: &str) -> Result<MatchOutcome, MatchError> {
        self.with_match(match_id, |record| {
            ensure_active(record)?;
            participant(record, actor)?;
            record.status = MatchStatus::Resigned;
            record.draw_offer_by = None;
            tracing::info!(match_id = %record.id, actor, "match resigned");
            Ok(Applied::Updated(None))
        })
    }

    /// Proposes a draw. Board and turn are untouched; any later
    /// state-changing action withdraws the offer.
    pub fn offer_draw(&self, match_id: &str, actor: &str) -> Result<MatchOutcome, MatchError> {
        self.with_match(match_id, |record| {
            ensure_active(record)?;
            participant(record, actor)?;
            record.draw_offer_by = Some(actor.to_string());
            tracing::info!(match_id = %record.id, actor, "draw offered");
            Ok(Applied::Updated(None))
        })
    }

    /// Accepts the opponent's standing draw offer. A side cannot accept
    /// its own offer.
    pub fn accept_draw(&self, match_id: &str, actor: &str) -> Result<MatchOutcome, MatchError> {
        self.with_match(match_id, |record| {
            ensure_active(record)?;
            participant(record, actor)?;
            match record.draw_offer_by.as_deref() {
                None => Err(MatchError::NoDrawOffer),
                Some(offerer) if offerer == actor => Err(MatchError::OwnDrawOffer),
                Some(_) => {
                    record.status = MatchStatus::Draw;
                    record.draw_offer_by = None;
                    tracing::info!(match_id = %record.id, actor, "draw accepted");
                    Ok(Applied::Updated(None))
                }
            }
        })
    }

    /// The most recently updated active match involving `handle`, if any.
    pub fn find_active_match(&self, handle: &str) -> Result<Option<MatchView>, MatchError> {
        let record = self.store.latest_active_for(handle)?;
        Ok(record.as_ref().map(MatchView::from_record))
    }

    fn match_lock(&self, match_id: &str) -> Result<Arc<Mutex<()>>, MatchError> {
        let mut table = self
            .locks
            .lock()
            .map_err(|_| MatchError::Store(StoreError::StoragePoisoned))?;
        Ok(Arc::clone(table.entry(match_id.to_string()).or_default()))
    }

    /// Runs `apply` inside the per-match critical section, committing any
    /// mutation as one conditional update. On a version conflict the record
    /// is re-read and `apply` re-validates from scratch, a bounded number
    /// of times. A failed `apply` writes nothing.
    fn with_match<F>(&self, match_id: &str, mut apply: F) -> Result<MatchOutcome, MatchError>
    where
        F: FnMut(&mut MatchRecord) -> Result<Applied, MatchError>,
    {
        let lock = self.match_lock(match_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| MatchError::Store(StoreError::StoragePoisoned))?;

        let mut attempt = 0;
        loop {
            let mut record = self
                .store
                .get(match_id)?
                .ok_or_else(|| MatchError::NotFound(match_id.to_string()))?;

            match apply(&mut record)? {
                Applied::Unchanged => {
                    return Ok(MatchOutcome {
                        state: MatchView::from_record(&record),
                        message: None,
                    });
                }
                Applied::Updated(message) => {
                    let expected = record.version;
                    record.version += 1;
                    record.updated_at = Utc::now();
                    match self.store.update(expected, &record) {
                        Ok(()) => {
                            return Ok(MatchOutcome {
                                state: MatchView::from_record(&record),
                                message,
                            });
                        }
                        Err(StoreError::VersionConflict(_)) => {
                            attempt += 1;
                            if attempt >= UPDATE_RETRIES {
                                return Err(MatchError::UpdateConflict);
                            }
                            tracing::warn!(match_id, attempt, "version conflict, re-reading record");
                        }
                        Err(other) => return Err(other.into()),
                    }
                }
            }
        }
    }
}

fn ensure_active(record: &MatchRecord) -> Result<(), MatchError> {
    if record.status.is_terminal() {
        return Err(MatchError::MatchNotActive);
    }
    Ok(())
}

fn participant(record: &MatchRecord, actor: &str) -> Result<Side, MatchError> {
    record
        .participant_side(actor)
        .ok_or(MatchError::NotParticipant)
}

/// The forced turn-skip shared by the read and move paths. Increments the
/// pass counter, withdraws any draw offer, and either hands the turn over
/// or, on the second consecutive pass, finishes the match as a stalemate.
fn auto_pass(record: &mut MatchRecord) -> String {
    record.pass_count += 1;
    record.draw_offer_by = None;
    if record.pass_count >= PASS_LIMIT {
        record.status = MatchStatus::FinishedStalemate;
        tracing::info!(match_id = %record.id, "stalemate: both sides out of moves");
        STALEMATE_MESSAGE.to_string()
    } else {
        record.turn = record.turn.opponent();
        tracing::debug!(match_id = %record.id, turn = ?record.turn, "auto-pass, turn handed over");
        PASS_MESSAGE.to_string()
    }
}
