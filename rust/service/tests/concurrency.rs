use reversi_engine::{Board, Side, BOARD_SIZE};
use reversi_service::{
    MatchError, MatchRecord, MatchService, MatchStore, MemoryStore, StaticDirectory, StoreError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn service() -> (Arc<MatchService>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(StaticDirectory::with_handles(["alice", "bob"]));
    (Arc::new(MatchService::new(store.clone(), directory)), store)
}

#[test]
fn racing_moves_on_one_match_apply_exactly_once() {
    let (service, store) = service();
    let id = service.create_match("alice", "bob").expect("create").state.game_id;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let id = id.clone();
        handles.push(thread::spawn(move || {
            service.apply_move(&id, "alice", 2, 4)
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.join().expect("join thread") {
            Ok(_) => successes += 1,
            Err(MatchError::NotYourTurn) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(successes, 1, "exactly one racing move may win");

    let record = store.get(&id).expect("get").expect("record");
    assert_eq!(record.turn, Side::Light);
    assert_eq!(record.pass_count, 0);
    assert_eq!(record.board.cell(2, 4), Some(1));
    assert_eq!(record.version, 1);
}

#[test]
fn racing_reads_auto_pass_at_most_once() {
    let (service, store) = service();
    let id = service.create_match("alice", "bob").expect("create").state.game_id;

    // Only dark stones on the board: light (on turn) is stuck.
    let mut record = store.get(&id).expect("get").expect("record");
    let mut rows = [[0i8; BOARD_SIZE]; BOARD_SIZE];
    rows[0][0] = 1;
    record.board = Board::from_rows(rows);
    record.turn = Side::Light;
    let expected = record.version;
    record.version += 1;
    store.update(expected, &record).expect("update");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let id = id.clone();
        handles.push(thread::spawn(move || {
            service.get_state(&id, Some("bob")).expect("get state")
        }));
    }

    let mut passes = 0;
    for handle in handles {
        let outcome = handle.join().expect("join thread");
        if outcome.message.is_some() {
            passes += 1;
        }
        assert_eq!(outcome.state.pass_count, 1);
        assert_eq!(outcome.state.turn, Side::Dark);
    }
    assert_eq!(passes, 1, "the stuck turn is passed exactly once");

    let persisted = store.get(&id).expect("get").expect("record");
    assert_eq!(persisted.pass_count, 1);
}

/// Store wrapper that reports a version conflict for the first N updates,
/// standing in for an external writer racing the service.
struct FlakyStore {
    inner: MemoryStore,
    conflicts_left: AtomicUsize,
}

impl FlakyStore {
    fn new(conflicts: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            conflicts_left: AtomicUsize::new(conflicts),
        }
    }
}

impl MatchStore for FlakyStore {
    fn get(&self, id: &str) -> Result<Option<MatchRecord>, StoreError> {
        self.inner.get(id)
    }

    fn insert(&self, record: &MatchRecord) -> Result<(), StoreError> {
        self.inner.insert(record)
    }

    fn update(&self, expected_version: u64, record: &MatchRecord) -> Result<(), StoreError> {
        let left = self.conflicts_left.load(Ordering::SeqCst);
        if left > 0 {
            self.conflicts_left.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::VersionConflict(record.id.clone()));
        }
        self.inner.update(expected_version, record)
    }

    fn latest_active_for(&self, handle: &str) -> Result<Option<MatchRecord>, StoreError> {
        self.inner.latest_active_for(handle)
    }
}

#[test]
fn transient_version_conflicts_are_retried_internally() {
    let store = Arc::new(FlakyStore::new(2));
    let directory = Arc::new(StaticDirectory::with_handles(["alice", "bob"]));
    let service = MatchService::new(store, directory);

    let id = service.create_match("alice", "bob").expect("create").state.game_id;
    let outcome = service
        .apply_move(&id, "alice", 2, 4)
        .expect("retries absorb two conflicts");
    assert_eq!(outcome.state.turn, Side::Light);
}

#[test]
fn persistent_version_conflicts_surface_after_bounded_retries() {
    let store = Arc::new(FlakyStore::new(usize::MAX / 2));
    let directory = Arc::new(StaticDirectory::with_handles(["alice", "bob"]));
    let service = MatchService::new(store, directory);

    let id = service.create_match("alice", "bob").expect("create").state.game_id;
    let result = service.apply_move(&id, "alice", 2, 4);
    match result {
        Err(MatchError::UpdateConflict) => {}
        other => panic!("expected update conflict, got {other:?}"),
    }
    assert!(MatchError::UpdateConflict.retryable());
}
