use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use merge_forge_core::{BoardSnapshot, GameConfig, Stats, Tier};
use merge_forge_session::{
    SavedSession, Session, SessionId, SessionStore, StoreError, Wallet,
};
use merge_forge_storage::JsonFileStore;
use merge_forge_system_spawning::{Config, Spawning};

fn unique_temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("merge_forge_store_{label}_{nanos}"))
}

fn saved(score: u64) -> SavedSession {
    SavedSession {
        board: BoardSnapshot {
            layout: GameConfig::default().layout(),
            entities: Vec::new(),
            score,
            highest_tier: Tier::LOWEST,
        },
        missions: Vec::new(),
        stats: Stats::default(),
        wallet: Wallet::default(),
        last_saved_ms: 1,
    }
}

#[test]
fn open_creates_the_directory() {
    let dir = unique_temp_dir("open");
    let store = JsonFileStore::open(dir.join("nested")).expect("directory is creatable");
    assert!(store.directory().is_dir());
    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn session_round_trips_through_disk() {
    let dir = unique_temp_dir("roundtrip");
    let mut session =
        Session::new(GameConfig::default(), Spawning::new(Config::new(11))).expect("starts");
    let store = JsonFileStore::open(&dir).expect("open");
    let id = SessionId::new("round trip");
    session.attach_store(Box::new(store), id.clone());
    session.save_now().expect("save succeeds");
    let expected = session.saved_session();

    let reopened = JsonFileStore::open(&dir).expect("reopen");
    let loaded = reopened.load(&id).expect("readable").expect("present");
    assert_eq!(loaded.board, expected.board);
    assert_eq!(loaded.missions, expected.missions);
    assert_eq!(loaded.stats, expected.stats);
    assert!(dir.join("round%20trip.json").is_file());

    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn partial_updates_touch_only_their_fields() {
    let dir = unique_temp_dir("partial");
    let mut store = JsonFileStore::open(&dir).expect("open");
    let id = SessionId::new("alpha");

    assert!(matches!(
        store.update_score(&id, 5, Tier::new(2)),
        Err(StoreError::MissingSession(_))
    ));

    let mut original = saved(10);
    original.wallet.currency = 3;
    store.save(&id, &original).expect("save");
    store.update_score(&id, 400, Tier::new(4)).expect("score update");
    store
        .update_stats(
            &id,
            Stats {
                total_merges: 9,
                total_created: 12,
                ships_built: 0,
            },
        )
        .expect("stats update");

    let loaded = store.load(&id).expect("readable").expect("present");
    assert_eq!(loaded.board.score, 400);
    assert_eq!(loaded.board.highest_tier, Tier::new(4));
    assert_eq!(loaded.stats.total_merges, 9);
    assert_eq!(loaded.wallet.currency, 3);
    assert_eq!(loaded.last_saved_ms, 1);

    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn leaderboard_ranks_sessions_and_skips_foreign_files() {
    let dir = unique_temp_dir("leaderboard");
    let mut store = JsonFileStore::open(&dir).expect("open");
    for (name, score) in [("zed", 300), ("amy", 300), ("bob", 900), ("cat", 50)] {
        store.save(&SessionId::new(name), &saved(score)).expect("save");
    }
    fs::write(dir.join("notes.txt"), "not a session").expect("write");
    fs::write(dir.join("broken.json"), "{").expect("write");

    let ranking: Vec<(String, u64)> = store
        .leaderboard(3)
        .expect("readable")
        .into_iter()
        .map(|entry| (entry.session.to_string(), entry.score))
        .collect();
    assert_eq!(
        ranking,
        vec![
            ("bob".to_owned(), 900),
            ("amy".to_owned(), 300),
            ("zed".to_owned(), 300),
        ]
    );

    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn similar_identifiers_keep_separate_saves() {
    let dir = unique_temp_dir("separate");
    let mut store = JsonFileStore::open(&dir).expect("open");
    let players = [("player one", 10), ("player_one", 999), ("玩家", 5), ("Émile", 7)];
    for (name, score) in players {
        store.save(&SessionId::new(name), &saved(score)).expect("save");
    }

    for (name, score) in players {
        let loaded = store
            .load(&SessionId::new(name))
            .expect("readable")
            .expect("present");
        assert_eq!(loaded.board.score, score, "{name}");
    }
    assert!(store.load(&SessionId::new("mile")).expect("readable").is_none());
    assert_eq!(store.leaderboard(10).expect("readable").len(), players.len());

    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn documents_of_other_sessions_are_not_loaded() {
    let dir = unique_temp_dir("foreign");
    let mut store = JsonFileStore::open(&dir).expect("open");
    let owner = SessionId::new("owner");
    store.save(&owner, &saved(40)).expect("save");
    fs::rename(dir.join("owner.json"), dir.join("intruder.json")).expect("rename");

    let intruder = SessionId::new("intruder");
    assert!(store.load(&intruder).expect("readable").is_none());
    assert!(matches!(
        store.update_score(&intruder, 1, Tier::LOWEST),
        Err(StoreError::MissingSession(_))
    ));

    fs::remove_dir_all(&dir).expect("cleanup");
}

#[test]
fn closed_store_rejects_operations() {
    let dir = unique_temp_dir("closed");
    let mut store = JsonFileStore::open(&dir).expect("open");
    store.close().expect("close");
    assert!(matches!(
        store.save(&SessionId::new("late"), &saved(1)),
        Err(StoreError::Closed)
    ));
    assert!(matches!(store.leaderboard(5), Err(StoreError::Closed)));
    assert!(matches!(store.close(), Err(StoreError::Closed)));

    fs::remove_dir_all(&dir).expect("cleanup");
}
