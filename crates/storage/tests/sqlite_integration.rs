use chrono::{DateTime, Duration, Utc};
use practice_core::level::LevelState;
use practice_core::model::{
    DifficultyLevel, ExerciseSettings, ExerciseSettingsDraft, LearnerId, ModuleId, ModuleKey,
    SessionSummary,
};
use practice_core::rewards::{RewardLedger, catalog};
use practice_core::time::{fixed_clock, fixed_now};
use sqlx::Row;
use storage::repository::{
    LevelStateRepository, ProgressRepository, RewardRepository, SettingsRepository,
};
use storage::repository::Storage;
use storage::sqlite::SqliteRepository;

fn key(learner: u64, module: &str) -> ModuleKey {
    ModuleKey::new(LearnerId::new(learner), ModuleId::new(module).unwrap())
}

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect")
        .with_clock(fixed_clock());
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_progress_entries_round_trip() {
    let repo = connect("memdb_progress").await;
    let now = fixed_now();

    for (minutes, score) in [(0, 6), (30, 12), (15, 9)] {
        let summary = SessionSummary::from_persisted(
            key(1, "addition"),
            now + Duration::minutes(minutes),
            score,
            12,
            240,
            DifficultyLevel::Elementary,
        )
        .unwrap();
        repo.append_result(&summary).await.unwrap();
    }
    let elsewhere = SessionSummary::from_persisted(
        key(2, "addition"),
        now,
        1,
        12,
        100,
        DifficultyLevel::Beginner,
    )
    .unwrap();
    repo.append_result(&elsewhere).await.unwrap();

    let results = repo.list_results(&key(1, "addition"), 10).await.unwrap();
    let scores: Vec<u32> = results.iter().map(SessionSummary::score).collect();
    assert_eq!(scores, vec![12, 9, 6]);
    assert_eq!(results[0].difficulty(), DifficultyLevel::Elementary);
    assert_eq!(results[0].time_spent_secs(), 240);
    assert_eq!(results[0].completed_at(), now + Duration::minutes(30));

    let limited = repo.list_results(&key(1, "addition"), 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn sqlite_level_state_upserts() {
    let repo = connect("memdb_levels").await;
    let key = key(1, "addition");
    assert!(repo.load_level_state(&key).await.unwrap().is_none());

    let mut state = LevelState::new(DifficultyLevel::Beginner, true);
    for _ in 0..3 {
        state.register_correct();
    }
    repo.save_level_state(&key, &state).await.unwrap();

    state.set_level(DifficultyLevel::Advanced);
    state.set_adaptive(false);
    repo.save_level_state(&key, &state).await.unwrap();

    let loaded = repo.load_level_state(&key).await.unwrap().unwrap();
    assert_eq!(loaded, state);
    assert_eq!(loaded.correct_streak(), 3);
    assert!(!loaded.adaptive_enabled());
}

#[tokio::test]
async fn sqlite_rows_are_stamped_with_the_injected_clock() {
    let repo = connect("memdb_stamps").await;
    let key = key(3, "subtraction");
    repo.save_level_state(&key, &LevelState::default())
        .await
        .unwrap();
    repo.save_settings(&key, &ExerciseSettings::default())
        .await
        .unwrap();

    for table in ["level_states", "module_settings"] {
        let row = sqlx::query(&format!(
            "SELECT updated_at FROM {table} WHERE learner_id = 3 AND module_id = 'subtraction'"
        ))
        .fetch_one(repo.pool())
        .await
        .unwrap();
        let stamped: DateTime<Utc> = row.try_get("updated_at").unwrap();
        assert_eq!(stamped, fixed_now(), "{table}");
    }
}

#[tokio::test]
async fn sqlite_reward_ledger_keeps_order_and_counters() {
    let repo = connect("memdb_rewards").await;
    let key = key(3, "addition");

    let mut ledger = RewardLedger::new();
    ledger.award(catalog::STREAK_5, fixed_now());
    ledger.award(catalog::ADDITION_NOVICE, fixed_now() + Duration::seconds(5));
    ledger.mark_seen(catalog::STREAK_5);
    ledger.record_problems_completed(14);
    repo.save_ledger(&key, &ledger).await.unwrap();

    let loaded = repo.load_ledger(&key).await.unwrap();
    assert_eq!(loaded, ledger);

    // Saving again replaces rather than duplicates.
    ledger.award(catalog::STREAK_10, fixed_now());
    repo.save_ledger(&key, &ledger).await.unwrap();
    let loaded = repo.load_ledger(&key).await.unwrap();
    assert_eq!(loaded.earned().len(), 3);
    assert_eq!(loaded.new_count(), 2);
    assert_eq!(loaded.problems_completed(), 14);
}

#[tokio::test]
async fn sqlite_settings_round_trip_as_json() {
    let repo = connect("memdb_settings").await;
    let key = key(1, "subtraction");
    assert!(repo.load_settings(&key).await.unwrap().is_none());

    let settings = ExerciseSettings::new(ExerciseSettingsDraft {
        difficulty: DifficultyLevel::Intermediate,
        problem_count: 20,
        time_value_per_problem: 30,
        max_attempts: 0,
        ..ExerciseSettingsDraft::default()
    })
    .unwrap();
    repo.save_settings(&key, &settings).await.unwrap();

    let loaded = repo.load_settings(&key).await.unwrap();
    assert_eq!(loaded, Some(settings));
}

#[tokio::test]
async fn storage_sqlite_wires_every_repository() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared", fixed_clock())
        .await
        .expect("storage");
    let key = key(9, "addition");

    storage
        .levels
        .save_level_state(&key, &LevelState::default())
        .await
        .unwrap();
    assert!(storage.levels.load_level_state(&key).await.unwrap().is_some());
    assert!(storage.rewards.load_ledger(&key).await.unwrap().earned().is_empty());
    assert!(storage.progress.list_results(&key, 5).await.unwrap().is_empty());
}
