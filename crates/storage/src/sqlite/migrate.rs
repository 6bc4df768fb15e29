use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies pending schema versions in order.
///
/// Version 1 holds the progress store, the per-module key-value tables
/// (level state, reward ledger) and stored settings.
pub async fn run_migrations(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress_entries (
                    id INTEGER PRIMARY KEY,
                    learner_id INTEGER NOT NULL,
                    module_id TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score >= 0),
                    total_problems INTEGER NOT NULL CHECK (total_problems > 0),
                    time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0),
                    difficulty TEXT NOT NULL,
                    CHECK (score <= total_problems)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS level_states (
                    learner_id INTEGER NOT NULL,
                    module_id TEXT NOT NULL,
                    current_level TEXT NOT NULL,
                    correct_streak INTEGER NOT NULL CHECK (correct_streak >= 0),
                    incorrect_streak INTEGER NOT NULL CHECK (incorrect_streak >= 0),
                    adaptive_enabled INTEGER NOT NULL CHECK (adaptive_enabled IN (0, 1)),
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (learner_id, module_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS earned_rewards (
                    learner_id INTEGER NOT NULL,
                    module_id TEXT NOT NULL,
                    reward_id TEXT NOT NULL,
                    earned_at TEXT NOT NULL,
                    seen INTEGER NOT NULL CHECK (seen IN (0, 1)),
                    position INTEGER NOT NULL,
                    PRIMARY KEY (learner_id, module_id, reward_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS reward_counters (
                    learner_id INTEGER NOT NULL,
                    module_id TEXT NOT NULL,
                    new_count INTEGER NOT NULL CHECK (new_count >= 0),
                    problems_completed INTEGER NOT NULL CHECK (problems_completed >= 0),
                    PRIMARY KEY (learner_id, module_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS module_settings (
                    learner_id INTEGER NOT NULL,
                    module_id TEXT NOT NULL,
                    settings_json TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (learner_id, module_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_entries_module_completed
                    ON progress_entries (learner_id, module_id, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
