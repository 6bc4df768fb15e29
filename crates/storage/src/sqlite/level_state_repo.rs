use async_trait::async_trait;
use practice_core::level::LevelState;
use practice_core::model::ModuleKey;

use super::SqliteRepository;
use super::mapping::{conn, learner_id_to_i64, map_level_state_row};
use crate::repository::{LevelStateRepository, StorageError};

#[async_trait]
impl LevelStateRepository for SqliteRepository {
    async fn load_level_state(&self, key: &ModuleKey) -> Result<Option<LevelState>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT current_level, correct_streak, incorrect_streak, adaptive_enabled
                FROM level_states
                WHERE learner_id = ?1 AND module_id = ?2
            ",
        )
        .bind(learner_id_to_i64(key.learner)?)
        .bind(key.module.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_level_state_row).transpose()
    }

    async fn save_level_state(
        &self,
        key: &ModuleKey,
        state: &LevelState,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO level_states (
                    learner_id, module_id, current_level, correct_streak,
                    incorrect_streak, adaptive_enabled, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(learner_id, module_id) DO UPDATE SET
                    current_level = excluded.current_level,
                    correct_streak = excluded.correct_streak,
                    incorrect_streak = excluded.incorrect_streak,
                    adaptive_enabled = excluded.adaptive_enabled,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(learner_id_to_i64(key.learner)?)
        .bind(key.module.as_str())
        .bind(state.current_level().as_str())
        .bind(i64::from(state.correct_streak()))
        .bind(i64::from(state.incorrect_streak()))
        .bind(state.adaptive_enabled())
        .bind(self.clock.now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
