use async_trait::async_trait;
use practice_core::model::{ExerciseSettings, ModuleKey};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, learner_id_to_i64, ser};
use crate::repository::{SettingsRepository, StorageError};

/// One JSON document per module; missing keys fall back to defaults.
#[async_trait]
impl SettingsRepository for SqliteRepository {
    async fn load_settings(
        &self,
        key: &ModuleKey,
    ) -> Result<Option<ExerciseSettings>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT settings_json
                FROM module_settings
                WHERE learner_id = ?1 AND module_id = ?2
            ",
        )
        .bind(learner_id_to_i64(key.learner)?)
        .bind(key.module.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.try_get("settings_json").map_err(ser)?;
        serde_json::from_str(&json).map(Some).map_err(ser)
    }

    async fn save_settings(
        &self,
        key: &ModuleKey,
        settings: &ExerciseSettings,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(settings).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO module_settings (learner_id, module_id, settings_json, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(learner_id, module_id) DO UPDATE SET
                    settings_json = excluded.settings_json,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(learner_id_to_i64(key.learner)?)
        .bind(key.module.as_str())
        .bind(json)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
