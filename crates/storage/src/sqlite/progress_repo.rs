use async_trait::async_trait;
use practice_core::model::{ModuleKey, SessionSummary};

use super::SqliteRepository;
use super::mapping::{conn, learner_id_to_i64, map_summary_row, u64_to_i64};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn append_result(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let key = summary.key();
        let res = sqlx::query(
            r"
                INSERT INTO progress_entries (
                    learner_id, module_id, completed_at, score,
                    total_problems, time_spent_secs, difficulty
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(learner_id_to_i64(key.learner)?)
        .bind(key.module.as_str())
        .bind(summary.completed_at())
        .bind(i64::from(summary.score()))
        .bind(i64::from(summary.total_problems()))
        .bind(u64_to_i64("time_spent_secs", summary.time_spent_secs())?)
        .bind(summary.difficulty().as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_results(
        &self,
        key: &ModuleKey,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    learner_id, module_id, completed_at, score,
                    total_problems, time_spent_secs, difficulty
                FROM progress_entries
                WHERE learner_id = ?1 AND module_id = ?2
                ORDER BY completed_at DESC, id DESC
                LIMIT ?3
            ",
        )
        .bind(learner_id_to_i64(key.learner)?)
        .bind(key.module.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_summary_row).collect()
    }
}
