use async_trait::async_trait;
use practice_core::model::{EarnedReward, ModuleKey};
use practice_core::rewards::RewardLedger;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, learner_id_to_i64, ser, u32_from_i64};
use crate::repository::{RewardRepository, StorageError};

#[async_trait]
impl RewardRepository for SqliteRepository {
    async fn load_ledger(&self, key: &ModuleKey) -> Result<RewardLedger, StorageError> {
        let learner = learner_id_to_i64(key.learner)?;

        let rows = sqlx::query(
            r"
                SELECT reward_id, earned_at, seen
                FROM earned_rewards
                WHERE learner_id = ?1 AND module_id = ?2
                ORDER BY position ASC
            ",
        )
        .bind(learner)
        .bind(key.module.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut earned = Vec::with_capacity(rows.len());
        for row in rows {
            earned.push(EarnedReward {
                id: row.try_get("reward_id").map_err(ser)?,
                earned_at: row.try_get("earned_at").map_err(ser)?,
                seen: row.try_get("seen").map_err(ser)?,
            });
        }

        let counters = sqlx::query(
            r"
                SELECT new_count, problems_completed
                FROM reward_counters
                WHERE learner_id = ?1 AND module_id = ?2
            ",
        )
        .bind(learner)
        .bind(key.module.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let (new_count, problems_completed) = match counters {
            Some(row) => (
                u32_from_i64("new_count", row.try_get::<i64, _>("new_count").map_err(ser)?)?,
                u32_from_i64(
                    "problems_completed",
                    row.try_get::<i64, _>("problems_completed").map_err(ser)?,
                )?,
            ),
            None => (0, 0),
        };

        Ok(RewardLedger::from_persisted(
            earned,
            new_count,
            problems_completed,
        ))
    }

    async fn save_ledger(
        &self,
        key: &ModuleKey,
        ledger: &RewardLedger,
    ) -> Result<(), StorageError> {
        let learner = learner_id_to_i64(key.learner)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM earned_rewards WHERE learner_id = ?1 AND module_id = ?2")
            .bind(learner)
            .bind(key.module.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, reward) in ledger.earned().iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("reward position overflow".into()))?;
            sqlx::query(
                r"
                    INSERT INTO earned_rewards (
                        learner_id, module_id, reward_id, earned_at, seen, position
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(learner)
            .bind(key.module.as_str())
            .bind(reward.id.as_str())
            .bind(reward.earned_at)
            .bind(reward.seen)
            .bind(position)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        sqlx::query(
            r"
                INSERT INTO reward_counters (learner_id, module_id, new_count, problems_completed)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(learner_id, module_id) DO UPDATE SET
                    new_count = excluded.new_count,
                    problems_completed = excluded.problems_completed
            ",
        )
        .bind(learner)
        .bind(key.module.as_str())
        .bind(i64::from(ledger.new_count()))
        .bind(i64::from(ledger.problems_completed()))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
