use async_trait::async_trait;
use practice_core::level::LevelState;
use practice_core::model::{ExerciseSettings, ModuleKey, SessionSummary};
use practice_core::rewards::RewardLedger;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Progress store: one row per completed session.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Persist a finished session's summary and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_result(&self, summary: &SessionSummary) -> Result<i64, StorageError>;

    /// Most recent summaries for a learner+module pair, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails or rows cannot be decoded.
    async fn list_results(
        &self,
        key: &ModuleKey,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, StorageError>;
}

/// Key-value store for adaptive difficulty state.
#[async_trait]
pub trait LevelStateRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be read.
    async fn load_level_state(&self, key: &ModuleKey) -> Result<Option<LevelState>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be written.
    async fn save_level_state(&self, key: &ModuleKey, state: &LevelState)
    -> Result<(), StorageError>;
}

/// Key-value store for earned rewards and their counters.
#[async_trait]
pub trait RewardRepository: Send + Sync {
    /// Loads the ledger, or an empty one if nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read.
    async fn load_ledger(&self, key: &ModuleKey) -> Result<RewardLedger, StorageError>;

    /// Replaces the stored ledger.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be written.
    async fn save_ledger(&self, key: &ModuleKey, ledger: &RewardLedger)
    -> Result<(), StorageError>;
}

/// Settings source for per-module exercise configuration.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be read or fail validation.
    async fn load_settings(&self, key: &ModuleKey)
    -> Result<Option<ExerciseSettings>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be written.
    async fn save_settings(
        &self,
        key: &ModuleKey,
        settings: &ExerciseSettings,
    ) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<Vec<(i64, SessionSummary)>>>,
    levels: Arc<Mutex<HashMap<ModuleKey, LevelState>>>,
    ledgers: Arc<Mutex<HashMap<ModuleKey, RewardLedger>>>,
    settings: Arc<Mutex<HashMap<ModuleKey, ExerciseSettings>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn append_result(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        guard.push((id, summary.clone()));
        Ok(id)
    }

    async fn list_results(
        &self,
        key: &ModuleKey,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows: Vec<&(i64, SessionSummary)> =
            guard.iter().filter(|(_, s)| s.key() == key).collect();
        rows.sort_by(|(a_id, a), (b_id, b)| {
            b.completed_at()
                .cmp(&a.completed_at())
                .then_with(|| b_id.cmp(a_id))
        });
        Ok(rows
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|(_, s)| s.clone())
            .collect())
    }
}

#[async_trait]
impl LevelStateRepository for InMemoryRepository {
    async fn load_level_state(&self, key: &ModuleKey) -> Result<Option<LevelState>, StorageError> {
        let guard = self.levels.lock().map_err(poisoned)?;
        Ok(guard.get(key).copied())
    }

    async fn save_level_state(
        &self,
        key: &ModuleKey,
        state: &LevelState,
    ) -> Result<(), StorageError> {
        let mut guard = self.levels.lock().map_err(poisoned)?;
        guard.insert(key.clone(), *state);
        Ok(())
    }
}

#[async_trait]
impl RewardRepository for InMemoryRepository {
    async fn load_ledger(&self, key: &ModuleKey) -> Result<RewardLedger, StorageError> {
        let guard = self.ledgers.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned().unwrap_or_default())
    }

    async fn save_ledger(
        &self,
        key: &ModuleKey,
        ledger: &RewardLedger,
    ) -> Result<(), StorageError> {
        let mut guard = self.ledgers.lock().map_err(poisoned)?;
        guard.insert(key.clone(), ledger.clone());
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn load_settings(
        &self,
        key: &ModuleKey,
    ) -> Result<Option<ExerciseSettings>, StorageError> {
        let guard = self.settings.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    async fn save_settings(
        &self,
        key: &ModuleKey,
        settings: &ExerciseSettings,
    ) -> Result<(), StorageError> {
        let mut guard = self.settings.lock().map_err(poisoned)?;
        guard.insert(key.clone(), settings.clone());
        Ok(())
    }
}

/// Aggregates the collaborator repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub levels: Arc<dyn LevelStateRepository>,
    pub rewards: Arc<dyn RewardRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            progress: Arc::new(repo.clone()),
            levels: Arc::new(repo.clone()),
            rewards: Arc::new(repo.clone()),
            settings: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::model::{DifficultyLevel, LearnerId, ModuleId};
    use practice_core::time::fixed_now;

    fn key(module: &str) -> ModuleKey {
        ModuleKey::new(LearnerId::new(1), ModuleId::new(module).unwrap())
    }

    #[tokio::test]
    async fn results_are_listed_newest_first_per_module() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        for (offset, score) in [(0, 3), (10, 5), (5, 4)] {
            let summary = SessionSummary::from_persisted(
                key("addition"),
                now + chrono::Duration::minutes(offset),
                score,
                10,
                60,
                DifficultyLevel::Beginner,
            )
            .unwrap();
            repo.append_result(&summary).await.unwrap();
        }
        let other = SessionSummary::from_persisted(
            key("subtraction"),
            now,
            1,
            10,
            60,
            DifficultyLevel::Beginner,
        )
        .unwrap();
        repo.append_result(&other).await.unwrap();

        let scores: Vec<u32> = repo
            .list_results(&key("addition"), 2)
            .await
            .unwrap()
            .iter()
            .map(SessionSummary::score)
            .collect();
        assert_eq!(scores, vec![5, 4]);
    }

    #[tokio::test]
    async fn level_state_round_trips() {
        let repo = InMemoryRepository::new();
        assert!(repo.load_level_state(&key("addition")).await.unwrap().is_none());

        let mut state = LevelState::new(DifficultyLevel::Intermediate, true);
        state.register_correct();
        repo.save_level_state(&key("addition"), &state).await.unwrap();

        let loaded = repo.load_level_state(&key("addition")).await.unwrap();
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn missing_ledger_is_empty() {
        let repo = InMemoryRepository::new();
        let ledger = repo.load_ledger(&key("addition")).await.unwrap();
        assert!(ledger.earned().is_empty());
    }
}
