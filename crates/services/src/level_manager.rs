use std::sync::Arc;

use practice_core::level::{LevelChange, LevelState};
use practice_core::model::{DifficultyLevel, ModuleKey};
use storage::repository::LevelStateRepository;

use crate::error::LevelError;
use crate::notifications::{EngineEvent, NotificationChannel};

/// Owns one learner+module `LevelState` and persists every mutation.
///
/// The in-memory state is authoritative. A failed write leaves the manager
/// unsynced until the next successful save or an explicit [`flush`].
///
/// [`flush`]: LevelManager::flush
pub struct LevelManager {
    key: ModuleKey,
    state: LevelState,
    repo: Arc<dyn LevelStateRepository>,
    notifier: Arc<dyn NotificationChannel>,
    unsynced: bool,
}

impl LevelManager {
    /// Load persisted state for `key`, or start from `initial` when nothing
    /// was stored yet.
    ///
    /// # Errors
    ///
    /// Returns `LevelError::Storage` if the stored state cannot be read.
    pub async fn load(
        key: ModuleKey,
        initial: LevelState,
        repo: Arc<dyn LevelStateRepository>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Result<Self, LevelError> {
        let stored = repo.load_level_state(&key).await?;
        let state = stored.unwrap_or(initial);
        tracing::debug!(
            %key,
            level = %state.current_level(),
            restored = stored.is_some(),
            "level state loaded"
        );
        Ok(Self {
            key,
            state,
            repo,
            notifier,
            unsynced: false,
        })
    }

    #[must_use]
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    #[must_use]
    pub fn state(&self) -> LevelState {
        self.state
    }

    #[must_use]
    pub fn current_level(&self) -> DifficultyLevel {
        self.state.current_level()
    }

    /// Whether the last mutation reached the store.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        !self.unsynced
    }

    pub async fn register_correct(&mut self) -> Option<LevelChange> {
        let change = self.state.register_correct();
        tracing::debug!(
            key = %self.key,
            correct_streak = self.state.correct_streak(),
            "correct answer registered"
        );
        self.announce(change);
        self.persist().await;
        change
    }

    pub async fn register_incorrect(&mut self) -> Option<LevelChange> {
        let change = self.state.register_incorrect();
        tracing::debug!(
            key = %self.key,
            incorrect_streak = self.state.incorrect_streak(),
            "incorrect answer registered"
        );
        self.announce(change);
        self.persist().await;
        change
    }

    /// Sets the level directly. Streaks are left untouched.
    pub async fn set_level(&mut self, level: DifficultyLevel) {
        self.state.set_level(level);
        self.persist().await;
    }

    pub async fn set_adaptive(&mut self, enabled: bool) {
        self.state.set_adaptive(enabled);
        self.persist().await;
    }

    pub async fn reset_streaks(&mut self) {
        self.state.reset_streaks();
        self.persist().await;
    }

    /// Retry a save that failed earlier.
    ///
    /// # Errors
    ///
    /// Returns `LevelError::Storage` if the store is still unreachable.
    pub async fn flush(&mut self) -> Result<(), LevelError> {
        if !self.unsynced {
            return Ok(());
        }
        self.repo.save_level_state(&self.key, &self.state).await?;
        self.unsynced = false;
        Ok(())
    }

    fn announce(&self, change: Option<LevelChange>) {
        let Some(change) = change else {
            return;
        };
        tracing::info!(
            key = %self.key,
            previous = %change.previous,
            new = %change.new,
            direction = ?change.direction,
            "level changed"
        );
        self.notifier.notify(EngineEvent::LevelChanged {
            key: self.key.clone(),
            change,
        });
    }

    async fn persist(&mut self) {
        match self.repo.save_level_state(&self.key, &self.state).await {
            Ok(()) => self.unsynced = false,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "level state not persisted");
                self.unsynced = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::level::{CORRECT_ANSWERS_FOR_LEVEL_UP, Direction};
    use practice_core::model::{LearnerId, ModuleId};
    use storage::repository::InMemoryRepository;

    use crate::notifications::{NoopNotifier, NotificationHub};

    fn key() -> ModuleKey {
        ModuleKey::new(LearnerId::new(7), ModuleId::new("addition").unwrap())
    }

    #[tokio::test]
    async fn mutations_are_persisted_immediately() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut manager = LevelManager::load(
            key(),
            LevelState::new(DifficultyLevel::Beginner, true),
            repo.clone(),
            Arc::new(NoopNotifier),
        )
        .await
        .unwrap();

        manager.register_correct().await;
        manager.register_correct().await;
        let stored = repo.load_level_state(&key()).await.unwrap().unwrap();
        assert_eq!(stored.correct_streak(), 2);

        manager.set_level(DifficultyLevel::Advanced).await;
        let stored = repo.load_level_state(&key()).await.unwrap().unwrap();
        assert_eq!(stored.current_level(), DifficultyLevel::Advanced);
        assert_eq!(stored.correct_streak(), 2);

        manager.reset_streaks().await;
        let stored = repo.load_level_state(&key()).await.unwrap().unwrap();
        assert_eq!(stored.correct_streak(), 0);
        assert!(manager.is_synced());
    }

    #[tokio::test]
    async fn stored_state_wins_over_initial() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.save_level_state(&key(), &LevelState::new(DifficultyLevel::Expert, false))
            .await
            .unwrap();

        let manager = LevelManager::load(
            key(),
            LevelState::new(DifficultyLevel::Beginner, true),
            repo,
            Arc::new(NoopNotifier),
        )
        .await
        .unwrap();
        assert_eq!(manager.current_level(), DifficultyLevel::Expert);
        assert!(!manager.state().adaptive_enabled());
    }

    #[tokio::test]
    async fn level_up_is_announced() {
        let hub = Arc::new(NotificationHub::default());
        let mut events = hub.subscribe();
        let mut manager = LevelManager::load(
            key(),
            LevelState::new(DifficultyLevel::Beginner, true),
            Arc::new(InMemoryRepository::new()),
            hub,
        )
        .await
        .unwrap();

        let mut changes = Vec::new();
        for _ in 0..CORRECT_ANSWERS_FOR_LEVEL_UP {
            changes.extend(manager.register_correct().await);
        }
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].direction, Direction::Up);

        match events.recv().await.unwrap() {
            EngineEvent::LevelChanged { change, .. } => {
                assert_eq!(change.previous, DifficultyLevel::Beginner);
                assert_eq!(change.new, DifficultyLevel::Elementary);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
