use std::sync::Arc;

use practice_core::generator::ArithmeticGenerator;
use practice_core::level::LevelState;
use practice_core::model::{ModuleKey, ModuleProgress, OperationKind};
use rand::rngs::StdRng;
use storage::repository::{
    LevelStateRepository, ProgressRepository, RewardRepository, SettingsRepository, Storage,
};

use super::service::{ExerciseSession, SessionParts};
use super::state::SessionReport;
use crate::Clock;
use crate::error::SessionError;
use crate::level_manager::LevelManager;
use crate::notifications::NotificationChannel;
use crate::reward_engine::RewardEngine;

/// Past sessions considered when averaging a module's results.
pub const HISTORY_WINDOW: u32 = 100;

/// Wires sessions to storage: loads settings, level state and rewards on
/// start, persists the summary on finish.
#[derive(Clone)]
pub struct ExerciseLoopService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    levels: Arc<dyn LevelStateRepository>,
    rewards: Arc<dyn RewardRepository>,
    settings: Arc<dyn SettingsRepository>,
    notifier: Arc<dyn NotificationChannel>,
}

impl ExerciseLoopService {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage, notifier: Arc<dyn NotificationChannel>) -> Self {
        Self {
            clock,
            progress: Arc::clone(&storage.progress),
            levels: Arc::clone(&storage.levels),
            rewards: Arc::clone(&storage.rewards),
            settings: Arc::clone(&storage.settings),
            notifier,
        }
    }

    /// Start a new session for `key`, practicing `operation`.
    ///
    /// Settings are read once here; later changes do not reach this session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if settings, level state, rewards or past
    /// results cannot be loaded.
    pub async fn start_session(
        &self,
        key: ModuleKey,
        operation: OperationKind,
        rng: StdRng,
    ) -> Result<ExerciseSession, SessionError> {
        let settings = self
            .settings
            .load_settings(&key)
            .await?
            .unwrap_or_default();

        let mut levels = LevelManager::load(
            key.clone(),
            LevelState::new(settings.difficulty(), settings.adaptive_difficulty()),
            Arc::clone(&self.levels),
            Arc::clone(&self.notifier),
        )
        .await?;
        if levels.state().adaptive_enabled() != settings.adaptive_difficulty() {
            levels.set_adaptive(settings.adaptive_difficulty()).await;
        }

        let rewards = RewardEngine::load(
            key.clone(),
            operation.reward_theme(),
            self.clock,
            Arc::clone(&self.rewards),
            Arc::clone(&self.notifier),
        )
        .await?;

        let past = self.progress.list_results(&key, HISTORY_WINDOW).await?;
        let previous_average =
            (!past.is_empty()).then(|| ModuleProgress::from_summaries(&past).average_score);

        tracing::info!(
            %key,
            %operation,
            problems = settings.problem_count(),
            level = %levels.current_level(),
            "starting session"
        );

        Ok(ExerciseSession::new(SessionParts {
            key,
            settings,
            levels,
            rewards,
            progress: Arc::clone(&self.progress),
            generator: Arc::new(ArithmeticGenerator::new(operation)),
            rng,
            clock: self.clock,
            previous_average,
        }))
    }

    /// Makes sure everything a completed session produced reached storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` before completion and
    /// `SessionError` storage variants if a retry fails.
    pub async fn finish(&self, session: &mut ExerciseSession) -> Result<SessionReport, SessionError> {
        session.finalize_summary().await?;
        session.flush().await?;
        session.report().ok_or(SessionError::NotCompleted)
    }
}
