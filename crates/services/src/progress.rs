use std::sync::Arc;

use practice_core::model::{ModuleKey, ModuleProgress, SessionSummary};
use storage::repository::ProgressRepository;

use crate::error::ProgressError;
use crate::sessions::HISTORY_WINDOW;

/// Read side of the progress store.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self { progress }
    }

    /// Aggregate over the module's most recent sessions.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if results cannot be loaded.
    pub async fn module_progress(&self, key: &ModuleKey) -> Result<ModuleProgress, ProgressError> {
        let results = self.progress.list_results(key, HISTORY_WINDOW).await?;
        Ok(ModuleProgress::from_summaries(&results))
    }

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if results cannot be loaded.
    pub async fn recent_results(
        &self,
        key: &ModuleKey,
        limit: u32,
    ) -> Result<Vec<SessionSummary>, ProgressError> {
        Ok(self.progress.list_results(key, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use practice_core::fixed_now;
    use practice_core::model::{DifficultyLevel, LearnerId, ModuleId};
    use storage::repository::InMemoryRepository;

    fn key() -> ModuleKey {
        ModuleKey::new(LearnerId::new(1), ModuleId::new("addition").unwrap())
    }

    #[tokio::test]
    async fn aggregates_persisted_sessions() {
        let repo = Arc::new(InMemoryRepository::new());
        for (minutes, score, secs) in [(0, 6, 100), (10, 12, 200)] {
            let summary = SessionSummary::from_persisted(
                key(),
                fixed_now() + Duration::minutes(minutes),
                score,
                12,
                secs,
                DifficultyLevel::Beginner,
            )
            .unwrap();
            repo.append_result(&summary).await.unwrap();
        }
        let service = ProgressService::new(repo);

        let progress = service.module_progress(&key()).await.unwrap();
        assert_eq!(progress.total_completed, 2);
        assert!((progress.best_score - 100.0).abs() < f64::EPSILON);
        assert!((progress.average_score - 75.0).abs() < f64::EPSILON);
        assert!((progress.average_time - 150.0).abs() < f64::EPSILON);
        assert_eq!(progress.last_attempt, Some(fixed_now() + Duration::minutes(10)));

        let recent = service.recent_results(&key(), 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].score(), 12);
    }

    #[tokio::test]
    async fn empty_module_has_default_progress() {
        let service = ProgressService::new(Arc::new(InMemoryRepository::new()));
        let progress = service.module_progress(&key()).await.unwrap();
        assert_eq!(progress, ModuleProgress::default());
    }
}
