use std::sync::Arc;

use practice_core::model::{ExerciseSettings, ModuleKey};
use practice_core::rewards::RewardLedger;
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::notifications::{NotificationChannel, NotificationHub};
use crate::progress::ProgressService;
use crate::sessions::ExerciseLoopService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    notifications: Arc<NotificationHub>,
    exercise_loop: Arc<ExerciseLoopService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, clock).await?;
        Ok(Self::with_storage(storage, clock))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::with_storage(Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn with_storage(storage: Storage, clock: Clock) -> Self {
        let notifications = Arc::new(NotificationHub::default());
        let notifier: Arc<dyn NotificationChannel> = notifications.clone();
        let exercise_loop = Arc::new(ExerciseLoopService::new(clock, &storage, notifier));
        let progress = Arc::new(ProgressService::new(Arc::clone(&storage.progress)));
        Self {
            storage,
            notifications,
            exercise_loop,
            progress,
        }
    }

    /// Settings for `key`, defaults when none were saved.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the settings cannot be read.
    pub async fn settings(&self, key: &ModuleKey) -> Result<ExerciseSettings, AppServicesError> {
        Ok(self
            .storage
            .settings
            .load_settings(key)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the settings cannot be written.
    pub async fn save_settings(
        &self,
        key: &ModuleKey,
        settings: &ExerciseSettings,
    ) -> Result<(), AppServicesError> {
        self.storage.settings.save_settings(key, settings).await?;
        Ok(())
    }

    /// Rewards earned in `key`'s module.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the ledger cannot be read.
    pub async fn reward_ledger(&self, key: &ModuleKey) -> Result<RewardLedger, AppServicesError> {
        Ok(self.storage.rewards.load_ledger(key).await?)
    }

    #[must_use]
    pub fn notifications(&self) -> Arc<NotificationHub> {
        Arc::clone(&self.notifications)
    }

    #[must_use]
    pub fn exercise_loop(&self) -> Arc<ExerciseLoopService> {
        Arc::clone(&self.exercise_loop)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
