//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::model::{SessionSummaryError, SettingsError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `LevelManager`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LevelError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `RewardEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RewardError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by exercise sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already completed")]
    Completed,
    #[error("session is not completed yet")]
    NotCompleted,
    #[error("no problem is waiting to advance")]
    NotWaiting,
    #[error("a level-up must be acknowledged first")]
    LevelUpPending,
    #[error("no level-up is pending")]
    NoLevelUpPending,
    #[error("revealing answers is disabled for this module")]
    RevealDisabled,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Reward(#[from] RewardError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
