use thiserror::Error;

use crate::model::{ParseIdError, ProblemError, SessionSummaryError, SettingsError, UnknownDifficulty};

/// Umbrella error for callers that do not care which domain check failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Difficulty(#[from] UnknownDifficulty),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
