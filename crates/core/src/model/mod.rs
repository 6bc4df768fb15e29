mod attempt;
mod difficulty;
mod ids;
mod problem;
mod reward;
mod settings;
mod summary;

pub use attempt::{AttemptRecord, AttemptStatus};
pub use difficulty::{DifficultyLevel, UnknownDifficulty};
pub use ids::{LearnerId, ModuleId, ModuleKey, ParseIdError, ProblemId};
pub use problem::{format_fixed, Layout, OperationKind, Problem, ProblemError, MAX_DECIMALS};
pub use reward::{
    CollectionDefinition, CollectionProgress, EarnedReward, RewardCategory, RewardDefinition,
    RewardTheme, RewardTier,
};
pub use settings::{
    ExerciseSettings, ExerciseSettingsDraft, RewardType, SettingsError, MAX_ATTEMPTS_LIMIT,
    MAX_PROBLEM_COUNT, MAX_TIME_PER_PROBLEM_SECS,
};
pub use summary::{ModuleProgress, SessionSummary, SessionSummaryError};
