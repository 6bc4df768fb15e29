use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::DifficultyLevel;

/// Largest number of problems a single session may hold.
pub const MAX_PROBLEM_COUNT: u32 = 100;
/// Longest per-problem countdown, in seconds.
pub const MAX_TIME_PER_PROBLEM_SECS: u32 = 600;
/// Highest finite attempt limit (`0` means unlimited).
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;
/// Accepted range for the auto-advance delay.
pub const AUTO_ADVANCE_DELAY_RANGE: std::ops::RangeInclusive<u32> = 1..=30;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("problem count must be between 1 and {MAX_PROBLEM_COUNT}")]
    InvalidProblemCount,

    #[error("time per problem must be at most {MAX_TIME_PER_PROBLEM_SECS} seconds")]
    InvalidTimePerProblem,

    #[error("max attempts must be at most {MAX_ATTEMPTS_LIMIT}")]
    InvalidMaxAttempts,

    #[error("auto-advance delay must be between 1 and 30 seconds")]
    InvalidAutoAdvanceDelay,

    #[error("unknown reward type: {0}")]
    UnknownRewardType(String),
}

//
// ─── REWARD TYPE ───────────────────────────────────────────────────────────────
//

/// Visual flavour of the rewards shown to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    #[default]
    Stars,
    Medals,
    Trophies,
}

impl RewardType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RewardType::Stars => "stars",
            RewardType::Medals => "medals",
            RewardType::Trophies => "trophies",
        }
    }
}

impl fmt::Display for RewardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stars" => Ok(Self::Stars),
            "medals" => Ok(Self::Medals),
            "trophies" => Ok(Self::Trophies),
            _ => Err(SettingsError::UnknownRewardType(s.to_string())),
        }
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Unvalidated settings record, as read from a form or a stored JSON blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExerciseSettingsDraft {
    pub difficulty: DifficultyLevel,
    pub problem_count: u32,
    /// Seconds per problem, `0` disables the countdown.
    pub time_value_per_problem: u32,
    /// Attempts per problem, `0` means unlimited.
    pub max_attempts: u32,
    pub enable_adaptive_difficulty: bool,
    pub enable_rewards: bool,
    pub reward_type: RewardType,
    pub show_answer: bool,
    pub enable_compensation: bool,
    pub auto_advance: bool,
    pub auto_advance_delay_secs: u32,
}

impl Default for ExerciseSettingsDraft {
    fn default() -> Self {
        Self {
            difficulty: DifficultyLevel::Beginner,
            problem_count: 12,
            time_value_per_problem: 0,
            max_attempts: 2,
            enable_adaptive_difficulty: true,
            enable_rewards: true,
            reward_type: RewardType::Stars,
            show_answer: true,
            enable_compensation: false,
            auto_advance: false,
            auto_advance_delay_secs: 3,
        }
    }
}

impl ExerciseSettingsDraft {
    /// Validate the draft into settings a session can run with.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` naming the first field out of range.
    pub fn validate(self) -> Result<ExerciseSettings, SettingsError> {
        if !(1..=MAX_PROBLEM_COUNT).contains(&self.problem_count) {
            return Err(SettingsError::InvalidProblemCount);
        }
        if self.time_value_per_problem > MAX_TIME_PER_PROBLEM_SECS {
            return Err(SettingsError::InvalidTimePerProblem);
        }
        if self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(SettingsError::InvalidMaxAttempts);
        }
        if !AUTO_ADVANCE_DELAY_RANGE.contains(&self.auto_advance_delay_secs) {
            return Err(SettingsError::InvalidAutoAdvanceDelay);
        }
        Ok(ExerciseSettings { inner: self })
    }
}

/// Validated per-module exercise configuration.
///
/// Read once when a session starts; later edits never reach a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExerciseSettingsDraft", into = "ExerciseSettingsDraft")]
pub struct ExerciseSettings {
    inner: ExerciseSettingsDraft,
}

impl ExerciseSettings {
    /// Shorthand for validating a draft.
    ///
    /// # Errors
    ///
    /// Same as [`ExerciseSettingsDraft::validate`].
    pub fn new(draft: ExerciseSettingsDraft) -> Result<Self, SettingsError> {
        draft.validate()
    }

    /// Copy of the settings as an editable draft.
    #[must_use]
    pub fn to_draft(&self) -> ExerciseSettingsDraft {
        self.inner.clone()
    }

    #[must_use]
    pub fn difficulty(&self) -> DifficultyLevel {
        self.inner.difficulty
    }

    #[must_use]
    pub fn problem_count(&self) -> u32 {
        self.inner.problem_count
    }

    /// Per-problem countdown, `None` when unlimited.
    #[must_use]
    pub fn time_per_problem(&self) -> Option<u32> {
        (self.inner.time_value_per_problem > 0).then_some(self.inner.time_value_per_problem)
    }

    /// Attempt limit, `None` when unlimited.
    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        (self.inner.max_attempts > 0).then_some(self.inner.max_attempts)
    }

    #[must_use]
    pub fn adaptive_difficulty(&self) -> bool {
        self.inner.enable_adaptive_difficulty
    }

    #[must_use]
    pub fn rewards_enabled(&self) -> bool {
        self.inner.enable_rewards
    }

    #[must_use]
    pub fn reward_type(&self) -> RewardType {
        self.inner.reward_type
    }

    #[must_use]
    pub fn show_answer(&self) -> bool {
        self.inner.show_answer
    }

    #[must_use]
    pub fn compensation_enabled(&self) -> bool {
        self.inner.enable_compensation
    }

    /// Auto-advance delay in seconds, `None` when auto-advance is off.
    #[must_use]
    pub fn auto_advance_delay(&self) -> Option<u32> {
        self.inner
            .auto_advance
            .then_some(self.inner.auto_advance_delay_secs)
    }
}

impl Default for ExerciseSettings {
    fn default() -> Self {
        Self {
            inner: ExerciseSettingsDraft::default(),
        }
    }
}

impl TryFrom<ExerciseSettingsDraft> for ExerciseSettings {
    type Error = SettingsError;

    fn try_from(draft: ExerciseSettingsDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<ExerciseSettings> for ExerciseSettingsDraft {
    fn from(settings: ExerciseSettings) -> Self {
        settings.inner
    }
}
