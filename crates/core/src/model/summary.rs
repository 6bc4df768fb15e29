use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AttemptRecord, AttemptStatus, DifficultyLevel, ModuleKey};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("a session summary needs at least one problem")]
    NoProblems,

    #[error("score ({score}) exceeds total problems ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("too many problems for a single session: {len}")]
    TooManyProblems { len: usize },
}

/// Result of one completed session, as handed to the progress store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    key: ModuleKey,
    completed_at: DateTime<Utc>,
    score: u32,
    total_problems: u32,
    time_spent_secs: u64,
    difficulty: DifficultyLevel,
}

impl SessionSummary {
    /// Rehydrate a summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if the counts are inconsistent.
    pub fn from_persisted(
        key: ModuleKey,
        completed_at: DateTime<Utc>,
        score: u32,
        total_problems: u32,
        time_spent_secs: u64,
        difficulty: DifficultyLevel,
    ) -> Result<Self, SessionSummaryError> {
        if total_problems == 0 {
            return Err(SessionSummaryError::NoProblems);
        }
        if score > total_problems {
            return Err(SessionSummaryError::ScoreExceedsTotal {
                score,
                total: total_problems,
            });
        }
        Ok(Self {
            key,
            completed_at,
            score,
            total_problems,
            time_spent_secs,
            difficulty,
        })
    }

    /// Build a summary from the attempt history of a finished session.
    ///
    /// Slots without a record count as misses.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::NoProblems` for an empty history.
    pub fn from_history(
        key: ModuleKey,
        completed_at: DateTime<Utc>,
        history: &[Option<AttemptRecord>],
        time_spent_secs: u64,
        difficulty: DifficultyLevel,
    ) -> Result<Self, SessionSummaryError> {
        let total_problems = u32::try_from(history.len())
            .map_err(|_| SessionSummaryError::TooManyProblems { len: history.len() })?;
        let score = history
            .iter()
            .flatten()
            .filter(|record| record.status == AttemptStatus::Correct)
            .count();
        let score = u32::try_from(score).unwrap_or(total_problems);

        Self::from_persisted(
            key,
            completed_at,
            score,
            total_problems,
            time_spent_secs,
            difficulty,
        )
    }

    #[must_use]
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_problems(&self) -> u32 {
        self.total_problems
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    /// Score as a percentage of the problems in the session.
    #[must_use]
    pub fn percent(&self) -> f64 {
        f64::from(self.score) * 100.0 / f64::from(self.total_problems)
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.score == self.total_problems
    }
}

/// Aggregate over every persisted summary of one learner+module pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub total_completed: u32,
    /// Best score, in percent.
    pub best_score: f64,
    /// Mean score, in percent.
    pub average_score: f64,
    /// Mean session duration, in seconds.
    pub average_time: f64,
    pub last_attempt: Option<DateTime<Utc>>,
}

impl ModuleProgress {
    #[must_use]
    pub fn from_summaries(summaries: &[SessionSummary]) -> Self {
        if summaries.is_empty() {
            return Self::default();
        }

        #[allow(clippy::cast_precision_loss)]
        let count = summaries.len() as f64;
        let best_score = summaries
            .iter()
            .map(SessionSummary::percent)
            .fold(0.0_f64, f64::max);
        let average_score = summaries.iter().map(SessionSummary::percent).sum::<f64>() / count;
        #[allow(clippy::cast_precision_loss)]
        let average_time = summaries
            .iter()
            .map(|s| s.time_spent_secs() as f64)
            .sum::<f64>()
            / count;
        let last_attempt = summaries.iter().map(SessionSummary::completed_at).max();

        Self {
            total_completed: u32::try_from(summaries.len()).unwrap_or(u32::MAX),
            best_score,
            average_score,
            average_time,
            last_attempt,
        }
    }
}

impl Default for ModuleProgress {
    fn default() -> Self {
        Self {
            total_completed: 0,
            best_score: 0.0,
            average_score: 0.0,
            average_time: 0.0,
            last_attempt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LearnerId, ModuleId, ProblemId};
    use crate::time::fixed_now;

    fn key() -> ModuleKey {
        ModuleKey::new(LearnerId::new(1), ModuleId::new("addition").unwrap())
    }

    fn record(status: AttemptStatus) -> Option<AttemptRecord> {
        let mut record = AttemptRecord::new(ProblemId::random());
        record.status = status;
        record.attempts_used = 1;
        Some(record)
    }

    #[test]
    fn summary_counts_correct_records() {
        let history = vec![
            record(AttemptStatus::Correct),
            record(AttemptStatus::Revealed),
            None,
            record(AttemptStatus::Correct),
        ];
        let summary = SessionSummary::from_history(
            key(),
            fixed_now(),
            &history,
            95,
            DifficultyLevel::Elementary,
        )
        .unwrap();

        assert_eq!(summary.score(), 2);
        assert_eq!(summary.total_problems(), 4);
        assert!((summary.percent() - 50.0).abs() < f64::EPSILON);
        assert!(!summary.is_perfect());
    }

    #[test]
    fn rejects_inconsistent_counts() {
        let err = SessionSummary::from_persisted(
            key(),
            fixed_now(),
            4,
            3,
            10,
            DifficultyLevel::Beginner,
        )
        .unwrap_err();
        assert_eq!(err, SessionSummaryError::ScoreExceedsTotal { score: 4, total: 3 });
    }

    #[test]
    fn progress_aggregates_summaries() {
        let now = fixed_now();
        let later = now + chrono::Duration::minutes(5);
        let summaries = vec![
            SessionSummary::from_persisted(key(), now, 5, 10, 100, DifficultyLevel::Beginner)
                .unwrap(),
            SessionSummary::from_persisted(key(), later, 10, 10, 60, DifficultyLevel::Beginner)
                .unwrap(),
        ];

        let progress = ModuleProgress::from_summaries(&summaries);
        assert_eq!(progress.total_completed, 2);
        assert!((progress.best_score - 100.0).abs() < f64::EPSILON);
        assert!((progress.average_score - 75.0).abs() < f64::EPSILON);
        assert!((progress.average_time - 80.0).abs() < f64::EPSILON);
        assert_eq!(progress.last_attempt, Some(later));
    }

    #[test]
    fn empty_progress_is_zeroed() {
        assert_eq!(ModuleProgress::from_summaries(&[]), ModuleProgress::default());
    }
}
