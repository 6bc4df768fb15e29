use practice_core::level::LevelChange;
use practice_core::model::{AttemptRecord, AttemptStatus, DifficultyLevel, Problem, RewardDefinition, SessionSummary};

use crate::reward_engine::RewardDraw;

/// Where an exercise session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    NotStarted,
    /// The active problem accepts answers.
    Active,
    /// The active problem is resolved; input and timeouts are ignored.
    WaitingToAdvance,
    /// A level-up must be acknowledged before anything else happens.
    LevelUpPause,
    Completed,
}

/// Read-only snapshot for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub active_index: usize,
    pub total_problems: usize,
    /// Slot being shown; differs from `active_index` while browsing history.
    pub displayed_index: usize,
    pub displayed_problem: Problem,
    pub displayed_record: Option<AttemptRecord>,
    pub elapsed_secs: u64,
    /// `None` when problems are untimed.
    pub remaining_secs: Option<u32>,
    /// Seconds until the automatic advance, when one is scheduled.
    pub auto_advance_in: Option<u32>,
    pub draft: Option<f64>,
    pub level: DifficultyLevel,
    pub correct_streak: u32,
    pub new_rewards: u32,
}

impl SessionState {
    #[must_use]
    pub fn is_viewing_history(&self) -> bool {
        self.displayed_index != self.active_index
    }
}

/// Result of one evaluated attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub status: AttemptStatus,
    pub attempts_used: u32,
    /// Attempts still available, `None` when unlimited.
    pub attempts_left: Option<u32>,
    pub correct_answer: f64,
    pub level_change: Option<LevelChange>,
    pub reward: Option<RewardDraw>,
    pub milestones: Vec<&'static RewardDefinition>,
    /// `false` when level or reward state could not be written; the session
    /// keeps playing and [`flush`] retries.
    ///
    /// [`flush`]: super::ExerciseSession::flush
    pub persisted: bool,
}

impl AttemptOutcome {
    /// Whether the problem can no longer be answered.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status.is_final()
    }
}

/// Response to an answer submission or reveal.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The session is parked or browsing history; nothing changed.
    Ignored,
    Evaluated(AttemptOutcome),
}

/// Everything produced when a session completes.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub summary: SessionSummary,
    /// Row id of the persisted summary, `None` if the write failed.
    pub summary_id: Option<i64>,
    pub rewards: Vec<&'static RewardDefinition>,
    /// Whether the summary, level state and reward ledger all reached storage.
    pub persisted: bool,
}

/// Result of leaving `WaitingToAdvance`.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Next { index: usize },
    /// Compensation appended problems; `index` is the first of them.
    Extended { index: usize, added: u32 },
    Completed(SessionReport),
}

/// Result of one timer tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Idle,
    Expired(AttemptOutcome),
    AutoAdvanced(AdvanceOutcome),
}
