use std::sync::Arc;

use practice_core::evaluator;
use practice_core::generator::ProblemGenerator;
use practice_core::level::LevelChange;
use practice_core::model::{
    AttemptRecord, AttemptStatus, DifficultyLevel, ExerciseSettings, ModuleKey, Problem,
    RewardDefinition, SessionSummary,
};
use practice_core::rewards::{RewardConditions, RewardContext};
use practice_core::{Clock, Countdown, Stopwatch};
use rand::rngs::StdRng;
use storage::repository::ProgressRepository;

use super::compensation::{CompensationPolicy, NoCompensation, OnePerMiss};
use super::state::{
    AdvanceOutcome, AttemptOutcome, SessionPhase, SessionReport, SessionState, SubmitOutcome,
    TickOutcome,
};
use crate::error::SessionError;
use crate::level_manager::LevelManager;
use crate::reward_engine::{RewardDraw, RewardEngine};

/// Score gain over the previous average, in percentage points, that earns
/// the improvement reward.
pub const IMPROVEMENT_THRESHOLD: f64 = 20.0;
/// Failed attempts before a correct answer that count as perseverance.
pub const PERSEVERANCE_ATTEMPTS: u32 = 2;

/// Collaborators and configuration for one session.
pub struct SessionParts {
    pub key: ModuleKey,
    pub settings: ExerciseSettings,
    pub levels: LevelManager,
    pub rewards: RewardEngine,
    pub progress: Arc<dyn ProgressRepository>,
    pub generator: Arc<dyn ProblemGenerator>,
    pub rng: StdRng,
    pub clock: Clock,
    /// Mean score percentage of earlier sessions, if any.
    pub previous_average: Option<f64>,
}

/// One run of practice problems.
///
/// Time only moves through [`tick`](Self::tick), one call per second. The
/// per-problem countdown runs only while a problem is `Active`, so a tick
/// arriving after the problem was resolved has nothing to expire.
pub struct ExerciseSession {
    key: ModuleKey,
    settings: ExerciseSettings,
    problems: Vec<Problem>,
    history: Vec<Option<AttemptRecord>>,
    active_index: usize,
    phase: SessionPhase,
    draft: Option<f64>,
    viewing: Option<usize>,
    countdown: Countdown,
    stopwatch: Stopwatch,
    auto_advance: Option<u32>,
    streak: u32,
    last_reward_index: Option<u32>,
    pending_level_up: Option<LevelChange>,
    compensation_added: u32,
    granted: Vec<&'static RewardDefinition>,
    summary: Option<SessionSummary>,
    summary_id: Option<i64>,
    previous_average: Option<f64>,
    levels: LevelManager,
    rewards: RewardEngine,
    progress: Arc<dyn ProgressRepository>,
    generator: Arc<dyn ProblemGenerator>,
    compensation: Box<dyn CompensationPolicy>,
    rng: StdRng,
    clock: Clock,
}

impl ExerciseSession {
    /// Generates every problem of the run up front at the current level.
    #[must_use]
    pub fn new(parts: SessionParts) -> Self {
        let compensation: Box<dyn CompensationPolicy> = if parts.settings.compensation_enabled() {
            Box::new(OnePerMiss::default())
        } else {
            Box::new(NoCompensation)
        };
        let countdown = Countdown::new(parts.settings.time_per_problem().unwrap_or(0));

        let mut session = Self {
            key: parts.key,
            settings: parts.settings,
            problems: Vec::new(),
            history: Vec::new(),
            active_index: 0,
            phase: SessionPhase::NotStarted,
            draft: None,
            viewing: None,
            countdown,
            stopwatch: Stopwatch::default(),
            auto_advance: None,
            streak: 0,
            last_reward_index: None,
            pending_level_up: None,
            compensation_added: 0,
            granted: Vec::new(),
            summary: None,
            summary_id: None,
            previous_average: parts.previous_average,
            levels: parts.levels,
            rewards: parts.rewards,
            progress: parts.progress,
            generator: parts.generator,
            compensation,
            rng: parts.rng,
            clock: parts.clock,
        };
        session.append_problems(session.settings.problem_count());
        tracing::debug!(
            key = %session.key,
            problems = session.problems.len(),
            level = %session.generation_level(),
            "session created"
        );
        session
    }

    #[must_use]
    pub fn with_compensation(mut self, policy: Box<dyn CompensationPolicy>) -> Self {
        self.compensation = policy;
        self
    }

    // ─── Accessors ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    #[must_use]
    pub fn settings(&self) -> &ExerciseSettings {
        &self.settings
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    #[must_use]
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    #[must_use]
    pub fn history(&self) -> &[Option<AttemptRecord>] {
        &self.history
    }

    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    #[must_use]
    pub fn active_problem(&self) -> &Problem {
        &self.problems[self.active_index]
    }

    #[must_use]
    pub fn pending_level_up(&self) -> Option<LevelChange> {
        self.pending_level_up
    }

    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn summary_id(&self) -> Option<i64> {
        self.summary_id
    }

    /// Rewards granted during this run, in the order they were earned.
    #[must_use]
    pub fn granted_rewards(&self) -> &[&'static RewardDefinition] {
        &self.granted
    }

    #[must_use]
    pub fn level_manager(&self) -> &LevelManager {
        &self.levels
    }

    #[must_use]
    pub fn reward_engine(&self) -> &RewardEngine {
        &self.rewards
    }

    /// The completion report, once the session is completed.
    #[must_use]
    pub fn report(&self) -> Option<SessionReport> {
        self.summary.clone().map(|summary| SessionReport {
            summary,
            summary_id: self.summary_id,
            rewards: self.granted.clone(),
            persisted: self.summary_id.is_some() && self.is_synced(),
        })
    }

    /// Whether level state and the reward ledger match what is stored.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.levels.is_synced() && self.rewards.is_synced()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        let displayed_index = self.viewing.unwrap_or(self.active_index);
        SessionState {
            phase: self.phase,
            active_index: self.active_index,
            total_problems: self.problems.len(),
            displayed_index,
            displayed_problem: self.problems[displayed_index].clone(),
            displayed_record: self.history[displayed_index].clone(),
            elapsed_secs: self.stopwatch.elapsed_secs(),
            remaining_secs: self
                .settings
                .time_per_problem()
                .map(|_| self.countdown.remaining_secs()),
            auto_advance_in: self.auto_advance,
            draft: self.draft,
            level: self.generation_level(),
            correct_streak: self.streak,
            new_rewards: self.rewards.ledger().new_count(),
        }
    }

    // ─── Transitions ───────────────────────────────────────────────────────

    /// Starts the clocks. Submitting an answer starts the session as well.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is over.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Completed {
            return Err(SessionError::Completed);
        }
        self.begin();
        Ok(())
    }

    /// Stages an answer without submitting it. The staged answer is evaluated
    /// if the countdown runs out. Returns `false` when input is not accepted.
    pub fn update_draft(&mut self, draft: Option<f64>) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.begin();
        self.draft = draft;
        true
    }

    /// Evaluates `answer` against the active problem.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is over.
    pub async fn submit_answer(&mut self, answer: f64) -> Result<SubmitOutcome, SessionError> {
        if self.phase == SessionPhase::Completed {
            return Err(SessionError::Completed);
        }
        if !self.accepts_input() {
            return Ok(SubmitOutcome::Ignored);
        }
        self.begin();
        Ok(SubmitOutcome::Evaluated(self.evaluate(answer, false).await))
    }

    /// Submits the per-digit answer slots of the active problem.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session is over.
    pub async fn submit_slots(&mut self, slots: &[Option<u8>]) -> Result<SubmitOutcome, SessionError> {
        let answer = evaluator::compose_answer(self.active_problem(), slots);
        self.submit_answer(answer).await
    }

    /// Shows the answer and resolves the active problem.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RevealDisabled` when the settings forbid it and
    /// `SessionError::Completed` once the session is over.
    pub async fn reveal(&mut self) -> Result<SubmitOutcome, SessionError> {
        if self.phase == SessionPhase::Completed {
            return Err(SessionError::Completed);
        }
        if !self.settings.show_answer() {
            return Err(SessionError::RevealDisabled);
        }
        if !self.accepts_input() {
            return Ok(SubmitOutcome::Ignored);
        }
        self.begin();
        self.auto_advance = None;

        let max_attempts = self.settings.max_attempts();
        let index = self.active_index;
        let problem = &self.problems[index];
        let correct_answer = problem.correct_answer();
        let problem_id = problem.id();
        let record = self.history[index].get_or_insert_with(|| AttemptRecord::new(problem_id));
        if max_attempts.is_none_or(|max| record.attempts_used < max) {
            record.attempts_used += 1;
        }
        record.status = AttemptStatus::Revealed;
        let attempts_used = record.attempts_used;

        self.streak = 0;
        self.draft = None;
        self.park();
        tracing::debug!(key = %self.key, index, attempts_used, "answer revealed");

        Ok(SubmitOutcome::Evaluated(AttemptOutcome {
            status: AttemptStatus::Revealed,
            attempts_used,
            attempts_left: max_attempts.map(|max| max.saturating_sub(attempts_used)),
            correct_answer,
            level_change: None,
            reward: None,
            milestones: Vec::new(),
            persisted: self.is_synced(),
        }))
    }

    /// Advances the clocks by one second.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if an automatic advance completes the session
    /// and the summary cannot be built.
    pub async fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if self.phase == SessionPhase::Completed {
            return Ok(TickOutcome::Idle);
        }
        self.stopwatch.tick();

        match self.phase {
            SessionPhase::Active => {
                if self.countdown.tick() {
                    tracing::debug!(key = %self.key, index = self.active_index, "problem timed out");
                    let outcome = match self.draft.take() {
                        Some(draft) => self.evaluate(draft, false).await,
                        None => self.evaluate(f64::NAN, true).await,
                    };
                    return Ok(TickOutcome::Expired(outcome));
                }
            }
            SessionPhase::WaitingToAdvance => match self.auto_advance {
                Some(remaining) if remaining <= 1 => {
                    self.auto_advance = None;
                    return Ok(TickOutcome::AutoAdvanced(self.advance().await?));
                }
                Some(remaining) => self.auto_advance = Some(remaining - 1),
                None => {}
            },
            _ => {}
        }
        Ok(TickOutcome::Idle)
    }

    /// Moves past a resolved problem, completing the session after the last.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotWaiting` unless the active problem is
    /// resolved, `SessionError::LevelUpPending` during a level-up pause and
    /// `SessionError::Completed` once the session is over.
    pub async fn advance(&mut self) -> Result<AdvanceOutcome, SessionError> {
        match self.phase {
            SessionPhase::WaitingToAdvance => {}
            SessionPhase::LevelUpPause => return Err(SessionError::LevelUpPending),
            SessionPhase::Completed => return Err(SessionError::Completed),
            SessionPhase::NotStarted | SessionPhase::Active => {
                return Err(SessionError::NotWaiting);
            }
        }
        self.auto_advance = None;
        self.viewing = None;

        let next = self.active_index + 1;
        if next < self.problems.len() {
            self.activate(next);
            return Ok(AdvanceOutcome::Next { index: next });
        }

        let added = self
            .compensation
            .extra_problems(&self.history, self.compensation_added);
        if added > 0 {
            self.append_problems(added);
            self.compensation_added += added;
            tracing::info!(key = %self.key, added, "session extended");
            self.activate(next);
            return Ok(AdvanceOutcome::Extended { index: next, added });
        }

        Ok(AdvanceOutcome::Completed(self.complete().await?))
    }

    /// Releases a level-up pause. The active slot gets a fresh problem at
    /// the new level.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoLevelUpPending` outside a level-up pause.
    pub fn acknowledge_level_up(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::LevelUpPause => {}
            SessionPhase::Completed => return Err(SessionError::Completed),
            _ => return Err(SessionError::NoLevelUpPending),
        }
        let level = self.generation_level();
        let index = self.active_index;
        self.problems[index] = self.generator.generate(level, &mut self.rng);
        self.history[index] = None;
        self.pending_level_up = None;
        self.viewing = None;
        self.activate(index);
        tracing::debug!(key = %self.key, index, %level, "level-up acknowledged");
        Ok(())
    }

    // ─── History browsing ──────────────────────────────────────────────────

    /// Shows the slot before the one on display. The active problem's
    /// countdown is held until the learner is back on it.
    pub fn view_previous(&mut self) -> bool {
        if self.phase == SessionPhase::NotStarted {
            return false;
        }
        let shown = self.viewing.unwrap_or(self.active_index);
        if shown == 0 {
            return false;
        }
        self.auto_advance = None;
        self.countdown.stop();
        self.viewing = Some(shown - 1);
        true
    }

    /// Shows the slot after the one on display, returning to the active
    /// problem when reached.
    pub fn view_next(&mut self) -> bool {
        let Some(shown) = self.viewing else {
            return false;
        };
        self.auto_advance = None;
        self.viewing = (shown + 1 < self.active_index).then_some(shown + 1);
        if self.viewing.is_none() {
            self.resume_active();
        }
        true
    }

    pub fn return_to_active(&mut self) -> bool {
        self.auto_advance = None;
        if self.viewing.take().is_none() {
            return false;
        }
        self.resume_active();
        true
    }

    pub fn cancel_auto_advance(&mut self) -> bool {
        self.auto_advance.take().is_some()
    }

    // ─── Persistence ───────────────────────────────────────────────────────

    /// Retries the summary write after a failed completion save.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` before completion and
    /// `SessionError::Storage` if the write fails again.
    pub async fn finalize_summary(&mut self) -> Result<i64, SessionError> {
        if let Some(id) = self.summary_id {
            return Ok(id);
        }
        let Some(summary) = &self.summary else {
            return Err(SessionError::NotCompleted);
        };
        let id = self.progress.append_result(summary).await?;
        self.summary_id = Some(id);
        Ok(id)
    }

    /// Retries level and reward writes that failed during the run.
    ///
    /// # Errors
    ///
    /// Returns the first storage error still outstanding.
    pub async fn flush(&mut self) -> Result<(), SessionError> {
        self.levels.flush().await?;
        self.rewards.flush().await?;
        Ok(())
    }

    // ─── Internals ─────────────────────────────────────────────────────────

    /// Picks the countdown up where browsing left it.
    fn resume_active(&mut self) {
        if self.phase == SessionPhase::Active {
            self.countdown.resume();
        }
    }

    fn accepts_input(&self) -> bool {
        self.viewing.is_none()
            && matches!(self.phase, SessionPhase::NotStarted | SessionPhase::Active)
    }

    fn begin(&mut self) {
        if self.phase != SessionPhase::NotStarted {
            return;
        }
        self.phase = SessionPhase::Active;
        self.stopwatch.start();
        self.countdown.restart();
        tracing::debug!(key = %self.key, "session started");
    }

    fn generation_level(&self) -> DifficultyLevel {
        if self.settings.adaptive_difficulty() {
            self.levels.current_level()
        } else {
            self.settings.difficulty()
        }
    }

    fn append_problems(&mut self, count: u32) {
        let level = self.generation_level();
        for _ in 0..count {
            let problem = self.generator.generate(level, &mut self.rng);
            self.problems.push(problem);
            self.history.push(None);
        }
    }

    fn activate(&mut self, index: usize) {
        self.active_index = index;
        self.phase = SessionPhase::Active;
        self.draft = None;
        self.countdown.restart();
    }

    /// Resolved problem: stop the countdown and wait for an advance.
    fn park(&mut self) {
        self.countdown.stop();
        self.phase = SessionPhase::WaitingToAdvance;
        self.auto_advance = self.settings.auto_advance_delay();
    }

    async fn evaluate(&mut self, answer: f64, timed_out: bool) -> AttemptOutcome {
        self.auto_advance = None;
        self.draft = None;

        let max_attempts = self.settings.max_attempts();
        let index = self.active_index;
        let problem = &self.problems[index];
        let is_correct = evaluator::check(problem, answer);
        let correct_answer = problem.correct_answer();
        let problem_id = problem.id();

        let record = self.history[index].get_or_insert_with(|| AttemptRecord::new(problem_id));
        record.attempts_used += 1;
        record.submitted_answer = answer;
        let attempts_used = record.attempts_used;
        let exhausted = max_attempts.is_some_and(|max| attempts_used >= max);
        record.status = if is_correct {
            AttemptStatus::Correct
        } else if exhausted {
            AttemptStatus::Revealed
        } else if timed_out {
            AttemptStatus::TimedOut
        } else {
            AttemptStatus::Incorrect
        };
        let status = record.status;
        let failed_attempts = record.failed_attempts();

        tracing::debug!(
            key = %self.key,
            index,
            ?status,
            attempts_used,
            "attempt evaluated"
        );

        let mut outcome = AttemptOutcome {
            status,
            attempts_used,
            attempts_left: max_attempts.map(|max| max.saturating_sub(attempts_used)),
            correct_answer,
            level_change: None,
            reward: None,
            milestones: Vec::new(),
            persisted: true,
        };

        if is_correct {
            self.streak += 1;
            self.countdown.stop();
            let change = self.levels.register_correct().await;
            let (reward, milestones) = self.correct_answer_rewards(failed_attempts, change).await;
            outcome.level_change = change;
            outcome.reward = reward;
            outcome.milestones = milestones;

            if change.is_some() {
                self.phase = SessionPhase::LevelUpPause;
                self.pending_level_up = change;
            } else {
                self.park();
            }
        } else {
            self.streak = 0;
            outcome.level_change = self.levels.register_incorrect().await;
            if exhausted {
                self.park();
            } else {
                self.countdown.restart();
            }
        }
        outcome.persisted = self.is_synced();
        outcome
    }

    async fn correct_answer_rewards(
        &mut self,
        failed_attempts: u32,
        change: Option<LevelChange>,
    ) -> (Option<RewardDraw>, Vec<&'static RewardDefinition>) {
        if !self.settings.rewards_enabled() {
            return (None, Vec::new());
        }
        let problem_index = to_u32(self.active_index);
        let context = RewardContext {
            problem_index,
            total_problems: to_u32(self.problems.len()),
            streak: self.streak,
            difficulty: self.problems[self.active_index].difficulty(),
            previous_reward_shown: self.last_reward_index,
        };
        let draw = self.rewards.maybe_reward(&context, &mut self.rng).await;
        if draw.offered {
            self.last_reward_index = Some(problem_index);
        }

        let conditions = RewardConditions {
            streak: self.streak,
            level: change.map(|change| change.new),
            perseverance: failed_attempts >= PERSEVERANCE_ATTEMPTS,
            ..RewardConditions::new(self.rewards.theme())
        };
        let milestones = self.rewards.check_and_award(&conditions).await;

        self.granted.extend(draw.granted);
        self.granted.extend(milestones.iter().copied());
        (Some(draw), milestones)
    }

    async fn complete(&mut self) -> Result<SessionReport, SessionError> {
        self.phase = SessionPhase::Completed;
        self.countdown.stop();
        self.stopwatch.stop();
        self.auto_advance = None;
        self.viewing = None;

        let summary = SessionSummary::from_history(
            self.key.clone(),
            self.clock.now(),
            &self.history,
            self.stopwatch.elapsed_secs(),
            self.generation_level(),
        )?;

        if self.settings.rewards_enabled() {
            let total = self
                .rewards
                .record_problems_completed(summary.total_problems())
                .await;
            let improvement = self
                .previous_average
                .is_some_and(|average| summary.percent() >= average + IMPROVEMENT_THRESHOLD);
            let conditions = RewardConditions {
                problems_completed: total,
                streak: self.streak,
                session_complete: true,
                perfect_session: summary.is_perfect(),
                improvement,
                ..RewardConditions::new(self.rewards.theme())
            };
            let milestones = self.rewards.check_and_award(&conditions).await;
            self.granted.extend(milestones);
        }

        self.summary_id = match self.progress.append_result(&summary).await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "session summary not persisted");
                None
            }
        };
        tracing::info!(
            key = %self.key,
            score = summary.score(),
            total = summary.total_problems(),
            elapsed_secs = summary.time_spent_secs(),
            "session completed"
        );

        self.summary = Some(summary.clone());
        Ok(SessionReport {
            summary,
            summary_id: self.summary_id,
            rewards: self.granted.clone(),
            persisted: self.summary_id.is_some() && self.is_synced(),
        })
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
