use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    CollectionProgress, DifficultyLevel, EarnedReward, RewardDefinition, RewardTheme,
};
use crate::rewards::catalog::{self, COLLECTIONS};

/// Lifetime problem counts that unlock the milestone rewards. Each module
/// only earns the entries of its own theme.
pub const PROBLEM_MILESTONES: [(u32, &str); 8] = [
    (10, catalog::ADDITION_NOVICE),
    (25, catalog::ADDITION_ENTHUSIAST),
    (50, catalog::ADDITION_EXPERT),
    (100, catalog::ADDITION_MASTER),
    (10, catalog::SUBTRACTION_NOVICE),
    (25, catalog::SUBTRACTION_ENTHUSIAST),
    (50, catalog::SUBTRACTION_EXPERT),
    (100, catalog::SUBTRACTION_MASTER),
];

/// Correct-answer streaks that unlock streak rewards.
pub const STREAK_MILESTONES: [(u32, &str); 3] = [
    (5, catalog::STREAK_5),
    (10, catalog::STREAK_10),
    (20, catalog::STREAK_20),
];

/// Measurements evaluated by [`RewardLedger::check_and_award`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RewardConditions {
    /// Theme of the module being practiced; themed rewards of other modules
    /// are never granted.
    pub theme: RewardTheme,
    pub problems_completed: u32,
    pub streak: u32,
    pub level: Option<DifficultyLevel>,
    pub session_complete: bool,
    pub perfect_session: bool,
    pub improvement: bool,
    pub perseverance: bool,
}

impl RewardConditions {
    #[must_use]
    pub fn new(theme: RewardTheme) -> Self {
        Self {
            theme,
            problems_completed: 0,
            streak: 0,
            level: None,
            session_complete: false,
            perfect_session: false,
            improvement: false,
            perseverance: false,
        }
    }
}

/// Rewards earned by one learner in one module, plus the counters that
/// drive milestone rewards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardLedger {
    earned: Vec<EarnedReward>,
    new_count: u32,
    problems_completed: u32,
}

impl RewardLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a ledger from persisted storage.
    #[must_use]
    pub fn from_persisted(earned: Vec<EarnedReward>, new_count: u32, problems_completed: u32) -> Self {
        Self {
            earned,
            new_count,
            problems_completed,
        }
    }

    #[must_use]
    pub fn earned(&self) -> &[EarnedReward] {
        &self.earned
    }

    #[must_use]
    pub fn holds(&self, id: &str) -> bool {
        self.earned.iter().any(|reward| reward.id == id)
    }

    /// Earned rewards not yet marked seen.
    #[must_use]
    pub fn new_count(&self) -> u32 {
        self.new_count
    }

    #[must_use]
    pub fn problems_completed(&self) -> u32 {
        self.problems_completed
    }

    /// Grants `id`. Returns `false` for rewards already held and for ids
    /// missing from the catalog.
    pub fn award(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let Some(definition) = catalog::find(id) else {
            tracing::warn!(reward = id, "ignoring unknown reward id");
            return false;
        };
        if self.holds(id) {
            return false;
        }

        self.earned.push(EarnedReward {
            id: definition.id.to_string(),
            earned_at: now,
            seen: false,
        });
        self.new_count = self.new_count.saturating_add(1);
        true
    }

    /// Marks an earned reward as seen. Returns `false` if it was not held or
    /// already seen.
    pub fn mark_seen(&mut self, id: &str) -> bool {
        let Some(reward) = self.earned.iter_mut().find(|r| r.id == id && !r.seen) else {
            return false;
        };
        reward.seen = true;
        self.new_count = self.new_count.saturating_sub(1);
        true
    }

    /// Marks everything seen and clears the counter.
    pub fn reset_new_count(&mut self) {
        for reward in &mut self.earned {
            reward.seen = true;
        }
        self.new_count = 0;
    }

    /// Adds to the lifetime problem count and returns the new total.
    pub fn record_problems_completed(&mut self, count: u32) -> u32 {
        self.problems_completed = self.problems_completed.saturating_add(count);
        self.problems_completed
    }

    /// Progress of every collection, in catalog order.
    #[must_use]
    pub fn collections(&self) -> Vec<CollectionProgress> {
        COLLECTIONS
            .iter()
            .map(|collection| self.collection_progress(collection.id, collection.members))
            .collect()
    }

    fn collection_progress(&self, id: &str, members: &[&str]) -> CollectionProgress {
        let earned: Vec<String> = members
            .iter()
            .filter(|member| self.holds(member))
            .map(|member| (*member).to_string())
            .collect();
        let progress = if members.is_empty() {
            0
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pct = (earned.len() as f64 / members.len() as f64 * 100.0).round() as u8;
            pct
        };
        CollectionProgress {
            id: id.to_string(),
            earned,
            progress,
            is_complete: progress == 100,
        }
    }

    /// Grants every satisfied milestone not yet held, in evaluation order:
    /// problem counts, streaks, level, session complete, perfect session,
    /// improvement, perseverance.
    pub fn check_and_award(
        &mut self,
        conditions: &RewardConditions,
        now: DateTime<Utc>,
    ) -> Vec<&'static RewardDefinition> {
        let mut candidates: Vec<&'static str> = Vec::new();

        candidates.extend(
            PROBLEM_MILESTONES
                .iter()
                .filter(|(threshold, _)| conditions.problems_completed >= *threshold)
                .map(|(_, id)| *id),
        );
        candidates.extend(
            STREAK_MILESTONES
                .iter()
                .filter(|(threshold, _)| conditions.streak >= *threshold)
                .map(|(_, id)| *id),
        );
        if let Some(id) = conditions.level.and_then(catalog::level_reward) {
            candidates.push(id);
        }
        if conditions.session_complete {
            candidates.push(catalog::SESSION_COMPLETE);
        }
        if conditions.perfect_session {
            candidates.push(catalog::PERFECT_SESSION);
        }
        if conditions.improvement {
            candidates.push(catalog::IMPROVEMENT_STAR);
        }
        if conditions.perseverance {
            candidates.push(catalog::PERSEVERANCE);
        }

        let mut granted = Vec::new();
        for id in candidates {
            let Some(definition) = catalog::find(id) else {
                continue;
            };
            if definition.theme != RewardTheme::General && definition.theme != conditions.theme {
                continue;
            }
            if self.award(id, now) {
                granted.push(definition);
            }
        }
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn award_is_idempotent() {
        let mut ledger = RewardLedger::new();
        assert!(ledger.award(catalog::STREAK_5, fixed_now()));
        assert!(!ledger.award(catalog::STREAK_5, fixed_now()));
        assert_eq!(ledger.earned().len(), 1);
        assert_eq!(ledger.new_count(), 1);
    }

    #[test]
    fn unknown_reward_is_a_no_op() {
        let mut ledger = RewardLedger::new();
        assert!(!ledger.award("golden-unicorn", fixed_now()));
        assert!(ledger.earned().is_empty());
    }

    #[test]
    fn collections_track_members() {
        let mut ledger = RewardLedger::new();
        ledger.award(catalog::STREAK_5, fixed_now());
        let streaks = ledger
            .collections()
            .into_iter()
            .find(|c| c.id == "streak-collection")
            .unwrap();
        assert_eq!(streaks.progress, 33);
        assert!(!streaks.is_complete);

        ledger.award(catalog::STREAK_10, fixed_now());
        ledger.award(catalog::STREAK_20, fixed_now());
        let streaks = ledger
            .collections()
            .into_iter()
            .find(|c| c.id == "streak-collection")
            .unwrap();
        assert_eq!(streaks.progress, 100);
        assert!(streaks.is_complete);
        assert_eq!(streaks.earned.len(), 3);
    }

    #[test]
    fn seen_tracking() {
        let mut ledger = RewardLedger::new();
        ledger.award(catalog::STREAK_5, fixed_now());
        ledger.award(catalog::SURPRISE_GIFT, fixed_now());
        assert!(ledger.mark_seen(catalog::STREAK_5));
        assert!(!ledger.mark_seen(catalog::STREAK_5));
        assert_eq!(ledger.new_count(), 1);

        ledger.reset_new_count();
        assert_eq!(ledger.new_count(), 0);
        assert!(ledger.earned().iter().all(|r| r.seen));
    }

    #[test]
    fn check_and_award_grants_in_order() {
        let mut ledger = RewardLedger::new();
        let conditions = RewardConditions {
            problems_completed: 26,
            streak: 10,
            level: Some(DifficultyLevel::Intermediate),
            perfect_session: true,
            ..RewardConditions::new(RewardTheme::Addition)
        };

        let granted: Vec<_> = ledger
            .check_and_award(&conditions, fixed_now())
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(
            granted,
            vec![
                catalog::ADDITION_NOVICE,
                catalog::ADDITION_ENTHUSIAST,
                catalog::STREAK_5,
                catalog::STREAK_10,
                catalog::LEVEL_INTERMEDIATE,
                catalog::PERFECT_SESSION,
            ]
        );

        // Second evaluation grants nothing new.
        assert!(ledger.check_and_award(&conditions, fixed_now()).is_empty());
    }

    #[test]
    fn themed_milestones_stay_in_their_module() {
        let mut ledger = RewardLedger::new();
        let conditions = RewardConditions {
            problems_completed: 25,
            session_complete: true,
            ..RewardConditions::new(RewardTheme::Subtraction)
        };
        let granted: Vec<_> = ledger
            .check_and_award(&conditions, fixed_now())
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(
            granted,
            vec![
                catalog::SUBTRACTION_NOVICE,
                catalog::SUBTRACTION_ENTHUSIAST,
                catalog::SESSION_COMPLETE,
            ]
        );
        assert!(!ledger.holds(catalog::ADDITION_NOVICE));

        let subtraction = ledger
            .collections()
            .into_iter()
            .find(|c| c.id == "subtraction-collection")
            .unwrap();
        assert_eq!(subtraction.progress, 50);
    }

    #[test]
    fn problem_counter_accumulates() {
        let mut ledger = RewardLedger::new();
        assert_eq!(ledger.record_problems_completed(12), 12);
        assert_eq!(ledger.record_problems_completed(3), 15);
    }
}
