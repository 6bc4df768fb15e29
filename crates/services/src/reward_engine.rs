use std::sync::Arc;

use practice_core::Clock;
use practice_core::model::{CollectionProgress, ModuleKey, RewardDefinition, RewardTheme};
use practice_core::rewards::{
    RewardConditions, RewardContext, RewardLedger, catalog, reward_probability,
    select_random_reward,
};
use rand::{Rng, RngCore};
use storage::repository::RewardRepository;

use crate::error::RewardError;
use crate::notifications::{EngineEvent, NotificationChannel};

/// Outcome of one probabilistic reward checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardDraw {
    pub probability: f64,
    /// Whether the draw hit and a reward should be shown.
    pub offered: bool,
    /// Newly granted reward, if the hit unlocked one.
    pub granted: Option<&'static RewardDefinition>,
    /// Reward to show for a hit: the granted one, otherwise a random pick
    /// from the general catalog that is displayed but not awarded.
    pub featured: Option<&'static RewardDefinition>,
}

/// Owns one learner+module reward ledger and persists every mutation.
pub struct RewardEngine {
    key: ModuleKey,
    theme: RewardTheme,
    ledger: RewardLedger,
    repo: Arc<dyn RewardRepository>,
    notifier: Arc<dyn NotificationChannel>,
    clock: Clock,
    unsynced: bool,
}

impl RewardEngine {
    /// Load the ledger for `key`. `theme` limits themed milestone rewards to
    /// the module being practiced.
    ///
    /// # Errors
    ///
    /// Returns `RewardError::Storage` if the ledger cannot be read.
    pub async fn load(
        key: ModuleKey,
        theme: RewardTheme,
        clock: Clock,
        repo: Arc<dyn RewardRepository>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Result<Self, RewardError> {
        let ledger = repo.load_ledger(&key).await?;
        tracing::debug!(%key, earned = ledger.earned().len(), "reward ledger loaded");
        Ok(Self {
            key,
            theme,
            ledger,
            repo,
            notifier,
            clock,
            unsynced: false,
        })
    }

    #[must_use]
    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    #[must_use]
    pub fn theme(&self) -> RewardTheme {
        self.theme
    }

    #[must_use]
    pub fn collections(&self) -> Vec<CollectionProgress> {
        self.ledger.collections()
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        !self.unsynced
    }

    /// Grants `id` unless it is already held or unknown.
    pub async fn award(&mut self, id: &str) -> bool {
        if !self.ledger.award(id, self.clock.now()) {
            return false;
        }
        if let Some(reward) = catalog::find(id) {
            self.announce(reward);
        }
        self.persist().await;
        true
    }

    /// Grants every satisfied milestone and returns them in evaluation order.
    pub async fn check_and_award(
        &mut self,
        conditions: &RewardConditions,
    ) -> Vec<&'static RewardDefinition> {
        let granted = self.ledger.check_and_award(conditions, self.clock.now());
        if granted.is_empty() {
            return granted;
        }
        for reward in &granted {
            self.announce(reward);
        }
        self.persist().await;
        granted
    }

    /// Single random draw against [`reward_probability`]. A hit grants the
    /// surprise gift the first time; later hits only feature a random
    /// general reward.
    pub async fn maybe_reward(
        &mut self,
        context: &RewardContext,
        rng: &mut dyn RngCore,
    ) -> RewardDraw {
        let probability = reward_probability(context).clamp(0.0, 1.0);
        let offered = rng.random_bool(probability);
        tracing::debug!(
            key = %self.key,
            problem = context.problem_index,
            probability,
            offered,
            "reward checkpoint"
        );
        let granted = if offered && self.award(catalog::SURPRISE_GIFT).await {
            catalog::find(catalog::SURPRISE_GIFT)
        } else {
            None
        };
        let featured = match (offered, granted) {
            (_, Some(reward)) => Some(reward),
            (true, None) => select_random_reward(None, Some(RewardTheme::General), rng),
            (false, None) => None,
        };
        RewardDraw {
            probability,
            offered,
            granted,
            featured,
        }
    }

    /// Adds to the lifetime problem count used by the milestone rewards.
    pub async fn record_problems_completed(&mut self, count: u32) -> u32 {
        let total = self.ledger.record_problems_completed(count);
        self.persist().await;
        total
    }

    pub async fn mark_seen(&mut self, id: &str) -> bool {
        if !self.ledger.mark_seen(id) {
            return false;
        }
        self.persist().await;
        true
    }

    pub async fn reset_new_count(&mut self) {
        self.ledger.reset_new_count();
        self.persist().await;
    }

    /// Retry a save that failed earlier.
    ///
    /// # Errors
    ///
    /// Returns `RewardError::Storage` if the store is still unreachable.
    pub async fn flush(&mut self) -> Result<(), RewardError> {
        if !self.unsynced {
            return Ok(());
        }
        self.repo.save_ledger(&self.key, &self.ledger).await?;
        self.unsynced = false;
        Ok(())
    }

    fn announce(&self, reward: &'static RewardDefinition) {
        tracing::info!(key = %self.key, reward = reward.id, tier = %reward.tier, "reward granted");
        self.notifier.notify(EngineEvent::RewardGranted {
            key: self.key.clone(),
            reward,
        });
    }

    async fn persist(&mut self) {
        match self.repo.save_ledger(&self.key, &self.ledger).await {
            Ok(()) => self.unsynced = false,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "reward ledger not persisted");
                self.unsynced = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::fixed_clock;
    use practice_core::model::{DifficultyLevel, LearnerId, ModuleId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::InMemoryRepository;

    use crate::notifications::{NoopNotifier, NotificationHub};

    fn key() -> ModuleKey {
        ModuleKey::new(LearnerId::new(3), ModuleId::new("addition").unwrap())
    }

    async fn engine(repo: Arc<InMemoryRepository>) -> RewardEngine {
        RewardEngine::load(
            key(),
            RewardTheme::Addition,
            fixed_clock(),
            repo,
            Arc::new(NoopNotifier),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn award_is_idempotent_and_persisted() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut engine = engine(repo.clone()).await;

        assert!(engine.award(catalog::STREAK_5).await);
        assert!(!engine.award(catalog::STREAK_5).await);
        assert!(!engine.award("no-such-reward").await);

        let stored = repo.load_ledger(&key()).await.unwrap();
        assert_eq!(stored.earned().len(), 1);
        assert_eq!(stored.new_count(), 1);

        assert!(engine.mark_seen(catalog::STREAK_5).await);
        let stored = repo.load_ledger(&key()).await.unwrap();
        assert_eq!(stored.new_count(), 0);
    }

    #[tokio::test]
    async fn last_problem_checkpoint_always_offers() {
        let mut engine = engine(Arc::new(InMemoryRepository::new())).await;
        let mut rng = StdRng::seed_from_u64(1);
        let context = RewardContext {
            problem_index: 9,
            total_problems: 10,
            streak: 0,
            difficulty: DifficultyLevel::Beginner,
            previous_reward_shown: None,
        };

        let first = engine.maybe_reward(&context, &mut rng).await;
        assert!(first.offered);
        assert!((first.probability - 1.0).abs() < f64::EPSILON);
        assert_eq!(first.granted.map(|r| r.id), Some(catalog::SURPRISE_GIFT));

        assert_eq!(first.featured, first.granted);

        let second = engine.maybe_reward(&context, &mut rng).await;
        assert!(second.offered);
        assert!(second.granted.is_none());
        let featured = second.featured.expect("a featured reward");
        assert_eq!(featured.theme, RewardTheme::General);
        assert_eq!(engine.ledger().earned().len(), 1);
    }

    #[tokio::test]
    async fn milestones_are_announced() {
        let hub = Arc::new(NotificationHub::default());
        let mut events = hub.subscribe();
        let mut engine = RewardEngine::load(
            key(),
            RewardTheme::Addition,
            fixed_clock(),
            Arc::new(InMemoryRepository::new()),
            hub,
        )
        .await
        .unwrap();

        let total = engine.record_problems_completed(10).await;
        let granted = engine
            .check_and_award(&RewardConditions {
                problems_completed: total,
                session_complete: true,
                ..RewardConditions::new(RewardTheme::Addition)
            })
            .await;
        let ids: Vec<_> = granted.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![catalog::ADDITION_NOVICE, catalog::SESSION_COMPLETE]);

        for expected in ids {
            match events.recv().await.unwrap() {
                EngineEvent::RewardGranted { reward, .. } => assert_eq!(reward.id, expected),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        let addition = engine
            .collections()
            .into_iter()
            .find(|c| c.id == "addition-collection")
            .unwrap();
        assert_eq!(addition.progress, 25);
    }
}
