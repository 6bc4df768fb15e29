//! Reward catalog, per-learner ledger and the checkpoint probability rules.

pub mod catalog;
mod ledger;
mod probability;

pub use catalog::{select_random_reward, CATALOG, COLLECTIONS};
pub use ledger::{RewardConditions, RewardLedger, PROBLEM_MILESTONES, STREAK_MILESTONES};
pub use probability::{difficulty_bonus, reward_probability, RewardContext};
