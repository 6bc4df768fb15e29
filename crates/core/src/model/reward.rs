use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rarity of a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardTier {
    Common,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewardCategory {
    Achievement,
    Milestone,
    Streak,
    LevelUp,
    Collection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardTheme {
    Addition,
    Subtraction,
    General,
}

impl fmt::Display for RewardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RewardTier::Common => "common",
            RewardTier::Rare => "rare",
            RewardTier::Epic => "epic",
            RewardTier::Legendary => "legendary",
        };
        f.write_str(name)
    }
}

/// Static catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub tier: RewardTier,
    pub category: RewardCategory,
    pub theme: RewardTheme,
    /// Icon token resolved by the presentation layer.
    pub icon: &'static str,
}

/// Static group of reward ids tracked as a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub theme: RewardTheme,
    pub members: &'static [&'static str],
}

/// A reward the learner holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedReward {
    pub id: String,
    pub earned_at: DateTime<Utc>,
    pub seen: bool,
}

/// Derived completion state of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionProgress {
    pub id: String,
    pub earned: Vec<String>,
    /// Rounded percentage of members earned, 0..=100.
    pub progress: u8,
    pub is_complete: bool,
}
