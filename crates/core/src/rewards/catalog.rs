use rand::RngCore;
use rand::seq::IndexedRandom;

use crate::model::{
    CollectionDefinition, DifficultyLevel, RewardCategory, RewardDefinition, RewardTheme,
    RewardTier,
};

pub const ADDITION_NOVICE: &str = "addition-novice";
pub const ADDITION_ENTHUSIAST: &str = "addition-enthusiast";
pub const ADDITION_EXPERT: &str = "addition-expert";
pub const ADDITION_MASTER: &str = "addition-master";
pub const SUBTRACTION_NOVICE: &str = "subtraction-novice";
pub const SUBTRACTION_ENTHUSIAST: &str = "subtraction-enthusiast";
pub const SUBTRACTION_EXPERT: &str = "subtraction-expert";
pub const SUBTRACTION_MASTER: &str = "subtraction-master";
pub const STREAK_5: &str = "streak-5";
pub const STREAK_10: &str = "streak-10";
pub const STREAK_20: &str = "streak-20";
pub const LEVEL_ELEMENTARY: &str = "level-elementary";
pub const LEVEL_INTERMEDIATE: &str = "level-intermediate";
pub const LEVEL_ADVANCED: &str = "level-advanced";
pub const LEVEL_EXPERT: &str = "level-expert";
pub const IMPROVEMENT_STAR: &str = "improvement-star";
pub const PERSEVERANCE: &str = "perseverance";
pub const SURPRISE_GIFT: &str = "surprise-gift";
pub const SESSION_COMPLETE: &str = "session-complete";
pub const PERFECT_SESSION: &str = "perfect-session";

const fn reward(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    tier: RewardTier,
    category: RewardCategory,
    theme: RewardTheme,
    icon: &'static str,
) -> RewardDefinition {
    RewardDefinition {
        id,
        name,
        description,
        tier,
        category,
        theme,
        icon,
    }
}

use RewardCategory as C;
use RewardTheme as Th;
use RewardTier as T;

/// Every reward that can be granted.
pub static CATALOG: &[RewardDefinition] = &[
    reward(ADDITION_NOVICE, "Addition Apprentice", "Completed your first 10 addition problems", T::Common, C::Milestone, Th::Addition, "calculator"),
    reward(ADDITION_ENTHUSIAST, "Addition Enthusiast", "Completed 25 addition problems", T::Common, C::Milestone, Th::Addition, "plus"),
    reward(ADDITION_EXPERT, "Addition Expert", "Completed 50 addition problems", T::Rare, C::Milestone, Th::Addition, "award"),
    reward(ADDITION_MASTER, "Addition Master", "Completed 100 addition problems", T::Epic, C::Milestone, Th::Addition, "trophy"),
    reward(SUBTRACTION_NOVICE, "Subtraction Apprentice", "Completed your first 10 subtraction problems", T::Common, C::Milestone, Th::Subtraction, "calculator"),
    reward(SUBTRACTION_ENTHUSIAST, "Subtraction Enthusiast", "Completed 25 subtraction problems", T::Common, C::Milestone, Th::Subtraction, "minus"),
    reward(SUBTRACTION_EXPERT, "Subtraction Expert", "Completed 50 subtraction problems", T::Rare, C::Milestone, Th::Subtraction, "award"),
    reward(SUBTRACTION_MASTER, "Subtraction Master", "Completed 100 subtraction problems", T::Epic, C::Milestone, Th::Subtraction, "trophy"),
    reward(STREAK_5, "Streak of 5", "5 correct answers in a row", T::Common, C::Streak, Th::General, "flame"),
    reward(STREAK_10, "Streak of 10", "10 correct answers in a row", T::Rare, C::Streak, Th::General, "flame"),
    reward(STREAK_20, "Unstoppable", "20 correct answers in a row", T::Epic, C::Streak, Th::General, "zap"),
    reward(LEVEL_ELEMENTARY, "Elementary Level", "Unlocked the elementary level", T::Rare, C::LevelUp, Th::General, "arrow-up"),
    reward(LEVEL_INTERMEDIATE, "Intermediate Level", "Unlocked the intermediate level", T::Epic, C::LevelUp, Th::General, "arrow-up-circle"),
    reward(LEVEL_ADVANCED, "Advanced Level", "Unlocked the advanced level", T::Epic, C::LevelUp, Th::General, "award"),
    reward(LEVEL_EXPERT, "Expert Level", "Unlocked the expert level", T::Legendary, C::LevelUp, Th::General, "crown"),
    reward(IMPROVEMENT_STAR, "Improvement Star", "Improved your results considerably", T::Rare, C::Achievement, Th::General, "star"),
    reward(PERSEVERANCE, "Perseverance", "Kept trying until you got it", T::Rare, C::Achievement, Th::General, "heart"),
    reward(SURPRISE_GIFT, "Surprise Gift", "An unexpected reward!", T::Rare, C::Achievement, Th::General, "gift"),
    reward(SESSION_COMPLETE, "Session Complete", "Finished a whole exercise session", T::Common, C::Milestone, Th::General, "check-circle"),
    reward(PERFECT_SESSION, "Perfect Session", "Finished a session without mistakes", T::Epic, C::Achievement, Th::General, "award"),
];

/// Reward groups whose completion is tracked.
pub static COLLECTIONS: &[CollectionDefinition] = &[
    CollectionDefinition {
        id: "addition-collection",
        name: "Addition Collection",
        description: "Collect every addition reward",
        theme: Th::Addition,
        members: &[ADDITION_NOVICE, ADDITION_ENTHUSIAST, ADDITION_EXPERT, ADDITION_MASTER],
    },
    CollectionDefinition {
        id: "subtraction-collection",
        name: "Subtraction Collection",
        description: "Collect every subtraction reward",
        theme: Th::Subtraction,
        members: &[SUBTRACTION_NOVICE, SUBTRACTION_ENTHUSIAST, SUBTRACTION_EXPERT, SUBTRACTION_MASTER],
    },
    CollectionDefinition {
        id: "streak-collection",
        name: "Streak Collection",
        description: "Reach every streak",
        theme: Th::General,
        members: &[STREAK_5, STREAK_10, STREAK_20],
    },
    CollectionDefinition {
        id: "levels-collection",
        name: "Levels Collection",
        description: "Master every difficulty level",
        theme: Th::General,
        members: &[LEVEL_ELEMENTARY, LEVEL_INTERMEDIATE, LEVEL_ADVANCED, LEVEL_EXPERT],
    },
];

#[must_use]
pub fn find(id: &str) -> Option<&'static RewardDefinition> {
    CATALOG.iter().find(|reward| reward.id == id)
}

/// Reward granted on reaching `level`, `None` for the starting level.
#[must_use]
pub fn level_reward(level: DifficultyLevel) -> Option<&'static str> {
    match level {
        DifficultyLevel::Beginner => None,
        DifficultyLevel::Elementary => Some(LEVEL_ELEMENTARY),
        DifficultyLevel::Intermediate => Some(LEVEL_INTERMEDIATE),
        DifficultyLevel::Advanced => Some(LEVEL_ADVANCED),
        DifficultyLevel::Expert => Some(LEVEL_EXPERT),
    }
}

/// Uniform draw over the catalog entries matching the optional filters.
pub fn select_random_reward(
    tier: Option<RewardTier>,
    theme: Option<RewardTheme>,
    rng: &mut dyn RngCore,
) -> Option<&'static RewardDefinition> {
    let eligible: Vec<&'static RewardDefinition> = CATALOG
        .iter()
        .filter(|reward| tier.is_none_or(|tier| reward.tier == tier))
        .filter(|reward| theme.is_none_or(|theme| reward.theme == theme))
        .collect();
    eligible.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_collections_resolve() {
        let ids: HashSet<_> = CATALOG.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), CATALOG.len());
        for collection in COLLECTIONS {
            for member in collection.members {
                assert!(find(member).is_some(), "{member} missing from catalog");
            }
        }
    }

    #[test]
    fn random_selection_respects_filters() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let reward = select_random_reward(Some(RewardTier::Epic), None, &mut rng).unwrap();
            assert_eq!(reward.tier, RewardTier::Epic);
        }
        let legendary_addition =
            select_random_reward(Some(RewardTier::Legendary), Some(RewardTheme::Addition), &mut rng);
        assert!(legendary_addition.is_none());
    }

    #[test]
    fn level_rewards_skip_beginner() {
        assert_eq!(level_reward(DifficultyLevel::Beginner), None);
        assert_eq!(level_reward(DifficultyLevel::Expert), Some(LEVEL_EXPERT));
    }
}
