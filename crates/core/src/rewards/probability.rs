use crate::model::DifficultyLevel;

/// Session context at a reward checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardContext {
    /// Zero-based index of the problem just answered.
    pub problem_index: u32,
    pub total_problems: u32,
    pub streak: u32,
    pub difficulty: DifficultyLevel,
    /// Index of the problem where a reward was last shown.
    pub previous_reward_shown: Option<u32>,
}

impl RewardContext {
    #[must_use]
    pub fn is_last_problem(&self) -> bool {
        self.problem_index + 1 == self.total_problems
    }

    /// The problem at `total / 2`, for sessions long enough to have a middle.
    #[must_use]
    pub fn is_mid_point(&self) -> bool {
        self.total_problems > 2 && self.problem_index == self.total_problems / 2
    }

    fn distance_from_last_reward(&self) -> i64 {
        let previous = self.previous_reward_shown.map_or(-1, i64::from);
        i64::from(self.problem_index) - previous
    }

    fn problems_since_last_reward(&self) -> i64 {
        match self.previous_reward_shown {
            None => i64::from(self.problem_index) + 1,
            Some(previous) => i64::from(self.problem_index) - i64::from(previous),
        }
    }
}

/// Bonus added to the base surprise chance, growing with difficulty.
#[must_use]
pub fn difficulty_bonus(difficulty: DifficultyLevel) -> f64 {
    match difficulty {
        DifficultyLevel::Beginner => 0.0,
        DifficultyLevel::Elementary => 0.02,
        DifficultyLevel::Intermediate => 0.04,
        DifficultyLevel::Advanced => 0.06,
        DifficultyLevel::Expert => 0.08,
    }
}

/// Chance of offering a reward at this checkpoint. First matching rule wins:
///
/// 1. last problem, no reward in the last 2 problems: `1.0`
/// 2. streak of 7+: `0.8`, streak of 5+: `0.6`
/// 3. mid-point, no reward in the last 3 problems: `0.4`
/// 4. 5+ problems since the last reward: `0.3`
/// 5. otherwise `0.05` plus the difficulty bonus
#[must_use]
pub fn reward_probability(context: &RewardContext) -> f64 {
    if context.is_last_problem() && context.distance_from_last_reward() > 2 {
        return 1.0;
    }
    if context.streak >= 7 {
        return 0.8;
    }
    if context.streak >= 5 {
        return 0.6;
    }
    if context.is_mid_point() && context.distance_from_last_reward() > 3 {
        return 0.4;
    }
    if context.problems_since_last_reward() >= 5 {
        return 0.3;
    }
    0.05 + difficulty_bonus(context.difficulty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(problem_index: u32, streak: u32, previous: Option<u32>) -> RewardContext {
        RewardContext {
            problem_index,
            total_problems: 12,
            streak,
            difficulty: DifficultyLevel::Beginner,
            previous_reward_shown: previous,
        }
    }

    #[test]
    fn last_problem_without_recent_reward_is_certain() {
        assert_eq!(reward_probability(&context(11, 0, None)), 1.0);
        assert_eq!(reward_probability(&context(11, 0, Some(8))), 1.0);
        // Reward shown two problems ago: falls through to later rules.
        assert_eq!(reward_probability(&context(11, 0, Some(9))), 0.05);
    }

    #[test]
    fn streaks_raise_probability() {
        assert_eq!(reward_probability(&context(2, 7, Some(1))), 0.8);
        assert_eq!(reward_probability(&context(2, 5, Some(1))), 0.6);
    }

    #[test]
    fn mid_point_and_drought_rules() {
        assert_eq!(reward_probability(&context(6, 0, Some(2))), 0.4);
        assert_eq!(reward_probability(&context(6, 0, Some(3))), 0.05);
        assert_eq!(reward_probability(&context(4, 0, None)), 0.3);
        assert_eq!(reward_probability(&context(3, 0, None)), 0.05);
    }

    #[test]
    fn base_rate_grows_with_difficulty() {
        let mut ctx = context(1, 0, Some(0));
        ctx.difficulty = DifficultyLevel::Expert;
        assert!((reward_probability(&ctx) - 0.13).abs() < 1e-12);
    }

    #[test]
    fn always_within_bounds() {
        for level in DifficultyLevel::ALL {
            for total in 1..15 {
                for index in 0..total {
                    for streak in 0..12 {
                        for previous in std::iter::once(None).chain((0..index).map(Some)) {
                            let p = reward_probability(&RewardContext {
                                problem_index: index,
                                total_problems: total,
                                streak,
                                difficulty: level,
                                previous_reward_shown: previous,
                            });
                            assert!((0.0..=1.0).contains(&p));
                        }
                    }
                }
            }
        }
    }
}
