use serde::{Deserialize, Serialize};

use crate::model::DifficultyLevel;

/// Consecutive correct answers needed to move up a level.
pub const CORRECT_ANSWERS_FOR_LEVEL_UP: u32 = 10;
/// Consecutive incorrect answers that move a learner down a level.
pub const INCORRECT_ANSWERS_FOR_LEVEL_DOWN: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// A level transition produced by a streak update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub previous: DifficultyLevel,
    pub new: DifficultyLevel,
    pub direction: Direction,
}

/// Adaptive difficulty state for one learner+module pair.
///
/// Mutated only through the transition methods; the level never leaves the
/// `Beginner..=Expert` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelState {
    current_level: DifficultyLevel,
    correct_streak: u32,
    incorrect_streak: u32,
    adaptive_enabled: bool,
}

impl LevelState {
    #[must_use]
    pub fn new(level: DifficultyLevel, adaptive_enabled: bool) -> Self {
        Self {
            current_level: level,
            correct_streak: 0,
            incorrect_streak: 0,
            adaptive_enabled,
        }
    }

    /// Rehydrate persisted state.
    #[must_use]
    pub fn from_persisted(
        current_level: DifficultyLevel,
        correct_streak: u32,
        incorrect_streak: u32,
        adaptive_enabled: bool,
    ) -> Self {
        Self {
            current_level,
            correct_streak,
            incorrect_streak,
            adaptive_enabled,
        }
    }

    #[must_use]
    pub fn current_level(&self) -> DifficultyLevel {
        self.current_level
    }

    #[must_use]
    pub fn correct_streak(&self) -> u32 {
        self.correct_streak
    }

    #[must_use]
    pub fn incorrect_streak(&self) -> u32 {
        self.incorrect_streak
    }

    #[must_use]
    pub fn adaptive_enabled(&self) -> bool {
        self.adaptive_enabled
    }

    /// Records a correct answer. Returns the level-up it triggered, if any.
    ///
    /// At `Expert` the streak keeps growing and no transition happens.
    pub fn register_correct(&mut self) -> Option<LevelChange> {
        self.incorrect_streak = 0;
        self.correct_streak = self.correct_streak.saturating_add(1);

        if !self.adaptive_enabled || self.correct_streak < CORRECT_ANSWERS_FOR_LEVEL_UP {
            return None;
        }
        let next = self.current_level.next()?;
        let change = LevelChange {
            previous: self.current_level,
            new: next,
            direction: Direction::Up,
        };
        self.current_level = next;
        self.correct_streak = 0;
        self.adaptive_enabled = true;
        Some(change)
    }

    /// Records an incorrect answer. Returns the level-down it triggered, if any.
    pub fn register_incorrect(&mut self) -> Option<LevelChange> {
        self.correct_streak = 0;
        self.incorrect_streak = self.incorrect_streak.saturating_add(1);

        if !self.adaptive_enabled || self.incorrect_streak < INCORRECT_ANSWERS_FOR_LEVEL_DOWN {
            return None;
        }
        let previous = self.current_level.previous()?;
        let change = LevelChange {
            previous: self.current_level,
            new: previous,
            direction: Direction::Down,
        };
        self.current_level = previous;
        self.incorrect_streak = 0;
        Some(change)
    }

    /// Sets the level directly. Streaks are left untouched.
    pub fn set_level(&mut self, level: DifficultyLevel) {
        self.current_level = level;
    }

    pub fn set_adaptive(&mut self, enabled: bool) {
        self.adaptive_enabled = enabled;
    }

    pub fn reset_streaks(&mut self) {
        self.correct_streak = 0;
        self.incorrect_streak = 0;
    }
}

impl Default for LevelState {
    fn default() -> Self {
        Self::new(DifficultyLevel::Beginner, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_correct_answers_level_up_once() {
        let mut state = LevelState::new(DifficultyLevel::Beginner, true);
        let changes: Vec<_> = (0..10).filter_map(|_| state.register_correct()).collect();

        assert_eq!(
            changes,
            vec![LevelChange {
                previous: DifficultyLevel::Beginner,
                new: DifficultyLevel::Elementary,
                direction: Direction::Up,
            }]
        );
        assert_eq!(state.current_level(), DifficultyLevel::Elementary);
        assert_eq!(state.correct_streak(), 0);
    }

    #[test]
    fn five_incorrect_answers_level_down_once() {
        let mut state = LevelState::new(DifficultyLevel::Advanced, true);
        let changes: Vec<_> = (0..5).filter_map(|_| state.register_incorrect()).collect();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].direction, Direction::Down);
        assert_eq!(state.current_level(), DifficultyLevel::Intermediate);
        assert_eq!(state.incorrect_streak(), 0);
    }

    #[test]
    fn opposite_answer_resets_streak() {
        let mut state = LevelState::new(DifficultyLevel::Beginner, true);
        for _ in 0..9 {
            state.register_correct();
        }
        state.register_incorrect();
        assert_eq!(state.correct_streak(), 0);
        assert_eq!(state.incorrect_streak(), 1);
        assert_eq!(state.register_correct(), None);
        assert_eq!(state.incorrect_streak(), 0);
    }

    #[test]
    fn clamps_at_bounds() {
        let mut top = LevelState::new(DifficultyLevel::Expert, true);
        for _ in 0..25 {
            assert_eq!(top.register_correct(), None);
        }
        assert_eq!(top.current_level(), DifficultyLevel::Expert);
        assert_eq!(top.correct_streak(), 25);

        let mut bottom = LevelState::new(DifficultyLevel::Beginner, true);
        for _ in 0..12 {
            assert_eq!(bottom.register_incorrect(), None);
        }
        assert_eq!(bottom.current_level(), DifficultyLevel::Beginner);
    }

    #[test]
    fn non_adaptive_state_only_counts() {
        let mut state = LevelState::new(DifficultyLevel::Intermediate, false);
        for _ in 0..15 {
            assert_eq!(state.register_correct(), None);
        }
        for _ in 0..6 {
            assert_eq!(state.register_incorrect(), None);
        }
        assert_eq!(state.current_level(), DifficultyLevel::Intermediate);
        assert_eq!(state.incorrect_streak(), 6);
    }

    #[test]
    fn setters_keep_streaks() {
        let mut state = LevelState::default();
        state.register_correct();
        state.register_correct();
        state.set_level(DifficultyLevel::Expert);
        state.set_adaptive(false);
        assert_eq!(state.correct_streak(), 2);
        assert!(!state.adaptive_enabled());

        state.reset_streaks();
        assert_eq!(state.correct_streak(), 0);
    }
}
