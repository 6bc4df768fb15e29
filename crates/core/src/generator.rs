//! Problem generation.
//!
//! Each difficulty maps to a fixed policy: operand count, magnitude ranges,
//! decimal precision and layout. Operands are drawn directly as integers
//! scaled by `10^decimals`, so the rendered operands and the computed answer
//! share one precision with no floating-point drift.
//!
//! | level        | operands | range                         | decimals                | layout          |
//! |--------------|----------|-------------------------------|-------------------------|-----------------|
//! | beginner     | 2        | 1..=9                         | 0                       | horizontal      |
//! | elementary   | 2        | 10..=30 + 1..=9, or 10..=20 ×2 | 0                      | horizontal      |
//! | intermediate | 2        | 10..=99                       | 1 (40% when vertical)   | 75% vertical    |
//! | advanced     | 3        | 10..=(200..=999)              | 1 or 2 (60% two)        | vertical        |
//! | expert       | 4 or 5   | 100..=(2000..=9999)           | 1 or 2 (75% two)        | vertical        |

use rand::{Rng, RngCore};

use crate::model::{DifficultyLevel, Layout, OperationKind, Problem, ProblemId};

/// Produces problems for one operation.
pub trait ProblemGenerator: Send + Sync {
    fn operation(&self) -> OperationKind;

    /// Draws a new problem at `difficulty`. Never fails: the policy table only
    /// yields well-formed operands.
    fn generate(&self, difficulty: DifficultyLevel, rng: &mut dyn RngCore) -> Problem;
}

/// Operand shape drawn from the policy table for one problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub layout: Layout,
    pub decimals: u8,
    /// Inclusive unscaled bounds, one pair per operand.
    pub ranges: Vec<(u32, u32)>,
}

/// Draws the operand shape for `difficulty`.
pub fn draw_shape(difficulty: DifficultyLevel, rng: &mut dyn RngCore) -> Shape {
    match difficulty {
        DifficultyLevel::Beginner => Shape {
            layout: Layout::Horizontal,
            decimals: 0,
            ranges: vec![(1, 9), (1, 9)],
        },
        DifficultyLevel::Elementary => {
            let ranges = if rng.random_bool(0.5) {
                vec![(10, 20), (10, 20)]
            } else {
                vec![(10, 30), (1, 9)]
            };
            Shape {
                layout: Layout::Horizontal,
                decimals: 0,
                ranges,
            }
        }
        DifficultyLevel::Intermediate => {
            let layout = if rng.random_bool(0.75) {
                Layout::Vertical
            } else {
                Layout::Horizontal
            };
            let decimals = u8::from(layout == Layout::Vertical && rng.random_bool(0.4));
            Shape {
                layout,
                decimals,
                ranges: vec![(10, 99), (10, 99)],
            }
        }
        DifficultyLevel::Advanced => {
            let decimals = if rng.random_bool(0.6) { 2 } else { 1 };
            let ranges = (0..3).map(|_| (10, rng.random_range(200..=999))).collect();
            Shape {
                layout: Layout::Vertical,
                decimals,
                ranges,
            }
        }
        DifficultyLevel::Expert => {
            let lines = if rng.random_bool(0.5) { 4 } else { 5 };
            let decimals = if rng.random_bool(0.75) { 2 } else { 1 };
            let ranges = (0..lines)
                .map(|_| (100, rng.random_range(2000..=9999)))
                .collect();
            Shape {
                layout: Layout::Vertical,
                decimals,
                ranges,
            }
        }
    }
}

fn draw_scaled(range: (u32, u32), decimals: u8, rng: &mut dyn RngCore) -> i64 {
    let factor = 10_i64.pow(u32::from(decimals));
    let (low, high) = range;
    rng.random_range(i64::from(low) * factor..=i64::from(high) * factor)
}

fn draw_id(rng: &mut dyn RngCore) -> ProblemId {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    ProblemId::from_random_bytes(bytes)
}

/// Generator for the two supported operations.
///
/// Subtraction reuses the addition policy: the subtrahends are drawn from the
/// trailing ranges, a difference from the first one, and the minuend is
/// their sum, so results are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArithmeticGenerator {
    operation: OperationKind,
}

impl ArithmeticGenerator {
    #[must_use]
    pub fn new(operation: OperationKind) -> Self {
        Self { operation }
    }

    #[must_use]
    pub fn addition() -> Self {
        Self::new(OperationKind::Addition)
    }

    #[must_use]
    pub fn subtraction() -> Self {
        Self::new(OperationKind::Subtraction)
    }
}

impl ProblemGenerator for ArithmeticGenerator {
    fn operation(&self) -> OperationKind {
        self.operation
    }

    fn generate(&self, difficulty: DifficultyLevel, rng: &mut dyn RngCore) -> Problem {
        let id = draw_id(rng);
        let shape = draw_shape(difficulty, rng);
        let mut scaled: Vec<i64> = shape
            .ranges
            .iter()
            .map(|range| draw_scaled(*range, shape.decimals, rng))
            .collect();

        if self.operation == OperationKind::Subtraction {
            let difference = scaled[0];
            let subtrahends: i64 = scaled[1..].iter().sum();
            scaled[0] = subtrahends + difference;
        }

        tracing::debug!(
            %difficulty,
            operation = %self.operation,
            operands = scaled.len(),
            decimals = shape.decimals,
            "generated problem"
        );

        Problem::from_scaled(
            id,
            self.operation,
            &scaled,
            shape.decimals,
            shape.layout,
            difficulty,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::check;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn every_level_round_trips_through_check() {
        let mut rng = StdRng::seed_from_u64(7);
        for generator in [ArithmeticGenerator::addition(), ArithmeticGenerator::subtraction()] {
            for level in DifficultyLevel::ALL {
                for _ in 0..200 {
                    let problem = generator.generate(level, &mut rng);
                    assert!(check(&problem, problem.correct_answer()), "{problem}");
                    assert!(problem.correct_answer() >= 0.0);
                    assert_eq!(problem.difficulty(), level);
                }
            }
        }
    }

    #[test]
    fn beginner_is_two_single_digits_horizontal() {
        let mut rng = StdRng::seed_from_u64(1);
        let generator = ArithmeticGenerator::addition();
        for _ in 0..100 {
            let problem = generator.generate(DifficultyLevel::Beginner, &mut rng);
            assert_eq!(problem.layout(), Layout::Horizontal);
            assert_eq!(problem.operands().len(), 2);
            assert!(problem.operands().iter().all(|op| (1.0..=9.0).contains(op)));
            assert_eq!(problem.answer_decimal_offset(), None);
        }
    }

    #[test]
    fn expert_is_vertical_with_decimals() {
        let mut rng = StdRng::seed_from_u64(3);
        let generator = ArithmeticGenerator::addition();
        for _ in 0..100 {
            let problem = generator.generate(DifficultyLevel::Expert, &mut rng);
            assert_eq!(problem.layout(), Layout::Vertical);
            assert!((4..=5).contains(&problem.operands().len()));
            let offset = problem.answer_decimal_offset().unwrap();
            assert!((1..=2).contains(&offset));
        }
    }

    #[test]
    fn sizing_matches_canonical_answer() {
        let mut rng = StdRng::seed_from_u64(11);
        let generator = ArithmeticGenerator::addition();
        for level in DifficultyLevel::ALL {
            for _ in 0..50 {
                let problem = generator.generate(level, &mut rng);
                let canonical = problem.canonical_answer();
                let (int_part, frac_part) =
                    canonical.split_once('.').unwrap_or((canonical.as_str(), ""));
                assert_eq!(problem.answer_digit_count(), int_part.len() + frac_part.len());
                assert_eq!(
                    problem.answer_decimal_offset().map(usize::from),
                    (!frac_part.is_empty()).then_some(frac_part.len())
                );
            }
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let generator = ArithmeticGenerator::addition();
        let a = generator.generate(DifficultyLevel::Advanced, &mut StdRng::seed_from_u64(42));
        let b = generator.generate(DifficultyLevel::Advanced, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn subtraction_minuend_covers_subtrahends() {
        let mut rng = StdRng::seed_from_u64(5);
        let generator = ArithmeticGenerator::subtraction();
        for _ in 0..100 {
            let problem = generator.generate(DifficultyLevel::Expert, &mut rng);
            let (first, rest) = problem.operands().split_first().unwrap();
            assert!(*first >= rest.iter().sum::<f64>() - 1e-9);
        }
    }
}
