use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::ProblemId;
use crate::model::{DifficultyLevel, RewardTheme};

/// Highest decimal precision a problem may carry.
pub const MAX_DECIMALS: u8 = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProblemError {
    #[error("a problem needs at least two operands, got {0}")]
    TooFewOperands(usize),

    #[error("operand {index} is not a finite non-negative number")]
    InvalidOperand { index: usize },

    #[error("decimal precision {0} exceeds the supported maximum")]
    TooManyDecimals(u8),

    #[error("operation result would be negative")]
    NegativeResult,

    #[error("operand magnitude does not fit the answer representation")]
    Overflow,
}

//
// ─── OPERATION / LAYOUT ────────────────────────────────────────────────────────
//

/// Arithmetic operation a problem exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Addition,
    Subtraction,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Addition => "addition",
            OperationKind::Subtraction => "subtraction",
        }
    }

    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            OperationKind::Addition => '+',
            OperationKind::Subtraction => '-',
        }
    }

    /// Theme of the rewards earned while practicing this operation.
    #[must_use]
    pub fn reward_theme(self) -> RewardTheme {
        match self {
            OperationKind::Addition => RewardTheme::Addition,
            OperationKind::Subtraction => RewardTheme::Subtraction,
        }
    }

    /// Folds scaled (integer) operands with this operation.
    fn apply(self, scaled: &[i64]) -> Option<i64> {
        let (first, rest) = scaled.split_first()?;
        rest.iter().try_fold(*first, |acc, value| match self {
            OperationKind::Addition => acc.checked_add(*value),
            OperationKind::Subtraction => acc.checked_sub(*value),
        })
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the operands are arranged on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Horizontal,
    Vertical,
}

//
// ─── PROBLEM ───────────────────────────────────────────────────────────────────
//

/// One generated exercise.
///
/// `correct_answer` is computed on construction from the operands at the
/// problem's decimal precision, using integer arithmetic on scaled values, so
/// the canonical answer string and the digit-slot sizing always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    id: ProblemId,
    operation: OperationKind,
    operands: Vec<f64>,
    decimals: u8,
    correct_answer: f64,
    layout: Layout,
    answer_digit_count: usize,
    answer_decimal_offset: Option<u8>,
    difficulty: DifficultyLevel,
}

impl Problem {
    /// Builds a problem whose operands are rendered with `decimals` digits.
    ///
    /// # Errors
    ///
    /// Returns `ProblemError` when operands are missing, negative or not
    /// finite, when the precision is unsupported, or when the result would be
    /// negative.
    pub fn new(
        id: ProblemId,
        operation: OperationKind,
        operands: Vec<f64>,
        decimals: u8,
        layout: Layout,
        difficulty: DifficultyLevel,
    ) -> Result<Self, ProblemError> {
        if operands.len() < 2 {
            return Err(ProblemError::TooFewOperands(operands.len()));
        }
        if decimals > MAX_DECIMALS {
            return Err(ProblemError::TooManyDecimals(decimals));
        }

        let factor = 10_f64.powi(i32::from(decimals));
        let mut scaled = Vec::with_capacity(operands.len());
        for (index, operand) in operands.iter().enumerate() {
            if !operand.is_finite() || *operand < 0.0 {
                return Err(ProblemError::InvalidOperand { index });
            }
            scaled.push(to_scaled(*operand, factor)?);
        }

        let result = operation.apply(&scaled).ok_or(ProblemError::Overflow)?;
        if result < 0 {
            return Err(ProblemError::NegativeResult);
        }

        Ok(Self::from_scaled(
            id, operation, &scaled, decimals, layout, difficulty,
        ))
    }

    /// Builds a problem from operands already multiplied by `10^decimals`.
    ///
    /// Callers guarantee at least two operands, `decimals <= MAX_DECIMALS`
    /// and a non-negative result.
    pub(crate) fn from_scaled(
        id: ProblemId,
        operation: OperationKind,
        scaled: &[i64],
        decimals: u8,
        layout: Layout,
        difficulty: DifficultyLevel,
    ) -> Self {
        let factor = 10_f64.powi(i32::from(decimals));
        let result = operation.apply(scaled).unwrap_or(0).max(0);

        #[allow(clippy::cast_precision_loss)]
        let correct_answer = result as f64 / factor;
        let canonical = format_fixed(correct_answer, decimals);
        let answer_digit_count = canonical.chars().filter(char::is_ascii_digit).count();
        let answer_decimal_offset = (decimals > 0).then_some(decimals);

        // Operands are stored at the same precision as the answer.
        #[allow(clippy::cast_precision_loss)]
        let operands = scaled.iter().map(|v| *v as f64 / factor).collect();

        Self {
            id,
            operation,
            operands,
            decimals,
            correct_answer,
            layout,
            answer_digit_count,
            answer_decimal_offset,
            difficulty,
        }
    }

    /// Builds a problem inferring precision from the operands themselves
    /// (the maximum count of fractional digits among them).
    ///
    /// # Errors
    ///
    /// Same as [`Problem::new`].
    pub fn from_operands(
        operation: OperationKind,
        operands: Vec<f64>,
        layout: Layout,
        difficulty: DifficultyLevel,
    ) -> Result<Self, ProblemError> {
        let decimals = operands
            .iter()
            .map(|op| fractional_digits(*op))
            .max()
            .unwrap_or(0);
        Self::new(
            ProblemId::random(),
            operation,
            operands,
            decimals,
            layout,
            difficulty,
        )
    }

    #[must_use]
    pub fn id(&self) -> ProblemId {
        self.id
    }

    #[must_use]
    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    #[must_use]
    pub fn operands(&self) -> &[f64] {
        &self.operands
    }

    #[must_use]
    pub fn correct_answer(&self) -> f64 {
        self.correct_answer
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Total digit slots needed to enter the answer (the decimal point is not a slot).
    #[must_use]
    pub fn answer_digit_count(&self) -> usize {
        self.answer_digit_count
    }

    /// Digits right of the decimal point, `None` for integer answers.
    #[must_use]
    pub fn answer_decimal_offset(&self) -> Option<u8> {
        self.answer_decimal_offset
    }

    #[must_use]
    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    /// Precision used for operands and answer.
    #[must_use]
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// The correct answer formatted at the problem's precision.
    #[must_use]
    pub fn canonical_answer(&self) -> String {
        format_fixed(self.correct_answer, self.decimals)
    }

    /// Operand strings at the problem's precision, in display order.
    #[must_use]
    pub fn formatted_operands(&self) -> Vec<String> {
        self.operands
            .iter()
            .map(|op| format_fixed(*op, self.decimals))
            .collect()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = format!(" {} ", self.operation.symbol());
        write!(f, "{} = ?", self.formatted_operands().join(&separator))
    }
}

/// Formats `value` with exactly `decimals` fractional digits.
#[must_use]
pub fn format_fixed(value: f64, decimals: u8) -> String {
    format!("{value:.prec$}", prec = usize::from(decimals))
}

#[allow(clippy::cast_possible_truncation)]
fn to_scaled(value: f64, factor: f64) -> Result<i64, ProblemError> {
    let scaled = (value * factor).round();
    if scaled >= 9.0e15 {
        return Err(ProblemError::Overflow);
    }
    Ok(scaled as i64)
}

/// Fractional digits in the shortest round-trip representation of `value`.
fn fractional_digits(value: f64) -> u8 {
    let rendered = value.to_string();
    rendered
        .split_once('.')
        .map_or(0, |(_, frac)| u8::try_from(frac.len()).unwrap_or(u8::MAX))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_addition_sizes_answer() {
        let problem = Problem::from_operands(
            OperationKind::Addition,
            vec![7.0, 5.0],
            Layout::Horizontal,
            DifficultyLevel::Beginner,
        )
        .unwrap();

        assert_eq!(problem.correct_answer(), 12.0);
        assert_eq!(problem.canonical_answer(), "12");
        assert_eq!(problem.answer_digit_count(), 2);
        assert_eq!(problem.answer_decimal_offset(), None);
        assert_eq!(problem.to_string(), "7 + 5 = ?");
    }

    #[test]
    fn decimal_addition_is_exact() {
        let problem = Problem::from_operands(
            OperationKind::Addition,
            vec![0.1, 0.2],
            Layout::Vertical,
            DifficultyLevel::Intermediate,
        )
        .unwrap();

        assert_eq!(problem.canonical_answer(), "0.3");
        assert_eq!(problem.correct_answer(), 0.3);
        assert_eq!(problem.answer_digit_count(), 2);
        assert_eq!(problem.answer_decimal_offset(), Some(1));
    }

    #[test]
    fn mixed_precision_uses_max_decimals() {
        let problem = Problem::from_operands(
            OperationKind::Addition,
            vec![12.5, 3.25, 100.0],
            Layout::Vertical,
            DifficultyLevel::Advanced,
        )
        .unwrap();

        assert_eq!(problem.canonical_answer(), "115.75");
        assert_eq!(problem.answer_digit_count(), 5);
        assert_eq!(problem.answer_decimal_offset(), Some(2));
        assert_eq!(problem.formatted_operands(), vec!["12.50", "3.25", "100.00"]);
    }

    #[test]
    fn forced_precision_keeps_trailing_zero_slots() {
        let problem = Problem::new(
            ProblemId::random(),
            OperationKind::Addition,
            vec![10.5, 20.5],
            2,
            Layout::Vertical,
            DifficultyLevel::Expert,
        )
        .unwrap();

        assert_eq!(problem.canonical_answer(), "31.00");
        assert_eq!(problem.answer_digit_count(), 4);
        assert_eq!(problem.answer_decimal_offset(), Some(2));
    }

    #[test]
    fn subtraction_rejects_negative_results() {
        let err = Problem::from_operands(
            OperationKind::Subtraction,
            vec![3.0, 5.0],
            Layout::Horizontal,
            DifficultyLevel::Beginner,
        )
        .unwrap_err();
        assert_eq!(err, ProblemError::NegativeResult);
    }

    #[test]
    fn rejects_degenerate_operands() {
        let err = Problem::from_operands(
            OperationKind::Addition,
            vec![3.0],
            Layout::Horizontal,
            DifficultyLevel::Beginner,
        )
        .unwrap_err();
        assert_eq!(err, ProblemError::TooFewOperands(1));

        let err = Problem::from_operands(
            OperationKind::Addition,
            vec![3.0, f64::NAN],
            Layout::Horizontal,
            DifficultyLevel::Beginner,
        )
        .unwrap_err();
        assert_eq!(err, ProblemError::InvalidOperand { index: 1 });
    }
}
