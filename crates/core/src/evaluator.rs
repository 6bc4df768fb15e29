use crate::model::Problem;

/// Checks `submitted` against the problem's answer.
///
/// Both values are rounded at the problem's decimal offset (0 for integer
/// answers) before comparing. `NaN` is always wrong.
///
/// # Examples
///
/// ```
/// # use practice_core::evaluator::check;
/// # use practice_core::model::{DifficultyLevel, Layout, OperationKind, Problem};
/// let problem = Problem::from_operands(
///     OperationKind::Addition,
///     vec![7.0, 5.0],
///     Layout::Horizontal,
///     DifficultyLevel::Beginner,
/// )?;
/// assert!(check(&problem, 12.0));
/// assert!(!check(&problem, 21.0));
/// # Ok::<(), practice_core::model::ProblemError>(())
/// ```
#[must_use]
pub fn check(problem: &Problem, submitted: f64) -> bool {
    if submitted.is_nan() {
        return false;
    }
    let precision = problem.answer_decimal_offset().unwrap_or(0);
    let factor = 10_f64.powi(i32::from(precision));
    let expected = (problem.correct_answer() * factor).round();
    let actual = (submitted * factor).round();
    expected == actual
}

/// Assembles a numeric answer from per-digit input slots.
///
/// `slots` follows the problem's sizing: the first
/// `answer_digit_count - answer_decimal_offset` entries are the integer part,
/// the rest the fractional part. Empty integer slots read as `0`, missing
/// fractional digits are padded with `0`. An all-empty slot set, or a slot
/// holding something other than a single digit, yields `NaN`.
#[must_use]
pub fn compose_answer(problem: &Problem, slots: &[Option<u8>]) -> f64 {
    if slots.iter().all(Option::is_none) {
        return f64::NAN;
    }
    if slots.iter().flatten().any(|digit| *digit > 9) {
        return f64::NAN;
    }

    let offset = usize::from(problem.answer_decimal_offset().unwrap_or(0));
    let integer_slots = problem.answer_digit_count().saturating_sub(offset);
    let split = integer_slots.min(slots.len());
    let (integer, fraction) = slots.split_at(split);

    let mut text: String = integer.iter().flatten().map(|d| char::from(b'0' + d)).collect();
    if text.is_empty() {
        text.push('0');
    }
    if offset > 0 {
        let digits: String = fraction.iter().flatten().map(|d| char::from(b'0' + d)).collect();
        text.push('.');
        text.push_str(&format!("{digits:0<offset$}"));
    }

    text.parse().unwrap_or(f64::NAN)
}
