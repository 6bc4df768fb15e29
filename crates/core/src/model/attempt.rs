use serde::{Deserialize, Serialize};

use crate::model::ids::ProblemId;

/// Outcome recorded for a problem slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttemptStatus {
    Correct,
    /// Wrong, with attempts remaining.
    Incorrect,
    /// Answer shown, either on request or because attempts ran out.
    Revealed,
    /// The countdown expired with nothing entered.
    TimedOut,
}

impl AttemptStatus {
    /// Whether the problem slot can no longer be answered.
    #[must_use]
    pub fn is_final(self) -> bool {
        !matches!(self, AttemptStatus::Incorrect | AttemptStatus::TimedOut)
    }

    /// Whether the learner missed the problem.
    #[must_use]
    pub fn is_miss(self) -> bool {
        !matches!(self, AttemptStatus::Correct)
    }
}

/// Evaluation record for one problem of a session.
///
/// Created on the first evaluation and overwritten in place while the
/// problem stays active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub problem_id: ProblemId,
    /// Last submitted value, `NaN` when nothing usable was entered.
    pub submitted_answer: f64,
    pub status: AttemptStatus,
    pub attempts_used: u32,
}

impl AttemptRecord {
    #[must_use]
    pub fn new(problem_id: ProblemId) -> Self {
        Self {
            problem_id,
            submitted_answer: f64::NAN,
            status: AttemptStatus::Incorrect,
            attempts_used: 0,
        }
    }

    /// Failed evaluations before the current status was reached.
    #[must_use]
    pub fn failed_attempts(&self) -> u32 {
        match self.status {
            AttemptStatus::Correct => self.attempts_used.saturating_sub(1),
            _ => self.attempts_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_attempts_excludes_the_solving_one() {
        let mut record = AttemptRecord::new(ProblemId::random());
        record.attempts_used = 3;
        record.status = AttemptStatus::Correct;
        assert_eq!(record.failed_attempts(), 2);

        record.status = AttemptStatus::Revealed;
        assert_eq!(record.failed_attempts(), 3);
    }

    #[test]
    fn timed_out_is_not_final() {
        assert!(!AttemptStatus::TimedOut.is_final());
        assert!(AttemptStatus::Revealed.is_final());
        assert!(AttemptStatus::Correct.is_final());
    }
}
