use practice_core::model::{AttemptRecord, AttemptStatus};

/// Decides how many extra problems to append when a session is about to
/// complete.
pub trait CompensationPolicy: Send + Sync {
    /// `history` covers every slot so far; `already_added` counts the extra
    /// problems granted earlier in the same session.
    fn extra_problems(&self, history: &[Option<AttemptRecord>], already_added: u32) -> u32;
}

/// Never extends a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompensation;

impl CompensationPolicy for NoCompensation {
    fn extra_problems(&self, _history: &[Option<AttemptRecord>], _already_added: u32) -> u32 {
        0
    }
}

/// One extra problem per revealed slot, up to `max_extra` per session.
/// Timeouts that exhaust the attempts are recorded as revealed too.
#[derive(Debug, Clone, Copy)]
pub struct OnePerMiss {
    pub max_extra: u32,
}

impl Default for OnePerMiss {
    fn default() -> Self {
        Self { max_extra: 5 }
    }
}

impl CompensationPolicy for OnePerMiss {
    fn extra_problems(&self, history: &[Option<AttemptRecord>], already_added: u32) -> u32 {
        let misses = history
            .iter()
            .flatten()
            .filter(|record| record.status == AttemptStatus::Revealed)
            .count();
        let misses = u32::try_from(misses).unwrap_or(u32::MAX);
        misses
            .min(self.max_extra)
            .saturating_sub(already_added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::model::ProblemId;

    fn record(status: AttemptStatus) -> Option<AttemptRecord> {
        let mut record = AttemptRecord::new(ProblemId::random());
        record.status = status;
        record.attempts_used = 1;
        Some(record)
    }

    #[test]
    fn one_per_miss_is_capped_and_counts_previous_grants() {
        let history = vec![
            record(AttemptStatus::Revealed),
            record(AttemptStatus::Correct),
            record(AttemptStatus::Revealed),
            record(AttemptStatus::Revealed),
        ];
        let policy = OnePerMiss { max_extra: 2 };
        assert_eq!(policy.extra_problems(&history, 0), 2);
        assert_eq!(policy.extra_problems(&history, 2), 0);

        let generous = OnePerMiss { max_extra: 10 };
        assert_eq!(generous.extra_problems(&history, 1), 2);
        assert_eq!(NoCompensation.extra_problems(&history, 0), 0);
    }

    #[test]
    fn only_revealed_slots_earn_extra_problems() {
        let history = vec![
            record(AttemptStatus::TimedOut),
            record(AttemptStatus::Incorrect),
            None,
            record(AttemptStatus::Revealed),
        ];
        assert_eq!(OnePerMiss::default().extra_problems(&history, 0), 1);
    }
}
