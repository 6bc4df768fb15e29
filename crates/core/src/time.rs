use chrono::{DateTime, Duration, Utc};

/// Wall-clock source used to stamp summaries and earned rewards.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Moves a fixed clock forward. No effect on the system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

//
// ─── TICK-DRIVEN TIMERS ────────────────────────────────────────────────────────
//

/// Per-problem countdown advanced by whole-second ticks.
///
/// A stopped countdown ignores ticks, so a tick that arrives after the owner
/// has moved on can never fire a stale expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    limit_secs: u32,
    remaining_secs: u32,
    running: bool,
}

impl Countdown {
    #[must_use]
    pub fn new(limit_secs: u32) -> Self {
        Self {
            limit_secs,
            remaining_secs: limit_secs,
            running: false,
        }
    }

    /// Rewinds to the full limit and starts running.
    pub fn restart(&mut self) {
        self.remaining_secs = self.limit_secs;
        self.running = self.limit_secs > 0;
    }

    /// Continues from the current remaining time.
    pub fn resume(&mut self) {
        self.running = self.remaining_secs > 0;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advances one second. Returns `true` exactly once, on the tick that
    /// reaches zero.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.running = false;
            return true;
        }
        false
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Elapsed-seconds counter for a whole session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stopwatch {
    elapsed_secs: u64,
    running: bool,
}

impl Stopwatch {
    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self) {
        if self.running {
            self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_fires_once() {
        let mut countdown = Countdown::new(2);
        assert!(!countdown.tick(), "not started yet");

        countdown.restart();
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert!(!countdown.tick());
        assert_eq!(countdown.remaining_secs(), 0);
    }

    #[test]
    fn stopped_countdown_keeps_remaining_time() {
        let mut countdown = Countdown::new(5);
        countdown.restart();
        countdown.tick();
        countdown.stop();
        countdown.tick();
        assert_eq!(countdown.remaining_secs(), 4);

        countdown.resume();
        countdown.tick();
        assert_eq!(countdown.remaining_secs(), 3);
    }

    #[test]
    fn zero_limit_never_runs() {
        let mut countdown = Countdown::new(0);
        countdown.restart();
        assert!(!countdown.is_running());
        assert!(!countdown.tick());
    }

    #[test]
    fn stopwatch_counts_only_while_running() {
        let mut watch = Stopwatch::default();
        watch.tick();
        watch.start();
        watch.tick();
        watch.tick();
        watch.stop();
        watch.tick();
        assert_eq!(watch.elapsed_secs(), 2);
    }

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(30));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(30));
    }
}
