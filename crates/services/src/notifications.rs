//! Out-of-band events for whatever UI listens to the engine.

use practice_core::level::LevelChange;
use practice_core::model::{ModuleKey, RewardDefinition};
use tokio::sync::broadcast;

/// Events announced by `LevelManager` and `RewardEngine`.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineEvent {
    LevelChanged {
        key: ModuleKey,
        change: LevelChange,
    },
    RewardGranted {
        key: ModuleKey,
        reward: &'static RewardDefinition,
    },
}

/// Sink for engine events. Implementations must not block.
pub trait NotificationChannel: Send + Sync {
    fn notify(&self, event: EngineEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl NotificationChannel for NoopNotifier {
    fn notify(&self, _event: EngineEvent) {}
}

/// Fans events out to any number of subscribers.
///
/// Slow subscribers lag and lose the oldest events rather than holding the
/// engine back.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<EngineEvent>,
}

impl NotificationHub {
    pub const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl NotificationChannel for NotificationHub {
    fn notify(&self, event: EngineEvent) {
        // No subscriber is fine.
        if self.sender.send(event).is_err() {
            tracing::trace!("engine event dropped, no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::level::Direction;
    use practice_core::model::{DifficultyLevel, LearnerId, ModuleId};

    fn level_event() -> EngineEvent {
        EngineEvent::LevelChanged {
            key: ModuleKey::new(LearnerId::new(1), ModuleId::new("addition").unwrap()),
            change: LevelChange {
                previous: DifficultyLevel::Beginner,
                new: DifficultyLevel::Elementary,
                direction: Direction::Up,
            },
        }
    }

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let hub = NotificationHub::default();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        hub.notify(level_event());

        assert_eq!(first.recv().await.unwrap(), level_event());
        assert_eq!(second.recv().await.unwrap(), level_event());
    }

    #[test]
    fn notifying_without_subscribers_is_fine() {
        let hub = NotificationHub::new(4);
        hub.notify(level_event());
        NoopNotifier.notify(level_event());
    }
}
