#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod level_manager;
pub mod notifications;
pub mod progress;
pub mod reward_engine;
pub mod sessions;

pub use practice_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, LevelError, ProgressError, RewardError, SessionError};
pub use level_manager::LevelManager;
pub use notifications::{EngineEvent, NoopNotifier, NotificationChannel, NotificationHub};
pub use progress::ProgressService;
pub use reward_engine::{RewardDraw, RewardEngine};

pub use sessions::{
    AdvanceOutcome, AttemptOutcome, ExerciseLoopService, ExerciseSession, SessionParts,
    SessionPhase, SessionReport, SessionState, SubmitOutcome, TickOutcome,
};
