mod compensation;
mod service;
mod state;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use compensation::{CompensationPolicy, NoCompensation, OnePerMiss};
pub use service::{ExerciseSession, IMPROVEMENT_THRESHOLD, PERSEVERANCE_ATTEMPTS, SessionParts};
pub use state::{
    AdvanceOutcome, AttemptOutcome, SessionPhase, SessionReport, SessionState, SubmitOutcome,
    TickOutcome,
};
pub use workflow::{ExerciseLoopService, HISTORY_WINDOW};
