pub mod error;
pub mod evaluator;
pub mod generator;
pub mod level;
pub mod model;
pub mod rewards;
pub mod time;

pub use error::Error;
pub use time::{fixed_clock, fixed_now, Clock, Countdown, Stopwatch};
