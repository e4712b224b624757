#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod time;

pub use config::EngineConfig;
pub use engine::{EngineError, LessonProgressEngine, UpdateOutcome};
pub use error::Error;
pub use time::Clock;
