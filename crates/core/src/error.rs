use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::model::{CourseError, LessonError, UpdateError};

/// Any error raised by the core crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
