//! Shared error types for the services crate.

use thiserror::Error;

use learn_core::EngineError;
use learn_core::model::UpdateError;
use storage::repository::StorageError;

/// Errors emitted by lesson sessions and the lesson loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonSessionError {
    #[error("section {index} is locked")]
    SectionLocked { index: usize },
    #[error("section {index} does not meet its completion criteria")]
    CriteriaNotMet { index: usize },
    #[error("no section beyond the current one in that direction")]
    NoAdjacentSection,
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CourseProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseProgressError {
    #[error("lesson index {index} is out of range for a course with {len} lessons")]
    InvalidIndex { index: usize, len: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
