#![forbid(unsafe_code)]

pub mod course_service;
pub mod error;
pub mod lessons;

pub use learn_core::Clock;

pub use course_service::{CourseDashboard, CourseLessonEntry, CourseProgressService, CourseStats};
pub use error::{CourseProgressError, LessonSessionError};
pub use lessons::{
    ActiveLesson, LessonLoopService, LessonOverview, LessonSession, SectionStatus, SectionTimer,
    SessionEvents,
};
