use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("course must contain at least one lesson")]
    NoLessons,

    #[error("duplicate lesson id in course: {0}")]
    DuplicateLesson(LessonId),
}

/// A lesson entry as listed in a course outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseLesson {
    pub lesson_id: LessonId,
    pub title: String,
    pub duration_minutes: u32,
}

/// Ordered sequence of lessons. Lesson `i` unlocks once lesson `i - 1` is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    id: CourseId,
    title: String,
    lessons: Vec<CourseLesson>,
}

impl Course {
    /// # Errors
    ///
    /// Returns `CourseError` for an empty title, no lessons or duplicate lesson ids.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        lessons: Vec<CourseLesson>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if lessons.is_empty() {
            return Err(CourseError::NoLessons);
        }
        let mut seen = HashSet::new();
        for lesson in &lessons {
            if !seen.insert(&lesson.lesson_id) {
                return Err(CourseError::DuplicateLesson(lesson.lesson_id.clone()));
            }
        }
        Ok(Self { id, title, lessons })
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn lessons(&self) -> &[CourseLesson] {
        &self.lessons
    }

    #[must_use]
    pub fn total_duration_minutes(&self) -> u32 {
        self.lessons
            .iter()
            .fold(0u32, |total, l| total.saturating_add(l.duration_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, minutes: u32) -> CourseLesson {
        CourseLesson {
            lesson_id: LessonId::new(id),
            title: id.to_uppercase(),
            duration_minutes: minutes,
        }
    }

    #[test]
    fn course_totals_durations() {
        let course = Course::new(
            CourseId::new("3d-modeling"),
            "3D Modeling",
            vec![entry("1-1", 20), entry("1-2", 25)],
        )
        .unwrap();
        assert_eq!(course.total_duration_minutes(), 45);
    }

    #[test]
    fn duplicate_lessons_are_rejected() {
        let err = Course::new(CourseId::new("c"), "C", vec![entry("a", 1), entry("a", 2)])
            .unwrap_err();
        assert_eq!(err, CourseError::DuplicateLesson(LessonId::new("a")));
    }
}
