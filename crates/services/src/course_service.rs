use std::sync::Arc;

use serde::Serialize;

use learn_core::model::{Course, CourseId, CourseLesson, LessonProgressSummary};
use storage::repository::{CourseRepository, ProgressRepository};

use crate::error::CourseProgressError;

/// Course-wide figures for a dashboard header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseStats {
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub total_time_spent_secs: u64,
    pub estimated_minutes_remaining: u32,
    /// Completed lessons over total lessons, rounded to a whole percent.
    pub overall_percent: u32,
}

impl CourseStats {
    /// `summaries` must be index-aligned with `course.lessons()`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn compute(course: &Course, summaries: &[LessonProgressSummary]) -> Self {
        let total_lessons = course.lessons().len();
        let completed_lessons = summaries.iter().filter(|s| s.completed).count();
        let total_time_spent_secs = summaries.iter().map(|s| s.time_spent_secs).sum();
        let estimated_minutes_remaining = course
            .lessons()
            .iter()
            .zip(summaries)
            .filter(|(_, s)| !s.completed)
            .fold(0u32, |total, (lesson, _)| total.saturating_add(lesson.duration_minutes));
        let overall_percent = if total_lessons == 0 {
            0
        } else {
            (100.0 * completed_lessons as f64 / total_lessons as f64).round() as u32
        };
        Self {
            total_lessons,
            completed_lessons,
            total_time_spent_secs,
            estimated_minutes_remaining,
            overall_percent,
        }
    }
}

/// One row of the course lesson list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseLessonEntry {
    pub lesson: CourseLesson,
    pub progress: LessonProgressSummary,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseDashboard {
    pub course_id: CourseId,
    pub title: String,
    pub stats: CourseStats,
    pub lessons: Vec<CourseLessonEntry>,
    /// First lesson not yet completed, in course order.
    pub next_lesson: Option<CourseLesson>,
}

/// Lesson `index` is unlocked when it is the first lesson or its predecessor is completed.
///
/// # Errors
///
/// Returns `CourseProgressError::InvalidIndex` for an index outside the course.
pub fn is_lesson_unlocked(
    summaries: &[LessonProgressSummary],
    index: usize,
) -> Result<bool, CourseProgressError> {
    if index >= summaries.len() {
        return Err(CourseProgressError::InvalidIndex {
            index,
            len: summaries.len(),
        });
    }
    Ok(index == 0 || summaries[index - 1].completed)
}

/// Builds course dashboards from stored lesson progress.
#[derive(Clone)]
pub struct CourseProgressService {
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl CourseProgressService {
    #[must_use]
    pub fn new(courses: Arc<dyn CourseRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { courses, progress }
    }

    /// Load progress summaries for every lesson of a course, in course order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course or a progress record cannot be read.
    pub async fn lesson_summaries(
        &self,
        course: &Course,
    ) -> Result<Vec<LessonProgressSummary>, CourseProgressError> {
        let mut summaries = Vec::with_capacity(course.lessons().len());
        for lesson in course.lessons() {
            let summary = self
                .progress
                .load_progress(&lesson.lesson_id)
                .await?
                .map_or_else(
                    || LessonProgressSummary::not_started(lesson.lesson_id.clone()),
                    |p| p.summary(),
                );
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown course, or other storage errors.
    pub async fn dashboard(&self, course_id: &CourseId) -> Result<CourseDashboard, CourseProgressError> {
        let course = self.courses.get_course(course_id).await?;
        let summaries = self.lesson_summaries(&course).await?;
        let stats = CourseStats::compute(&course, &summaries);

        let next_lesson = course
            .lessons()
            .iter()
            .zip(&summaries)
            .find(|(_, s)| !s.completed)
            .map(|(lesson, _)| lesson.clone());

        let mut lessons = Vec::with_capacity(summaries.len());
        for (index, (lesson, summary)) in course.lessons().iter().zip(&summaries).enumerate() {
            lessons.push(CourseLessonEntry {
                lesson: lesson.clone(),
                progress: summary.clone(),
                unlocked: is_lesson_unlocked(&summaries, index)?,
            });
        }

        Ok(CourseDashboard {
            course_id: course.id().clone(),
            title: course.title().to_owned(),
            stats,
            lessons,
            next_lesson,
        })
    }
}
