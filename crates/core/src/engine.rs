//! Lesson progress engine.
//!
//! The engine owns no mutable state: every operation takes the current
//! [`UserLessonProgress`] and returns a new value, so an update sequence can be
//! replayed and diffed by any consumer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::model::{
    Achievement, AchievementId, AchievementKind, Lesson, LessonId, ProgressUpdate, Section,
    SectionProgress, UpdateKind, UserLessonProgress,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    #[error("section index {index} is out of range for a lesson with {len} sections")]
    InvalidIndex { index: usize, len: usize },

    #[error("progress belongs to lesson {found}, engine drives lesson {expected}")]
    LessonMismatch { expected: LessonId, found: LessonId },

    #[error("progress sections do not match the sections of lesson {lesson_id}")]
    SectionMismatch { lesson_id: LessonId },
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Result of applying one update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub progress: UserLessonProgress,
    /// `false` when the update was ignored and `progress` equals the input.
    pub applied: bool,
    /// Achievements unlocked by this update, in unlock order.
    pub new_achievements: Vec<Achievement>,
    /// Set exactly once per lesson: on the update that completed its last section.
    pub lesson_completed: bool,
}

impl UpdateOutcome {
    fn ignored(progress: &UserLessonProgress) -> Self {
        Self {
            progress: progress.clone(),
            applied: false,
            new_achievements: Vec::new(),
            lesson_completed: false,
        }
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Applies progress updates for a single lesson.
#[derive(Debug, Clone)]
pub struct LessonProgressEngine {
    lesson: Arc<Lesson>,
    config: EngineConfig,
}

impl LessonProgressEngine {
    #[must_use]
    pub fn new(lesson: impl Into<Arc<Lesson>>, config: EngineConfig) -> Self {
        Self {
            lesson: lesson.into(),
            config,
        }
    }

    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    #[must_use]
    pub fn lesson_arc(&self) -> Arc<Lesson> {
        Arc::clone(&self.lesson)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh progress for the lesson: one incomplete record per section.
    #[must_use]
    pub fn initialize(&self, now: DateTime<Utc>) -> UserLessonProgress {
        let sections = self
            .lesson
            .sections()
            .iter()
            .map(|s| SectionProgress::new(s.id.clone(), now))
            .collect();
        UserLessonProgress::new(self.lesson.id().clone(), sections, now)
    }

    /// Check that `progress` was produced for this engine's lesson and that its
    /// section records are index-aligned with the lesson's sections.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::LessonMismatch` for progress of another lesson and
    /// `EngineError::SectionMismatch` when the section records differ in count,
    /// ids or order (for example after the lesson content changed).
    pub fn ensure_owned(&self, progress: &UserLessonProgress) -> Result<(), EngineError> {
        if progress.lesson_id() != self.lesson.id() {
            return Err(EngineError::LessonMismatch {
                expected: self.lesson.id().clone(),
                found: progress.lesson_id().clone(),
            });
        }
        let sections = self.lesson.sections();
        let aligned = progress.total_sections() == sections.len()
            && progress
                .sections()
                .iter()
                .zip(sections)
                .all(|(sp, s)| sp.section_id() == &s.id);
        if !aligned {
            return Err(EngineError::SectionMismatch {
                lesson_id: self.lesson.id().clone(),
            });
        }
        Ok(())
    }

    /// Whether the section at `index` may be entered.
    ///
    /// Section 0 is always unlocked; section `i` unlocks once section `i - 1`
    /// is completed. Lessons configured for free navigation unlock everything.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidIndex` if `index` is not a section of the
    /// lesson, or the `ensure_owned` error for progress that does not match it.
    pub fn is_section_unlocked(
        &self,
        progress: &UserLessonProgress,
        index: usize,
    ) -> Result<bool, EngineError> {
        self.ensure_owned(progress)?;
        let len = self.lesson.section_count();
        if index >= len {
            return Err(EngineError::InvalidIndex { index, len });
        }
        if index == 0 || self.config.is_free_navigation(progress.lesson_id()) {
            return Ok(true);
        }
        Ok(progress
            .section(index - 1)
            .is_some_and(SectionProgress::is_completed))
    }

    /// Whether `progress` satisfies the completion criteria of `section`.
    ///
    /// This never mutates anything; callers issue a `section-complete` update
    /// themselves when it returns `true`.
    #[must_use]
    pub fn evaluate_completion_criteria(&self, section: &Section, progress: &SectionProgress) -> bool {
        section.criteria.is_satisfied(progress)
    }

    /// Apply one update and recompute the derived fields.
    ///
    /// Updates for unknown sections, for another lesson, or with an invalid
    /// payload are ignored and logged; the returned progress equals the input.
    #[must_use]
    pub fn apply_update(
        &self,
        progress: &UserLessonProgress,
        update: &ProgressUpdate,
    ) -> UpdateOutcome {
        if let Err(err) = self.ensure_owned(progress) {
            warn!(error = %err, "ignoring progress update");
            return UpdateOutcome::ignored(progress);
        }
        if let Err(err) = update.validate() {
            warn!(
                lesson_id = %progress.lesson_id(),
                section_id = %update.section_id,
                kind = update.kind.name(),
                error = %err,
                "ignoring malformed progress update"
            );
            return UpdateOutcome::ignored(progress);
        }
        let Some(index) = progress.section_index(&update.section_id) else {
            warn!(
                lesson_id = %progress.lesson_id(),
                section_id = %update.section_id,
                kind = update.kind.name(),
                "ignoring progress update for unknown section"
            );
            return UpdateOutcome::ignored(progress);
        };

        let mut next = progress.clone();
        let Some(newly_completed) = apply_to_section(&mut next, index, update) else {
            return UpdateOutcome::ignored(progress);
        };

        if newly_completed {
            let title = self
                .lesson
                .section(index)
                .map_or_else(|| update.section_id.to_string(), |s| s.title.clone());
            info!(
                lesson_id = %next.lesson_id(),
                section_id = %update.section_id,
                "section completed"
            );
            next.achievements_mut().insert_if_absent(Achievement {
                id: AchievementId::for_section(&update.section_id),
                kind: AchievementKind::Completion,
                title: "Section complete".to_owned(),
                description: format!("Completed section \"{title}\""),
                points: self.config.section_points,
                unlocked_at: update.timestamp,
            });
        }

        next.recompute();

        let mut lesson_completed = false;
        if next.all_sections_completed() && !next.is_completed() {
            next.set_completed();
            next.achievements_mut().insert_if_absent(Achievement {
                id: AchievementId::for_lesson(self.lesson.id()),
                kind: AchievementKind::Milestone,
                title: "Lesson complete".to_owned(),
                description: format!("Completed lesson \"{}\"", self.lesson.title()),
                points: self.config.lesson_points,
                unlocked_at: update.timestamp,
            });
            lesson_completed = true;
            info!(lesson_id = %next.lesson_id(), "lesson completed");
        }

        next.set_last_accessed(update.timestamp);

        let new_achievements = next.achievements().unlocked_since(progress.achievements());
        for achievement in &new_achievements {
            info!(
                achievement_id = %achievement.id,
                points = achievement.points,
                "achievement unlocked"
            );
        }
        debug!(
            lesson_id = %next.lesson_id(),
            section_id = %update.section_id,
            kind = update.kind.name(),
            overall_progress = next.overall_progress(),
            "progress update applied"
        );

        UpdateOutcome {
            progress: next,
            applied: true,
            new_achievements,
            lesson_completed,
        }
    }
}

/// Mutate the targeted section record.
///
/// Returns `Some(true)` when the update completed a previously incomplete section.
fn apply_to_section(
    progress: &mut UserLessonProgress,
    index: usize,
    update: &ProgressUpdate,
) -> Option<bool> {
    let section = progress.section_mut(index)?;
    let mut newly_completed = false;
    match &update.kind {
        UpdateKind::SectionStart => section.touch(update.timestamp),
        UpdateKind::TimeUpdate { time_spent_secs } => section.set_time_spent(*time_spent_secs),
        UpdateKind::Interaction { interaction_id } => {
            section.record_interaction(interaction_id.clone());
        }
        UpdateKind::QuizComplete { quiz_id, score } => {
            section.record_quiz_score(quiz_id.clone(), *score);
        }
        UpdateKind::SectionComplete => {
            newly_completed = !section.is_completed();
            section.mark_completed(update.timestamp);
        }
    }
    Some(newly_completed)
}
